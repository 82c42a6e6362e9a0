//! Lock-free SPSC channel for inter-thread handoff.
//!
//! A bounded queue over a heap-allocated [`RingBuffer`] shared through an `Arc`.
//!
//! # Overview
//!
//! - [`Producer`] - Write end (single producer per queue)
//! - [`Consumer`] - Read end (single consumer per queue)
//! - Lock-free: no mutexes or syscalls in the hot path
//!
//! # Example
//!
//! ```
//! use handoff::sync::spsc;
//!
//! let (producer, consumer) = spsc::channel::<u64>(1024)?;
//!
//! // Producer thread
//! producer.try_push(42).expect("queue full");
//!
//! // Consumer thread
//! assert_eq!(consumer.try_pop(), Some(42));
//! # Ok::<(), handoff::RingError>(())
//! ```
//!
//! # Ownership
//!
//! A pushed value moves into the ring and out again to whoever pops it. For
//! pointer-like payloads (`Box<T>`, `Arc<T>`) that means ownership of the
//! pointee travels with the handle; elements never popped are dropped together
//! with the last endpoint.

use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::RingError;
use crate::spsc::ring::RingBuffer;
use crate::trace::{debug, trace};
use crate::wait::{SpinConfig, SpinWait, Timeout};

/// Marker type to opt-out of `Sync` while remaining `Send`.
type PhantomUnsync = PhantomData<Cell<&'static ()>>;

/// Write end of the SPSC queue.
///
/// # Thread Safety
///
/// `Producer` is [`Send`] but **not** [`Sync`] and not [`Clone`]:
/// - Can transfer ownership to another thread
/// - Cannot share `&Producer` (no concurrent `try_push()`)
pub struct Producer<T: Send> {
    ring: Arc<RingBuffer<T>>,
    spin: SpinConfig,
    _unsync: PhantomUnsync,
}

/// Read end of the SPSC queue.
///
/// See [`Producer`] for thread safety details (same semantics apply).
pub struct Consumer<T: Send> {
    ring: Arc<RingBuffer<T>>,
    spin: SpinConfig,
    _unsync: PhantomUnsync,
}

/// Creates a new SPSC channel with `capacity` slots.
///
/// The queue holds at most `capacity - 1` elements. The producer and consumer
/// can be sent to different threads.
///
/// # Errors
///
/// Returns [`RingError::InvalidCapacity`] if `capacity < 2`.
///
/// # Example
///
/// ```
/// use handoff::sync::spsc;
///
/// let (tx, rx) = spsc::channel::<String>(16)?;
///
/// tx.try_push("hello".to_string()).unwrap();
/// assert_eq!(rx.try_pop(), Some("hello".to_string()));
/// # Ok::<(), handoff::RingError>(())
/// ```
pub fn channel<T: Send>(capacity: usize) -> Result<(Producer<T>, Consumer<T>), RingError> {
    channel_with_config(capacity, SpinConfig::default())
}

/// Like [`channel`], with a custom backoff for the blocking accessors.
///
/// # Errors
///
/// Returns [`RingError::InvalidCapacity`] if `capacity < 2`.
pub fn channel_with_config<T: Send>(
    capacity: usize,
    spin: SpinConfig,
) -> Result<(Producer<T>, Consumer<T>), RingError> {
    let ring = Arc::new(RingBuffer::new(capacity)?);
    debug!(capacity, spins_before_yield = spin.spins_before_yield, "spsc channel created");

    let producer = Producer {
        ring: Arc::clone(&ring),
        spin,
        _unsync: PhantomData,
    };

    let consumer = Consumer {
        ring,
        spin,
        _unsync: PhantomData,
    };

    Ok((producer, consumer))
}

impl<T: Send> Producer<T> {
    /// Attempts to push an item onto the queue. Never blocks.
    ///
    /// # Errors
    ///
    /// Returns `Err(item)` if the queue is full, allowing retry.
    #[inline]
    pub fn try_push(&self, item: T) -> Result<(), T> {
        // SAFETY: Producer is the only handle that pushes to this ring, and it
        // is neither `Clone` nor `Sync`, so calls cannot overlap.
        unsafe { self.ring.try_push(item) }
    }

    /// Spins until space is available, then pushes.
    ///
    /// # Errors
    ///
    /// Returns `Err(item)` on timeout.
    pub fn push_blocking(&self, mut item: T, timeout: Timeout) -> Result<(), T> {
        let mut wait = SpinWait::new(timeout, self.spin);
        loop {
            match self.try_push(item) {
                Ok(()) => return Ok(()),
                Err(returned) => {
                    item = returned;
                    if !wait.pause() {
                        trace!(?timeout, "push timed out on full ring");
                        return Err(item);
                    }
                }
            }
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Number of queued elements. A lower bound on free space from here.
    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }
}

impl<T: Send> Consumer<T> {
    /// Attempts to pop an item from the queue. Never blocks.
    ///
    /// Returns `None` if the queue is empty.
    #[inline]
    #[must_use]
    pub fn try_pop(&self) -> Option<T> {
        // SAFETY: Consumer is the only handle that pops from this ring, and it
        // is neither `Clone` nor `Sync`, so calls cannot overlap.
        unsafe { self.ring.try_pop() }
    }

    /// Spins until an item is available, then pops.
    ///
    /// Returns `None` on timeout.
    #[must_use]
    pub fn pop_blocking(&self, timeout: Timeout) -> Option<T> {
        let mut wait = SpinWait::new(timeout, self.spin);
        loop {
            if let Some(item) = self.try_pop() {
                return Some(item);
            }
            if !wait.pause() {
                trace!(?timeout, "pop timed out on empty ring");
                return None;
            }
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Number of queued elements. A lower bound on what can be popped from here.
    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }
}

impl<T: Send> std::fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer").field("ring", &self.ring).finish()
    }
}

impl<T: Send> std::fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumer").field("ring", &self.ring).finish()
    }
}
