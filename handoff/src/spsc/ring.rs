//! Core lock-free SPSC ring buffer algorithm.
//!
//! [`RingBuffer`] is a fixed-capacity circular queue addressed by two cursors:
//!
//! - `write_index`: next slot the producer fills. Stored only by the producer.
//! - `read_index`: next slot the consumer drains. Stored only by the consumer.
//!
//! Both cursors stay in `[0, capacity)` and wrap back to zero. One slot is
//! always left vacant so that `read_index == write_index` means empty and
//! `write_index + 1 == read_index` (mod capacity) means full, which caps the
//! ring at `capacity - 1` live elements.
//!
//! # Ordering
//!
//! ```text
//! producer: write slot, Release-store write_index  ->  consumer: Acquire-load write_index, read slot
//! consumer: read slot,  Release-store read_index   ->  producer: Acquire-load read_index, reuse slot
//! ```
//!
//! Each side loads its own cursor with `Relaxed` because no other thread
//! stores it. The Acquire/Release pairs above are load-bearing: weakening any
//! of them lets the other side observe a slot before its contents.
//!
//! # Safety
//!
//! [`RingBuffer::try_push`] and [`RingBuffer::try_pop`] are `unsafe` because
//! the caller must uphold the SPSC invariant: at any moment at most one thread
//! pushes and at most one thread pops. [`crate::sync::spsc`] wraps the ring in
//! handles that enforce this statically.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;

#[cfg(loom)]
use loom::sync::atomic::{AtomicUsize, Ordering};
#[cfg(not(loom))]
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::RingError;
use crate::trace::{debug, warn};

/// A single slot in the ring buffer.
///
/// Initialized exactly when its index lies in `[read_index, write_index)`.
#[repr(transparent)]
struct Slot<T> {
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    fn vacant() -> Self {
        Self {
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }
}

/// Producer-owned cursor, padded to its own cache line.
#[repr(C)]
#[repr(align(64))]
struct ProducerState {
    /// Next slot to write. Stored by the producer, loaded by the consumer.
    write_index: AtomicUsize,
}

/// Consumer-owned cursor, padded to its own cache line.
#[repr(C)]
#[repr(align(64))]
struct ConsumerState {
    /// Next slot to read. Stored by the consumer, loaded by the producer.
    read_index: AtomicUsize,
}

/// Bounded single-producer/single-consumer queue.
///
/// Holds at most `capacity - 1` elements. See the [module docs](self) for the
/// index protocol and the safety contract of the raw operations.
#[repr(C)]
pub struct RingBuffer<T> {
    producer: ProducerState,
    consumer: ConsumerState,
    buffer: Box<[Slot<T>]>,
}

// SAFETY: Slots are shared, but the index protocol hands each initialized slot
// from the producer to the consumer through a Release/Acquire pair, so no slot
// is ever accessed by both roles at once. `T: Send` because values cross threads.
unsafe impl<T: Send> Sync for RingBuffer<T> {}

impl<T> RingBuffer<T> {
    /// Creates an empty ring with `capacity` slots.
    ///
    /// # Errors
    ///
    /// Returns [`RingError::InvalidCapacity`] if `capacity < 2`.
    pub fn new(capacity: usize) -> Result<Self, RingError> {
        if capacity < 2 {
            warn!(capacity, "rejected ring buffer capacity");
            return Err(RingError::InvalidCapacity { capacity });
        }

        let buffer = (0..capacity).map(|_| Slot::vacant()).collect();
        debug!(capacity, "ring buffer created");

        Ok(Self {
            producer: ProducerState {
                write_index: AtomicUsize::new(0),
            },
            consumer: ConsumerState {
                read_index: AtomicUsize::new(0),
            },
            buffer,
        })
    }

    /// Number of slots, including the one that is always kept vacant.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Maximum number of elements the ring can hold at once.
    #[inline]
    pub fn usable_capacity(&self) -> usize {
        self.capacity() - 1
    }

    /// Advances a cursor to the next slot, wrapping to 0 at capacity.
    ///
    /// Equivalent to `(index + 1) % capacity` without the division.
    #[inline]
    fn bump(&self, index: usize) -> usize {
        let next = index + 1;
        if next == self.capacity() { 0 } else { next }
    }

    /// Attempts to enqueue `value`.
    ///
    /// Returns `Err(value)` without side effects if the ring is full.
    ///
    /// # Safety
    ///
    /// No other thread may call `try_push` on this ring concurrently.
    #[inline]
    pub unsafe fn try_push(&self, value: T) -> Result<(), T> {
        let write = self.producer.write_index.load(Ordering::Relaxed);
        let next = self.bump(write);

        // Acquire pairs with the consumer's Release in `try_pop`: once we see
        // the slot freed, its previous value has been moved out.
        let read = self.consumer.read_index.load(Ordering::Acquire);
        if next == read {
            return Err(value);
        }

        // SAFETY: `write` is in bounds (cursor invariant). The slot at `write`
        // is outside `[read, write)`, so the consumer does not touch it until
        // the store below publishes it. Only one producer exists by contract.
        unsafe {
            (*self.buffer[write].value.get()).write(value);
        }

        // Release makes the slot write visible to the consumer's Acquire load.
        self.producer.write_index.store(next, Ordering::Release);
        Ok(())
    }

    /// Attempts to dequeue the oldest element.
    ///
    /// Returns `None` without side effects if the ring is empty.
    ///
    /// # Safety
    ///
    /// No other thread may call `try_pop` on this ring concurrently.
    #[inline]
    pub unsafe fn try_pop(&self) -> Option<T> {
        let read = self.consumer.read_index.load(Ordering::Relaxed);

        // Acquire pairs with the producer's Release in `try_push`.
        let write = self.producer.write_index.load(Ordering::Acquire);
        if read == write {
            return None;
        }

        // SAFETY: `read` is in bounds and inside `[read, write)`, so the slot
        // was initialized by a push that happens-before this point. The
        // producer will not overwrite it until `read_index` moves past it, and
        // only one consumer exists by contract, so the value is moved out once.
        let value = unsafe { (*self.buffer[read].value.get()).assume_init_read() };

        // Release hands the now-vacant slot back to the producer.
        self.consumer
            .read_index
            .store(self.bump(read), Ordering::Release);
        Some(value)
    }

    /// Snapshot of the producer cursor.
    #[inline]
    pub fn write_index(&self) -> usize {
        self.producer.write_index.load(Ordering::Acquire)
    }

    /// Snapshot of the consumer cursor.
    #[inline]
    pub fn read_index(&self) -> usize {
        self.consumer.read_index.load(Ordering::Acquire)
    }

    /// Number of live elements.
    ///
    /// Exact when called by either role with the other one idle; otherwise a
    /// snapshot that may already be stale, but always in `[0, capacity - 1]`.
    #[inline]
    pub fn len(&self) -> usize {
        let read = self.read_index();
        let write = self.write_index();
        occupancy(read, write, self.capacity())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.read_index() == self.write_index()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        let read = self.read_index();
        self.bump(self.write_index()) == read
    }
}

/// `(write - read) mod capacity` for cursors already in `[0, capacity)`.
#[inline]
fn occupancy(read: usize, write: usize, capacity: usize) -> usize {
    if write >= read {
        write - read
    } else {
        capacity - read + write
    }
}

impl<T> Drop for RingBuffer<T> {
    fn drop(&mut self) {
        if !std::mem::needs_drop::<T>() {
            return;
        }

        // `&mut self` means both roles are gone; plain loads suffice.
        let mut read = self.consumer.read_index.load(Ordering::Relaxed);
        let write = self.producer.write_index.load(Ordering::Relaxed);

        let remaining = occupancy(read, write, self.capacity());
        if remaining == 0 {
            return;
        }
        debug!(remaining, "dropping undrained elements");

        while read != write {
            // SAFETY: Every slot in `[read, write)` holds an initialized value
            // that no consumer has moved out.
            unsafe {
                self.buffer[read].value.get_mut().assume_init_drop();
            }
            read = self.bump(read);
        }
    }
}

impl<T> std::fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("read_index", &self.read_index())
            .field("write_index", &self.write_index())
            .finish()
    }
}
