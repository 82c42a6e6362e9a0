//! Bounded lock-free single-producer/single-consumer queues.
//!
//! - [`sync::spsc`] - Safe `(Producer, Consumer)` channel, the usual entry point
//! - [`spsc::ring`] - The underlying ring buffer with `unsafe` role-bound operations
//! - [`wait`] - Timeouts and backoff for the spin-wait accessors
//!
//! Enable the `tracing` feature to get construction/teardown events through
//! the [`tracing`](https://docs.rs/tracing) ecosystem.

pub mod error;
pub mod spsc;
pub mod sync;
pub mod trace;
pub mod wait;

pub use error::RingError;
pub use spsc::ring::RingBuffer;
pub use wait::{SpinConfig, Timeout};
