//! Core SPSC (Single-Producer Single-Consumer) ring buffer.
//!
//! [`ring::RingBuffer`] carries the index protocol and exposes it through
//! `unsafe` role-bound operations. Applications that cannot hand each role its
//! own handle (for example, a ring embedded in a larger shared structure) use
//! it directly; everyone else goes through [`crate::sync::spsc`].

pub mod ring;
