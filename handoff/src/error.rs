//! Errors surfaced by ring construction.
//!
//! A full ring on push and an empty ring on pop are not errors; they are
//! reported through `Result<(), T>` and `Option<T>` at the call site.

use thiserror::Error;

/// Error constructing a ring buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RingError {
    /// Fewer than two slots were requested.
    ///
    /// One slot is always left empty to tell "full" apart from "empty", so a
    /// ring with a single slot could never hold an element.
    #[error("invalid capacity {capacity}: a ring buffer needs at least 2 slots")]
    InvalidCapacity { capacity: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_capacity() {
        let err = RingError::InvalidCapacity { capacity: 1 };
        assert_eq!(
            err.to_string(),
            "invalid capacity 1: a ring buffer needs at least 2 slots"
        );
    }
}
