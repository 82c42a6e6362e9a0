//! Spin-wait support for the blocking queue accessors.
//!
//! The ring itself never waits. [`SpinWait`] is the caller-side retry loop the
//! `*_blocking` methods in [`crate::sync::spsc`] layer on top of it: poll,
//! back off, check the deadline, poll again.

use std::hint;
use std::thread;
use std::time::Duration;

use minstant::Instant;

/// Timeout specification for blocking operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Wait indefinitely.
    Infinite,
    /// Wait for at most the specified duration.
    Duration(Duration),
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Self::Duration(d)
    }
}

/// Backoff policy between polls of a full or empty ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinConfig {
    /// How many `spin_loop` hints to issue before yielding the thread on
    /// every further failed poll.
    ///
    /// Spinning keeps wake-up latency minimal when the other side is running
    /// on its own core; yielding avoids starving it when both share one.
    ///
    /// **Default**: 64
    pub spins_before_yield: u32,
}

impl SpinConfig {
    /// Never yields; burns the core until the ring is ready or the deadline passes.
    pub const fn busy() -> Self {
        Self {
            spins_before_yield: u32::MAX,
        }
    }
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self {
            spins_before_yield: 64,
        }
    }
}

/// Per-call backoff state.
pub(crate) struct SpinWait {
    deadline: Option<Instant>,
    spins: u32,
    config: SpinConfig,
}

impl SpinWait {
    pub(crate) fn new(timeout: Timeout, config: SpinConfig) -> Self {
        let deadline = match timeout {
            Timeout::Infinite => None,
            // A deadline past the clock's range is as good as none.
            Timeout::Duration(d) => Instant::now().checked_add(d),
        };
        Self {
            deadline,
            spins: 0,
            config,
        }
    }

    /// Backs off once. Returns `false` if the deadline has passed.
    #[inline]
    pub(crate) fn pause(&mut self) -> bool {
        if let Some(dl) = self.deadline
            && Instant::now() > dl
        {
            return false;
        }

        if self.spins < self.config.spins_before_yield {
            self.spins += 1;
            hint::spin_loop();
        } else {
            thread::yield_now();
        }
        true
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_from_duration() {
        let timeout: Timeout = Duration::from_millis(5).into();
        assert_eq!(timeout, Timeout::Duration(Duration::from_millis(5)));
    }

    #[test]
    fn test_zero_timeout_expires() {
        let mut wait = SpinWait::new(Duration::ZERO.into(), SpinConfig::default());
        std::thread::sleep(Duration::from_millis(1));
        assert!(!wait.pause());
    }

    #[test]
    fn test_unrepresentable_deadline_waits_forever() {
        let mut wait = SpinWait::new(Duration::MAX.into(), SpinConfig::default());
        assert!(wait.deadline.is_none());
        assert!(wait.pause());
    }

    #[test]
    fn test_infinite_never_expires() {
        let mut wait = SpinWait::new(Timeout::Infinite, SpinConfig::default());
        for _ in 0..1_000 {
            assert!(wait.pause());
        }
    }

    #[test]
    fn test_switches_to_yield_after_spin_budget() {
        let config = SpinConfig {
            spins_before_yield: 3,
        };
        let mut wait = SpinWait::new(Timeout::Infinite, config);
        for _ in 0..10 {
            assert!(wait.pause());
        }
        assert_eq!(wait.spins, 3);
    }

    #[test]
    fn test_busy_config_never_yields() {
        assert_eq!(SpinConfig::busy().spins_before_yield, u32::MAX);
        assert_eq!(SpinConfig::default().spins_before_yield, 64);
    }
}
