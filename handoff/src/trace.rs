//! Tracing facade for handoff.
//!
//! Enable with `--features tracing`. Without the feature every macro expands
//! to nothing, so the queue operations stay free of logging overhead.
//!
//! No event is ever emitted from `try_push`/`try_pop`; only construction,
//! teardown and spin-wait timeouts are traced.

/// Installs a `tracing-subscriber` registry writing to stderr.
///
/// The filter is read from `RUST_LOG`, falling back to `handoff=trace`.
/// Does nothing if the `tracing` feature is not enabled.
#[cfg(feature = "tracing")]
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("handoff=trace"));

    // A second call (e.g. from several tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_file(false)
                .with_line_number(false)
                .with_timer(fmt::time::uptime()),
        )
        .with(filter)
        .try_init();
}

#[cfg(not(feature = "tracing"))]
pub const fn init_tracing() {}

#[cfg(feature = "tracing")]
pub(crate) use tracing::{debug, trace, warn};

#[cfg(not(feature = "tracing"))]
macro_rules! debug_noop {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_noop {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
macro_rules! warn_noop {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
pub(crate) use debug_noop as debug;
#[cfg(not(feature = "tracing"))]
pub(crate) use trace_noop as trace;
#[cfg(not(feature = "tracing"))]
pub(crate) use warn_noop as warn;

#[cfg(test)]
mod tests {
    use super::{debug, trace, warn};

    #[test]
    fn test_init_tracing_twice_keeps_first_subscriber() {
        super::init_tracing();
        super::init_tracing();
        debug!(attempt = 2, "facade macros expand with or without the feature");
        trace!("trace level");
        warn!("warn level");
    }
}
