//! SPSC channel throughput and latency benchmark.
//!
//! Usage:
//!     cargo run --release --bin ring_bench
//!
//! Environment variables:
//!     PRODUCER_CPU=0         Pin producer to CPU 0 (default: unpinned)
//!     CONSUMER_CPU=2         Pin consumer to CPU 2 (default: unpinned)
//!     RING_CAPACITY=1024     Slots per ring (default: 1024)
//!     ITERATIONS=4194304     Messages per run (default: 2^22)

use std::env;
use std::hint;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Instant;

use thiserror::Error;

use handoff::RingError;
use handoff::sync::spsc;

type Payload = u64;

#[derive(Debug, Error)]
enum BenchError {
    #[error(transparent)]
    Ring(#[from] RingError),
    /// A worker died mid-run, e.g. on a corrupted value.
    #[error("{0} thread panicked")]
    WorkerPanicked(&'static str),
}

struct BenchConfig {
    producer_cpu: Option<usize>,
    consumer_cpu: Option<usize>,
    capacity: usize,
    iterations: u64,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Unset or unparseable means "leave the thread unpinned".
fn parse_cpu(value: Option<String>) -> Option<usize> {
    value.and_then(|s| s.parse().ok())
}

impl BenchConfig {
    fn from_env() -> Self {
        Self {
            producer_cpu: parse_cpu(env::var("PRODUCER_CPU").ok()),
            consumer_cpu: parse_cpu(env::var("CONSUMER_CPU").ok()),
            capacity: env_or("RING_CAPACITY", 1024),
            iterations: env_or("ITERATIONS", 1 << 22),
        }
    }
}

fn pin_to_cpu(cpu: Option<usize>) {
    if let Some(id) = cpu {
        core_affinity::set_for_current(core_affinity::CoreId { id });
    }
}

fn join_worker<T>(handle: JoinHandle<T>, name: &'static str) -> Result<T, BenchError> {
    handle.join().map_err(|_| BenchError::WorkerPanicked(name))
}

fn bench_throughput(config: &BenchConfig) -> Result<(), BenchError> {
    let (producer, consumer) = spsc::channel::<Payload>(config.capacity)?;

    let ready = Arc::new(AtomicBool::new(false));
    let ready_clone = ready.clone();
    let consumer_cpu = config.consumer_cpu;
    let iterations = config.iterations;

    let consumer_thread = std::thread::spawn(move || {
        pin_to_cpu(consumer_cpu);
        ready_clone.store(true, Ordering::Release);

        for expected in 0..iterations {
            loop {
                if let Some(value) = consumer.try_pop() {
                    assert_eq!(value, expected, "data corruption");
                    break;
                }
                hint::spin_loop();
            }
        }
    });

    while !ready.load(Ordering::Acquire) {
        hint::spin_loop();
    }

    pin_to_cpu(config.producer_cpu);

    let start = Instant::now();

    for i in 0..iterations {
        let mut item = i;
        while let Err(returned) = producer.try_push(item) {
            item = returned;
            // A consumer that exits early died; its join reports the panic.
            if consumer_thread.is_finished() {
                join_worker(consumer_thread, "consumer")?;
                return Err(BenchError::WorkerPanicked("consumer"));
            }
            hint::spin_loop();
        }
    }

    join_worker(consumer_thread, "consumer")?;
    let elapsed = start.elapsed();

    let ops_per_ms = u128::from(iterations) * 1_000_000 / elapsed.as_nanos().max(1);
    println!("throughput: {} ops/ms", ops_per_ms);
    Ok(())
}

fn bench_rtt(config: &BenchConfig) -> Result<(), BenchError> {
    let (ping_tx, ping_rx) = spsc::channel::<Payload>(config.capacity)?;
    let (pong_tx, pong_rx) = spsc::channel::<Payload>(config.capacity)?;

    let ready = Arc::new(AtomicBool::new(false));
    let ready_clone = ready.clone();
    let consumer_cpu = config.consumer_cpu;
    let iterations = config.iterations;

    let responder = std::thread::spawn(move || {
        pin_to_cpu(consumer_cpu);
        ready_clone.store(true, Ordering::Release);

        for _ in 0..iterations {
            loop {
                if let Some(value) = ping_rx.try_pop() {
                    while pong_tx.try_push(value).is_err() {
                        hint::spin_loop();
                    }
                    break;
                }
                hint::spin_loop();
            }
        }
    });

    while !ready.load(Ordering::Acquire) {
        hint::spin_loop();
    }

    pin_to_cpu(config.producer_cpu);

    let start = Instant::now();

    for i in 0..iterations {
        while ping_tx.try_push(i).is_err() {
            hint::spin_loop();
        }
        loop {
            if pong_rx.try_pop().is_some() {
                break;
            }
            if responder.is_finished() {
                join_worker(responder, "responder")?;
                return Err(BenchError::WorkerPanicked("responder"));
            }
            hint::spin_loop();
        }
    }

    let elapsed = start.elapsed();
    join_worker(responder, "responder")?;

    let rtt_ns = elapsed.as_nanos() / u128::from(iterations.max(1));
    println!("round trip: {} ns", rtt_ns);
    Ok(())
}

fn main() -> Result<(), BenchError> {
    handoff::trace::init_tracing();

    let config = BenchConfig::from_env();
    println!(
        "capacity={} iterations={} producer_cpu={:?} consumer_cpu={:?}",
        config.capacity, config.iterations, config.producer_cpu, config.consumer_cpu
    );

    bench_throughput(&config)?;
    bench_rtt(&config)?;
    Ok(())
}
