//! Cross-thread handoff scenarios for the SPSC channel and raw ring.

#![cfg(not(loom))]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use handoff::sync::spsc;
use handoff::{RingBuffer, SpinConfig, Timeout};

#[test]
fn test_capacity_ten_delivers_thousand_in_order() {
    let (producer, consumer) = spsc::channel::<u32>(10).unwrap();

    let producer_handle = thread::spawn(move || {
        for i in 0..1000 {
            let mut item = i;
            while let Err(returned) = producer.try_push(item) {
                item = returned;
                std::hint::spin_loop();
            }
        }
    });

    let consumer_handle = thread::spawn(move || {
        let mut received = Vec::with_capacity(1000);
        while received.len() < 1000 {
            match consumer.try_pop() {
                Some(item) => received.push(item),
                None => std::hint::spin_loop(),
            }
        }
        received
    });

    producer_handle.join().unwrap();
    let received = consumer_handle.join().unwrap();

    assert_eq!(received, (0..1000).collect::<Vec<_>>());
}

#[test]
fn test_raw_ring_shared_through_arc() {
    let ring = Arc::new(RingBuffer::<u64>::new(10).unwrap());
    let ring_p = Arc::clone(&ring);

    let producer_handle = thread::spawn(move || {
        for i in 0..1000 {
            // SAFETY: This thread is the only producer.
            while unsafe { ring_p.try_push(i) }.is_err() {
                thread::yield_now();
            }
        }
    });

    let mut received = Vec::with_capacity(1000);
    while received.len() < 1000 {
        // SAFETY: The test thread is the only consumer.
        match unsafe { ring.try_pop() } {
            Some(item) => received.push(item),
            None => thread::yield_now(),
        }
    }

    producer_handle.join().unwrap();
    assert_eq!(received, (0..1000).collect::<Vec<_>>());
    assert!(ring.is_empty());
}

#[test]
fn test_blocking_accessors_across_threads() {
    let (producer, consumer) = spsc::channel::<u64>(4).unwrap();

    let producer_handle = thread::spawn(move || {
        for i in 0..10_000 {
            producer.push_blocking(i, Timeout::Infinite).unwrap();
        }
    });

    let mut sum = 0;
    for expected in 0..10_000 {
        let item = consumer.pop_blocking(Timeout::Infinite).unwrap();
        assert_eq!(item, expected);
        sum += item;
    }

    producer_handle.join().unwrap();
    assert_eq!(sum, (0..10_000).sum::<u64>());
}

#[test]
fn test_busy_spin_config_across_threads() {
    let (producer, consumer) = spsc::channel_with_config::<u64>(3, SpinConfig::busy()).unwrap();

    let consumer_handle = thread::spawn(move || {
        (0..500)
            .map(|_| consumer.pop_blocking(Duration::from_secs(10).into()))
            .collect::<Option<Vec<_>>>()
    });

    for i in 0..500 {
        producer.push_blocking(i, Duration::from_secs(10).into()).unwrap();
    }

    assert_eq!(
        consumer_handle.join().unwrap(),
        Some((0..500).collect::<Vec<_>>())
    );
}

#[test]
fn test_boxed_handles_transfer_ownership() {
    let (producer, consumer) = spsc::channel::<Box<[u8; 32]>>(8).unwrap();

    let producer_handle = thread::spawn(move || {
        for i in 0..200u8 {
            producer
                .push_blocking(Box::new([i; 32]), Timeout::Infinite)
                .unwrap();
        }
    });

    for i in 0..200u8 {
        let block = consumer.pop_blocking(Timeout::Infinite).unwrap();
        assert!(block.iter().all(|&b| b == i));
    }

    producer_handle.join().unwrap();
}

/// Counts drops so loss or duplication shows up as a count mismatch.
#[derive(Debug)]
struct Tracked(Arc<AtomicUsize>);

impl Drop for Tracked {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

#[test]
fn test_every_item_dropped_exactly_once() {
    let drops = Arc::new(AtomicUsize::new(0));
    let (producer, consumer) = spsc::channel::<Tracked>(5).unwrap();

    let drops_p = Arc::clone(&drops);
    let producer_handle = thread::spawn(move || {
        for _ in 0..300 {
            producer
                .push_blocking(Tracked(Arc::clone(&drops_p)), Timeout::Infinite)
                .unwrap();
        }
        // Producer handle dropped here while items may still be queued.
    });

    let mut popped = 0;
    while popped < 296 {
        if consumer.pop_blocking(Timeout::Infinite).is_some() {
            popped += 1;
        }
    }

    producer_handle.join().unwrap();
    assert_eq!(consumer.len(), 4);
    drop(consumer);

    assert_eq!(drops.load(Ordering::Relaxed), 300);
}
