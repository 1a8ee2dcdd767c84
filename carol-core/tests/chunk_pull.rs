use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use carol_core::{CaptureRing, CarolError, RingConfig};

/// 20 ms of 16-bit mono audio at 24 kHz, the typical driver block size.
const DRIVER_BLOCK: usize = 960;

/// 100 ms outbound chunk, the size the session pump pulls.
const PULL_CHUNK: usize = 4_800;

fn pump_ring() -> Arc<CaptureRing> {
    Arc::new(CaptureRing::new(RingConfig {
        capacity: 48_000,
        poll_interval: Duration::from_millis(2),
    }))
}

#[test]
fn fixed_chunk_pump_reassembles_the_driver_block_stream() {
    let ring = pump_ring();
    let blocks = 50usize;

    let producer_ring = Arc::clone(&ring);
    let producer = thread::spawn(move || {
        let mut next = 0u8;
        for _ in 0..blocks {
            let block: Vec<u8> = (0..DRIVER_BLOCK)
                .map(|_| {
                    let b = next;
                    next = next.wrapping_add(1);
                    b
                })
                .collect();
            producer_ring.write(&block);
            // Roughly real-time pacing, sped up for the test.
            thread::sleep(Duration::from_micros(500));
        }
    });

    let total = blocks * DRIVER_BLOCK;
    let mut received = Vec::with_capacity(total);
    let mut chunk = vec![0u8; PULL_CHUNK];
    while received.len() < total {
        let n = ring.read_exact(&mut chunk).expect("pull failed");
        assert_eq!(n, PULL_CHUNK, "pump must never see a short read");
        received.extend_from_slice(&chunk);
    }
    producer.join().unwrap();

    let mut expected = 0u8;
    for &byte in &received {
        assert_eq!(byte, expected);
        expected = expected.wrapping_add(1);
    }
    assert_eq!(ring.overrun_count(), 0);
}

#[test]
fn first_chunk_latency_is_bounded_by_the_poll_interval() {
    let ring = pump_ring();

    let reader_ring = Arc::clone(&ring);
    let reader = thread::spawn(move || {
        let mut chunk = vec![0u8; PULL_CHUNK];
        reader_ring.read_exact(&mut chunk).unwrap();
        Instant::now()
    });

    // Let the reader settle into its poll loop before data shows up.
    thread::sleep(Duration::from_millis(20));
    for _ in 0..(PULL_CHUNK / DRIVER_BLOCK) {
        ring.write(&[0x11; DRIVER_BLOCK]);
    }
    let ready_at = Instant::now();

    let returned_at = reader.join().unwrap();
    assert!(
        returned_at.duration_since(ready_at) < Duration::from_millis(100),
        "read returned {:?} after data was ready",
        returned_at.duration_since(ready_at)
    );
}

#[test]
fn shutdown_cancels_a_pump_blocked_on_a_silent_capture() {
    let ring = pump_ring();

    let blocked_ring = Arc::clone(&ring);
    let pump = thread::spawn(move || {
        let mut chunk = vec![0u8; PULL_CHUNK];
        blocked_ring.read_exact(&mut chunk)
    });

    // No audio will ever arrive; the pump would poll forever without this.
    thread::sleep(Duration::from_millis(20));
    ring.cancel();

    assert!(matches!(
        pump.join().unwrap(),
        Err(CarolError::ReadCancelled)
    ));
}
