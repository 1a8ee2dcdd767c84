//! Fixed-capacity byte ring between the capture callback and the consumer.
//!
//! The cpal input callback runs on a driver-owned thread and delivers blocks
//! of driver-determined size at driver-determined times. The outbound audio
//! sender wants the opposite: a steady, blocking pull of exactly-sized
//! chunks. `CaptureRing` adapts the two with a pre-allocated circular byte
//! array, a single `parking_lot::Mutex` guarding the array and both cursors,
//! and a sleep-poll blocking read.
//!
//! # Design constraints
//!
//! The write path must never block and never allocate — it executes inside a
//! time-sensitive driver callback. The read path is the only suspension
//! point: it polls availability (lock-free snapshot, re-verified under the
//! lock before copying) and sleeps a fixed interval between checks, so the
//! producer never has to signal a wake-up from callback context.
//!
//! # Overruns
//!
//! Nothing stops the producer when the consumer lags. Once a write pushes
//! occupancy past the capacity, the oldest unread bytes are silently
//! dropped: the read cursor is re-snapped to the oldest surviving byte so
//! the stream stays in FIFO order, and `overrun_count` is incremented. No
//! error is raised on either side.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{CarolError, Result};

/// Fixed capture sample rate in Hz.
pub const SAMPLE_RATE: u32 = 24_000;

/// Bytes per sample (16-bit signed PCM).
pub const BYTES_PER_SAMPLE: usize = 2;

/// Capture channel count (mono).
pub const CHANNELS: u16 = 1;

/// Seconds of audio the default ring holds before overwriting.
pub const BUFFERED_SECONDS: usize = 10;

/// Sizing and polling knobs for [`CaptureRing`].
///
/// The defaults match the capture format (480 000 bytes = 10 s of 16-bit
/// mono at 24 kHz, polled every 100 ms). Tests shrink both for determinism.
#[derive(Debug, Clone)]
pub struct RingConfig {
    /// Total capacity in bytes. Fixed at construction, never resized.
    pub capacity: usize,
    /// Sleep interval between availability checks in a blocking read.
    pub poll_interval: Duration,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            capacity: BYTES_PER_SAMPLE
                * SAMPLE_RATE as usize
                * CHANNELS as usize
                * BUFFERED_SECONDS,
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Bounded circular byte buffer with a non-blocking write side and a
/// blocking, exactly-sized read side.
///
/// One writer (the capture callback) and one reader (the outbound pump) are
/// expected; all cursor updates happen with the array lock held, so extra
/// writers would be safe but make the byte order meaningless.
///
/// Seeking, stream-length queries and consumer-side writes are deliberately
/// absent — this is a one-directional capture adapter, not a general stream.
pub struct CaptureRing {
    buf: Mutex<Box<[u8]>>,
    capacity: usize,
    /// Index of the next byte to write, `< capacity`. Advanced only with
    /// `buf` locked; the atomic mirror lets the reader poll availability
    /// without taking the lock.
    write_pos: AtomicUsize,
    /// Index of the next byte to read, `< capacity`. Advanced under the lock
    /// by the reader, and by the writer when an overrun drops old data.
    read_pos: AtomicUsize,
    /// Disambiguates `write_pos == read_pos`: true means the ring holds a
    /// full `capacity` bytes, false means it is empty.
    full: AtomicBool,
    poll_interval: Duration,
    cancelled: AtomicBool,
    overruns: AtomicU64,
}

impl CaptureRing {
    /// Create a ring with the given capacity and poll interval.
    ///
    /// # Panics
    /// Panics if `config.capacity` is zero.
    pub fn new(config: RingConfig) -> Self {
        assert!(config.capacity > 0, "ring capacity must be non-zero");
        Self {
            buf: Mutex::new(vec![0u8; config.capacity].into_boxed_slice()),
            capacity: config.capacity,
            write_pos: AtomicUsize::new(0),
            read_pos: AtomicUsize::new(0),
            full: AtomicBool::new(false),
            poll_interval: config.poll_interval,
            cancelled: AtomicBool::new(false),
            overruns: AtomicU64::new(0),
        }
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently readable. Racy when called without the lock — the
    /// blocking read treats it as a snapshot and re-checks under the lock.
    fn available(&self) -> usize {
        let write = self.write_pos.load(Ordering::Acquire);
        let read = self.read_pos.load(Ordering::Acquire);
        if write == read {
            if self.full.load(Ordering::Acquire) {
                self.capacity
            } else {
                0
            }
        } else if write < read {
            write + (self.capacity - read)
        } else {
            write - read
        }
    }

    /// Append a block of bytes, wrapping and silently dropping the oldest
    /// unread data on overrun. Called from the capture callback: completes
    /// its copy immediately regardless of consumer progress, and never
    /// allocates.
    pub fn write(&self, block: &[u8]) {
        if block.is_empty() {
            return;
        }

        let mut buf = self.buf.lock();
        let cap = self.capacity;
        let occupied = self.available();
        let incoming = block.len();

        let mut write = self.write_pos.load(Ordering::Relaxed);
        let mut rest = block;
        while !rest.is_empty() {
            let take = rest.len().min(cap - write);
            buf[write..write + take].copy_from_slice(&rest[..take]);
            rest = &rest[take..];
            write += take;
            if write == cap {
                write = 0;
            }
        }
        self.write_pos.store(write, Ordering::Release);

        if occupied + incoming >= cap {
            // Ring is now exactly full, or the write ran over unread data.
            // Either way the oldest surviving byte sits at the write cursor.
            if occupied + incoming > cap {
                self.overruns.fetch_add(1, Ordering::Relaxed);
            }
            self.read_pos.store(write, Ordering::Release);
            self.full.store(true, Ordering::Release);
        }
    }

    /// Blocking read of exactly `dest.len()` bytes.
    ///
    /// Polls availability every `poll_interval` until enough bytes have been
    /// written, then copies them out in FIFO order (split across the wrap
    /// point when needed) and returns `Ok(dest.len())`. Never returns a
    /// short read. Callers that need streaming semantics call this in a loop
    /// with the same chunk size.
    ///
    /// # Errors
    /// - [`CarolError::InvalidReadLength`] when `dest` is empty or larger
    ///   than the ring capacity.
    /// - [`CarolError::ReadCancelled`] when [`cancel`](Self::cancel) is
    ///   called before or while the read is waiting. Observed within one
    ///   poll interval.
    pub fn read_exact(&self, dest: &mut [u8]) -> Result<usize> {
        let count = dest.len();
        if count == 0 || count > self.capacity {
            return Err(CarolError::InvalidReadLength {
                requested: count,
                capacity: self.capacity,
            });
        }

        loop {
            if self.cancelled.load(Ordering::Acquire) {
                return Err(CarolError::ReadCancelled);
            }

            if self.available() >= count {
                let buf = self.buf.lock();
                // Re-verify: an overrun between the snapshot and the lock
                // moves the read cursor.
                if self.available() >= count {
                    let cap = self.capacity;
                    let read = self.read_pos.load(Ordering::Relaxed);
                    if read + count >= cap {
                        let tail = cap - read;
                        dest[..tail].copy_from_slice(&buf[read..]);
                        dest[tail..].copy_from_slice(&buf[..count - tail]);
                        self.read_pos.store(count - tail, Ordering::Release);
                    } else {
                        dest.copy_from_slice(&buf[read..read + count]);
                        self.read_pos.store(read + count, Ordering::Release);
                    }
                    self.full.store(false, Ordering::Release);
                    return Ok(count);
                }
            }

            std::thread::sleep(self.poll_interval);
        }
    }

    /// Unblock any pending or future `read_exact` with
    /// [`CarolError::ReadCancelled`]. Idempotent; writes are unaffected.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Number of writes that dropped unread data because the consumer fell
    /// more than one buffer behind.
    pub fn overrun_count(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }
}
