//! Audio playback sink.
//!
//! Accepts discrete 16-bit PCM chunks from the session loop and renders
//! them on the default output device. The only logic here is the FIFO of
//! pending bytes the output callback drains; underruns play silence.
//!
//! # Threading note
//!
//! `cpal::Stream` is `!Send`, so the stream lives on a dedicated render
//! thread. The [`Playback`] handle itself is `Send + Sync` and can be
//! shared with async tasks.

use std::collections::VecDeque;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc, Arc,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    SampleFormat, SampleRate, Stream,
};
use parking_lot::Mutex;
use tracing::{error, info};

use crate::{
    buffering::{CHANNELS, SAMPLE_RATE},
    error::{CarolError, Result},
};

/// FIFO of pending 16-bit PCM bytes shared with the output callback.
struct PlaybackQueue {
    pending: Mutex<VecDeque<u8>>,
}

impl PlaybackQueue {
    fn new() -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
        }
    }

    /// Append a chunk. A trailing odd byte is dropped so the queue always
    /// holds whole samples.
    fn push(&self, chunk: &[u8]) {
        let aligned = &chunk[..chunk.len() & !1];
        self.pending.lock().extend(aligned.iter().copied());
    }

    fn clear(&self) {
        self.pending.lock().clear();
    }

    fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Fill an interleaved i16 output buffer, duplicating the mono sample
    /// across `channels` and substituting silence on underrun.
    fn fill_i16(&self, out: &mut [i16], channels: usize) {
        let mut pending = self.pending.lock();
        for frame in out.chunks_mut(channels.max(1)) {
            let sample = match (pending.pop_front(), pending.pop_front()) {
                (Some(lo), Some(hi)) => i16::from_le_bytes([lo, hi]),
                _ => 0,
            };
            for slot in frame.iter_mut() {
                *slot = sample;
            }
        }
    }

    /// Same as [`fill_i16`](Self::fill_i16) for f32 output devices.
    fn fill_f32(&self, out: &mut [f32], channels: usize) {
        let mut pending = self.pending.lock();
        for frame in out.chunks_mut(channels.max(1)) {
            let sample = match (pending.pop_front(), pending.pop_front()) {
                (Some(lo), Some(hi)) => f32::from(i16::from_le_bytes([lo, hi])) / 32768.0,
                _ => 0.0,
            };
            for slot in frame.iter_mut() {
                *slot = sample;
            }
        }
    }
}

/// Handle to the playback render thread.
pub struct Playback {
    queue: Arc<PlaybackQueue>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Playback {
    /// Open the default output device at 24 kHz and start rendering.
    ///
    /// Blocks until the device is confirmed open (or has failed) on the
    /// render thread.
    ///
    /// # Errors
    /// Returns `CarolError::NoDefaultOutputDevice` when no output device is
    /// available, `CarolError::AudioDevice` when no usable output
    /// configuration exists, or `CarolError::AudioStream` on stream errors.
    pub fn start() -> Result<Self> {
        let queue = Arc::new(PlaybackQueue::new());
        let running = Arc::new(AtomicBool::new(true));

        // Sync channel: the render thread reports open success/failure.
        let (open_tx, open_rx) = mpsc::channel::<Result<()>>();

        let thread_queue = Arc::clone(&queue);
        let thread_running = Arc::clone(&running);
        let worker = thread::Builder::new()
            .name("carol-playback".into())
            .spawn(move || {
                // The stream must be created and dropped on this thread —
                // cpal::Stream is !Send.
                let stream = match open_output_stream(&thread_queue) {
                    Ok(stream) => {
                        let _ = open_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = open_tx.send(Err(e));
                        return;
                    }
                };

                while thread_running.load(Ordering::Relaxed) {
                    thread::sleep(Duration::from_millis(50));
                }

                // Releases the output device on this thread.
                drop(stream);
            })
            .map_err(|e| CarolError::AudioStream(e.to_string()))?;

        match open_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                queue,
                running,
                worker: Some(worker),
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CarolError::AudioStream(
                "playback thread died before opening the device".into(),
            )),
        }
    }

    /// Enqueue 16-bit PCM bytes for playback.
    pub fn enqueue(&self, chunk: &[u8]) {
        self.queue.push(chunk);
    }

    /// Flush all pending playback, e.g. when the speaker is interrupted.
    pub fn clear(&self) {
        self.queue.clear();
    }

    /// Bytes queued but not yet rendered.
    pub fn pending_bytes(&self) -> usize {
        self.queue.len()
    }

    /// Stop rendering and release the output device. Idempotent.
    pub fn stop(&mut self) {
        if self.running.swap(false, Ordering::SeqCst) {
            if let Some(worker) = self.worker.take() {
                let _ = worker.join();
            }
            info!("playback stopped");
        }
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        self.stop();
    }
}

fn open_output_stream(queue: &Arc<PlaybackQueue>) -> Result<Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(CarolError::NoDefaultOutputDevice)?;

    let rate_matches = |c: &cpal::SupportedStreamConfigRange| {
        c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
            && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
    };

    let supported = device
        .supported_output_configs()
        .map_err(|e| CarolError::AudioDevice(e.to_string()))?
        .find(|c| c.channels() == CHANNELS && rate_matches(c))
        .or_else(|| {
            // Mono output is rare on desktop hardware; duplicate into stereo.
            device
                .supported_output_configs()
                .ok()?
                .find(|c| c.channels() == 2 && rate_matches(c))
        })
        .ok_or_else(|| {
            CarolError::AudioDevice(format!("no output configuration at {SAMPLE_RATE} Hz"))
        })?;

    let sample_format = supported.sample_format();
    let config = supported.with_sample_rate(SampleRate(SAMPLE_RATE)).config();
    let channels = config.channels as usize;

    info!(
        device = device.name().unwrap_or_default().as_str(),
        sample_rate = SAMPLE_RATE,
        channels,
        ?sample_format,
        "opening output device"
    );

    let stream = match sample_format {
        SampleFormat::I16 => {
            let queue = Arc::clone(queue);
            device.build_output_stream(
                &config,
                move |data: &mut [i16], _info| queue.fill_i16(data, channels),
                |err| error!("audio playback error: {err}"),
                None,
            )
        }
        SampleFormat::F32 => {
            let queue = Arc::clone(queue);
            device.build_output_stream(
                &config,
                move |data: &mut [f32], _info| queue.fill_f32(data, channels),
                |err| error!("audio playback error: {err}"),
                None,
            )
        }
        fmt => {
            return Err(CarolError::AudioStream(format!(
                "unsupported output sample format: {fmt:?}"
            )))
        }
    }
    .map_err(|e| CarolError::AudioStream(e.to_string()))?;

    stream
        .play()
        .map_err(|e| CarolError::AudioStream(e.to_string()))?;

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::PlaybackQueue;

    #[test]
    fn fill_drains_queued_samples_in_order() {
        let queue = PlaybackQueue::new();
        queue.push(&[0x01, 0x00, 0x02, 0x00, 0x03, 0x00]);

        let mut out = [0i16; 3];
        queue.fill_i16(&mut out, 1);
        assert_eq!(out, [1, 2, 3]);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn underrun_renders_silence() {
        let queue = PlaybackQueue::new();
        queue.push(&[0x01, 0x00]);

        let mut out = [7i16; 4];
        queue.fill_i16(&mut out, 1);
        assert_eq!(out, [1, 0, 0, 0]);
    }

    #[test]
    fn stereo_fill_duplicates_the_mono_sample() {
        let queue = PlaybackQueue::new();
        queue.push(&[0x05, 0x00, 0x06, 0x00]);

        let mut out = [0i16; 4];
        queue.fill_i16(&mut out, 2);
        assert_eq!(out, [5, 5, 6, 6]);
    }

    #[test]
    fn f32_fill_scales_into_unit_range() {
        let queue = PlaybackQueue::new();
        queue.push(&(16384i16).to_le_bytes());

        let mut out = [0f32; 1];
        queue.fill_f32(&mut out, 1);
        assert!((out[0] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn clear_flushes_pending_playback() {
        let queue = PlaybackQueue::new();
        queue.push(&[0x01, 0x00, 0x02, 0x00]);
        queue.clear();
        assert_eq!(queue.len(), 0);

        let mut out = [9i16; 2];
        queue.fill_i16(&mut out, 1);
        assert_eq!(out, [0, 0]);
    }

    #[test]
    fn trailing_odd_byte_is_dropped() {
        let queue = PlaybackQueue::new();
        queue.push(&[0x01, 0x00, 0x02]);
        assert_eq!(queue.len(), 2);
    }
}
