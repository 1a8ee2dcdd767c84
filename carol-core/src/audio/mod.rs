//! Audio capture via cpal backend.
//!
//! # Design constraints
//!
//! The cpal input callback runs on an OS audio thread at elevated priority.
//! It **must not**:
//! - Allocate heap memory
//! - Block on the consumer
//! - Perform I/O
//!
//! This module satisfies that contract by encoding each delivered block into
//! a reused scratch buffer and copying it into the [`CaptureRing`], whose
//! write path holds its lock only for the duration of the copy.
//!
//! # Threading note
//!
//! `cpal::Stream` is `!Send` on most platforms (COM on Windows, CoreAudio on
//! macOS). `AudioCapture` therefore must be created and dropped on the same
//! thread. The app accomplishes this by calling `start_with_ring` inside
//! `spawn_blocking`.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    SampleFormat, SampleRate, Stream,
};
use tracing::{error, info};

use crate::{
    buffering::{CaptureRing, RingConfig, CHANNELS, SAMPLE_RATE},
    error::{CarolError, Result},
};

/// Handle to an active capture stream feeding a [`CaptureRing`].
///
/// **Not `Send`** — `cpal::Stream` is bound to its creation thread on
/// Windows/macOS. Create and drop this type on the same OS thread.
pub struct AudioCapture {
    /// Kept alive so the stream is not dropped prematurely.
    _stream: Stream,
    ring: Arc<CaptureRing>,
    /// Shared flag — set to `false` to signal the callback to no-op.
    running: Arc<AtomicBool>,
}

impl AudioCapture {
    /// Open the default input device with default ring sizing and begin
    /// capture immediately.
    ///
    /// # Errors
    /// See [`start_with_ring`](Self::start_with_ring).
    pub fn start() -> Result<Self> {
        Self::start_with_ring(Arc::new(CaptureRing::new(RingConfig::default())))
    }

    /// Open the default input device at the fixed capture format (mono,
    /// 16-bit PCM, 24 kHz), register the capture callback writing into
    /// `ring`, and begin capture immediately.
    ///
    /// Failure to acquire the device or the format is fatal to this call —
    /// there is no fallback device probing.
    ///
    /// # Errors
    /// Returns `CarolError::NoDefaultInputDevice` when no microphone is
    /// available, `CarolError::AudioDevice` when the device cannot run the
    /// capture format, or `CarolError::AudioStream` if cpal fails to build
    /// or start the stream.
    pub fn start_with_ring(ring: Arc<CaptureRing>) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(CarolError::NoDefaultInputDevice)?;

        let supported = device
            .supported_input_configs()
            .map_err(|e| CarolError::AudioDevice(e.to_string()))?
            .find(|c| {
                c.channels() == CHANNELS
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .ok_or_else(|| {
                CarolError::AudioDevice(format!(
                    "no mono input configuration at {SAMPLE_RATE} Hz"
                ))
            })?;

        let sample_format = supported.sample_format();
        let config = supported.with_sample_rate(SampleRate(SAMPLE_RATE)).config();

        info!(
            device = device.name().unwrap_or_default().as_str(),
            sample_rate = SAMPLE_RATE,
            ?sample_format,
            "opening input device"
        );

        let running = Arc::new(AtomicBool::new(true));
        let running_i16 = Arc::clone(&running);
        let running_f32 = Arc::clone(&running);
        let ring_i16 = Arc::clone(&ring);
        let ring_f32 = Arc::clone(&ring);

        let stream = match sample_format {
            SampleFormat::I16 => {
                let mut scratch: Vec<u8> = Vec::new();
                device.build_input_stream(
                    &config,
                    move |data: &[i16], _info| {
                        if !running_i16.load(Ordering::Relaxed) {
                            return;
                        }
                        encode_pcm(&mut scratch, data.iter().copied());
                        ring_i16.write(&scratch);
                    },
                    |err| error!("audio stream error: {err}"),
                    None,
                )
            }

            SampleFormat::F32 => {
                let mut scratch: Vec<u8> = Vec::new();
                device.build_input_stream(
                    &config,
                    move |data: &[f32], _info| {
                        if !running_f32.load(Ordering::Relaxed) {
                            return;
                        }
                        encode_pcm(&mut scratch, data.iter().map(|s| f32_to_i16(*s)));
                        ring_f32.write(&scratch);
                    },
                    |err| error!("audio stream error: {err}"),
                    None,
                )
            }

            fmt => {
                return Err(CarolError::AudioStream(format!(
                    "unsupported sample format: {fmt:?}"
                )))
            }
        }
        .map_err(|e| CarolError::AudioStream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| CarolError::AudioStream(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            ring,
            running,
        })
    }

    /// Blocking read of exactly `dest.len()` bytes of captured audio.
    ///
    /// See [`CaptureRing::read_exact`] for the waiting and error contract.
    pub fn read_exact(&self, dest: &mut [u8]) -> Result<usize> {
        self.ring.read_exact(dest)
    }

    /// The ring this capture writes into.
    pub fn ring(&self) -> Arc<CaptureRing> {
        Arc::clone(&self.ring)
    }

    /// Stop: signal the callback to no-op and cancel the ring so pending
    /// reads unblock. Idempotent. Unread audio is discarded; the device
    /// itself is released when the handle drops.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.ring.cancel();
            info!("capture stopped");
        }
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Re-encode samples as little-endian 16-bit PCM into a reused buffer.
fn encode_pcm<I>(out: &mut Vec<u8>, samples: I)
where
    I: Iterator<Item = i16>,
{
    out.clear();
    for sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0) as i16
}

#[cfg(test)]
mod tests {
    use super::{encode_pcm, f32_to_i16};

    #[test]
    fn encodes_samples_as_little_endian_pairs() {
        let mut out = Vec::new();
        encode_pcm(&mut out, [1i16, -2, 256].into_iter());
        assert_eq!(out, [0x01, 0x00, 0xFE, 0xFF, 0x00, 0x01]);
    }

    #[test]
    fn scratch_buffer_is_reset_between_blocks() {
        let mut out = Vec::new();
        encode_pcm(&mut out, [1i16; 8].into_iter());
        encode_pcm(&mut out, [2i16, 3].into_iter());
        assert_eq!(out, [0x02, 0x00, 0x03, 0x00]);
    }

    #[test]
    fn float_conversion_clamps_out_of_range_samples() {
        assert_eq!(f32_to_i16(0.0), 0);
        assert_eq!(f32_to_i16(1.0), 32767);
        assert_eq!(f32_to_i16(-1.5), -32767);
        assert_eq!(f32_to_i16(2.0), 32767);
    }
}
