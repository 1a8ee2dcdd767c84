//! # carol-core
//!
//! Audio engine for the Carol realtime voice console.
//!
//! ## Architecture
//!
//! ```text
//! Microphone → cpal callback → CaptureRing (locked byte ring)
//!                                   │  blocking read_exact (sleep-poll)
//!                                   ▼
//!                         outbound audio pump (carol-app)
//!
//! session audio deltas → Playback queue → cpal output callback → Speakers
//! ```
//!
//! The capture callback is allocation-free and never blocks on the
//! consumer; the consumer's blocking read is the only suspension point.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod buffering;
pub mod error;
pub mod playback;

// Convenience re-exports for downstream crates
pub use audio::AudioCapture;
pub use buffering::{
    CaptureRing, RingConfig, BUFFERED_SECONDS, BYTES_PER_SAMPLE, CHANNELS, SAMPLE_RATE,
};
pub use error::{CarolError, Result};
pub use playback::Playback;
