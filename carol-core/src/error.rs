use thiserror::Error;

/// All errors produced by carol-core.
#[derive(Debug, Error)]
pub enum CarolError {
    #[error("audio device error: {0}")]
    AudioDevice(String),

    #[error("audio stream error: {0}")]
    AudioStream(String),

    #[error("no default input device found")]
    NoDefaultInputDevice,

    #[error("no default output device found")]
    NoDefaultOutputDevice,

    #[error("invalid read length {requested} for ring of capacity {capacity}")]
    InvalidReadLength { requested: usize, capacity: usize },

    #[error("capture ring cancelled while a read was pending")]
    ReadCancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CarolError>;
