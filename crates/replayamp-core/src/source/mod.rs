//! Sample sources.
//!
//! `decoder` turns a byte stream into records, `file` wraps it as a replayed
//! amplifier, and `threaded` moves any source behind a channel so its
//! blocking reads run off the caller's thread.

pub mod decoder;
pub mod file;
pub mod threaded;

use std::path::PathBuf;

use thiserror::Error;

use crate::channel::DecodeError;
use crate::layout::ConfigError;

pub use decoder::{Advance, DecoderError, DecoderState, RecordDecoder};
pub use file::{AmplifierOptions, FileAmplifier};
pub use threaded::{SampleStream, spawn_source};

/// One record's worth of channel values.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Zero-based record number in stream order.
    pub index: u64,
    /// Seconds, derived from the start time and sampling rate.
    pub timestamp: f64,
    /// One value per active channel, in active-channel order.
    pub values: Vec<f64>,
}

/// Pull interface shared by replayed and live amplifiers.
///
/// `Ok(None)` means end-of-stream; implementations keep returning it once
/// reached.
pub trait SampleSource {
    fn next_sample(&mut self) -> Result<Option<Sample>, SourceError>;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn next_sample(&mut self) -> Result<Option<Sample>, SourceError> {
        (**self).next_sample()
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("DEVICE OPEN ERROR: could not open file {}: {source}", .path.display())]
    DeviceOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("decoder error: {0}")]
    Decoder(String),
    #[error("sample stream disconnected")]
    Disconnected,
}

impl From<DecoderError> for SourceError {
    fn from(value: DecoderError) -> Self {
        match value {
            DecoderError::Io(err) => SourceError::Io(err),
            DecoderError::Decode(err) => SourceError::Decode(err),
            other @ DecoderError::NoRecord { .. } => SourceError::Decoder(other.to_string()),
        }
    }
}
