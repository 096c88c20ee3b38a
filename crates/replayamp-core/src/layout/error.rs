use thiserror::Error;

/// Errors returned while turning configuration into a record layout.
///
/// All of these abort initialization; the caller decides how to exit.
///
/// # Examples
/// ```
/// use replayamp_core::ConfigError;
///
/// let err = ConfigError::WrongGainCount { expected: 3, actual: 2 };
/// assert!(err.to_string().contains("wrong number of channel gains"));
/// ```
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no channels configured")]
    NoChannels,
    #[error("not enough channel types: {names} names, {types} types")]
    NotEnoughTypes { names: usize, types: usize },
    #[error("too many channel types: {names} names, {types} types")]
    TooManyTypes { names: usize, types: usize },
    #[error("wrong number of channel gains: expected {expected}, got {actual}")]
    WrongGainCount { expected: usize, actual: usize },
    #[error("wrong number of channel offsets: expected {expected}, got {actual}")]
    WrongOffsetCount { expected: usize, actual: usize },
    #[error("duplicate channel name '{name}'")]
    DuplicateChannel { name: String },
    #[error("unknown type '{tag}' for channel '{channel}' (expected double, float, int32 or uint32)")]
    UnknownType { channel: String, tag: String },
    #[error("unknown active channel '{name}'")]
    UnknownActiveChannel { name: String },
    #[error("batch size must be at least one record")]
    ZeroBatchSize,
    #[error("batch of {batch_size} records of {record_len} bytes does not fit in memory")]
    BatchTooLarge { batch_size: usize, record_len: usize },
    #[error("sampling rate must be a positive number of Hz, got {rate}")]
    InvalidSamplingRate { rate: String },
}
