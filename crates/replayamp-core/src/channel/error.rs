use thiserror::Error;

/// Errors returned when a record slice cannot hold a channel field.
///
/// Records handed out by the stream decoder always span the full layout, so
/// this only surfaces when descriptors are applied to foreign buffers.
///
/// # Examples
/// ```
/// use replayamp_core::DecodeError;
///
/// let err = DecodeError::TooShort { needed: 8, actual: 4 };
/// assert!(err.to_string().contains("record too short"));
/// ```
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("record too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
}
