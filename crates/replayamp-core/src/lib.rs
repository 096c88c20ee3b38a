//! replayamp core library: replay recorded amplifier data as a live source.
//!
//! A recording is a headerless stream of fixed-width records, one field per
//! channel. The channel configuration (names, types, gains, offsets) is
//! turned into a packed [`RecordLayout`]; a [`RecordDecoder`] reads the
//! stream in batches of whole records and decodes fields on demand; a
//! [`FileAmplifier`] exposes the result through the same [`SampleSource`]
//! pull interface a hardware driver would. All I/O stays in `source`; the
//! `channel` and `layout` modules are pure.
//!
//! Invariants:
//! - Channel byte offsets are the prefix sums of the preceding widths.
//! - Records are delivered strictly in stream order; a trailing partial
//!   record is never decoded.
//! - End-of-stream is a normal `Ok(None)`, reported once to the stop
//!   callback and idempotent afterwards.
//!
//! # Examples
//! ```no_run
//! use std::path::Path;
//!
//! use replayamp_core::{AmplifierOptions, FileAmplifier, LayoutConfig, SampleSource};
//!
//! let config = LayoutConfig::from_joined("C3;C4;trig", "float;float;uint32", "0.1;0.1;1", "");
//! let mut amp = FileAmplifier::open(Path::new("session.raw"), &config, AmplifierOptions::default())?;
//! let mut count = 0;
//! while amp.next_sample()?.is_some() {
//!     count += 1;
//! }
//! println!("{count} samples");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::{Deserialize, Serialize};

mod channel;
mod layout;
mod source;

pub use channel::{ByteOrder, ChannelDescriptor, ChannelType, DecodeError, RecordReader};
pub use layout::{ConfigError, LayoutConfig, RecordLayout, TypePolicy, split_list};
pub use source::file::DEFAULT_SAMPLING_RATE;
pub use source::{
    Advance, AmplifierOptions, DecoderError, DecoderState, FileAmplifier, RecordDecoder, Sample,
    SampleSource, SampleStream, SourceError, spawn_source,
};

/// Current layout summary schema version.
pub const SUMMARY_VERSION: u32 = 1;

/// Serializable description of a replayed source.
///
/// # Examples
/// ```
/// use replayamp_core::{ByteOrder, LayoutSummary, SUMMARY_VERSION};
///
/// let summary = LayoutSummary {
///     summary_version: SUMMARY_VERSION,
///     source: "rec.raw".to_string(),
///     record_len: 0,
///     physical_channels: 0,
///     byte_order: ByteOrder::Native,
///     sampling_rate: 128.0,
///     batch_size: 128,
///     channels: Vec::new(),
/// };
/// assert_eq!(summary.summary_version, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSummary {
    /// Summary schema version (not the binary version).
    pub summary_version: u32,
    /// Source name, usually the recording path.
    pub source: String,
    /// Bytes per record.
    pub record_len: usize,
    /// Number of channels stored in each record.
    pub physical_channels: usize,
    pub byte_order: ByteOrder,
    /// Samples per second.
    pub sampling_rate: f64,
    /// Records read per refill.
    pub batch_size: usize,
    /// Channels in physical order.
    pub channels: Vec<ChannelSummary>,
}

/// Per-channel entry of a [`LayoutSummary`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    pub byte_offset: usize,
    pub width: usize,
    pub signed: bool,
    pub gain: f64,
    pub offset: f64,
    /// Whether the channel is emitted in samples.
    pub active: bool,
}
