//! Per-channel decode rules.
//!
//! Each channel follows the same layered structure as the rest of the crate:
//! - `types`: type tags and byte widths (source of truth)
//! - `reader`: safe byte access and byte-order conventions
//! - `descriptor`: domain-level decoding (no direct byte indexing)
//! - `error`: explicit, actionable errors
//!
//! Decoding is pure and performs no I/O; the decoder in `source` owns the
//! byte stream and hands complete records to the descriptors.

pub mod descriptor;
pub mod error;
pub mod reader;
pub mod types;

pub use descriptor::ChannelDescriptor;
pub use error::DecodeError;
pub use reader::{ByteOrder, RecordReader};
pub use types::ChannelType;
