use serde::{Deserialize, Serialize};

pub const FLOAT64_WIDTH: usize = 8;
pub const FLOAT32_WIDTH: usize = 4;
pub const INT32_WIDTH: usize = 4;
pub const UINT32_WIDTH: usize = 4;

pub const FLOAT64_TAG: &str = "double";
pub const FLOAT32_TAG: &str = "float";
pub const INT32_TAG: &str = "int32";
pub const UINT32_TAG: &str = "uint32";

/// Numeric representation of one channel field inside a record.
///
/// The set is closed: every match over it is exhaustive, so adding a type
/// means touching the width, tag and decode tables together.
///
/// # Examples
/// ```
/// use replayamp_core::ChannelType;
///
/// let ty = ChannelType::from_tag("uint32").unwrap();
/// assert_eq!(ty.width(), 4);
/// assert!(!ty.is_signed());
/// assert_eq!(ChannelType::from_tag("int16"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelType {
    #[serde(rename = "double")]
    Float64,
    #[serde(rename = "float")]
    Float32,
    #[serde(rename = "int32")]
    Int32,
    #[serde(rename = "uint32")]
    Uint32,
}

impl ChannelType {
    pub const ALL: [ChannelType; 4] = [
        ChannelType::Float64,
        ChannelType::Float32,
        ChannelType::Int32,
        ChannelType::Uint32,
    ];

    /// Resolve a configuration tag (`double`, `float`, `int32`, `uint32`).
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            FLOAT64_TAG => Some(ChannelType::Float64),
            FLOAT32_TAG => Some(ChannelType::Float32),
            INT32_TAG => Some(ChannelType::Int32),
            UINT32_TAG => Some(ChannelType::Uint32),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            ChannelType::Float64 => FLOAT64_TAG,
            ChannelType::Float32 => FLOAT32_TAG,
            ChannelType::Int32 => INT32_TAG,
            ChannelType::Uint32 => UINT32_TAG,
        }
    }

    /// Field width in bytes.
    pub fn width(self) -> usize {
        match self {
            ChannelType::Float64 => FLOAT64_WIDTH,
            ChannelType::Float32 => FLOAT32_WIDTH,
            ChannelType::Int32 => INT32_WIDTH,
            ChannelType::Uint32 => UINT32_WIDTH,
        }
    }

    pub fn is_signed(self) -> bool {
        match self {
            ChannelType::Float64 | ChannelType::Float32 | ChannelType::Int32 => true,
            ChannelType::Uint32 => false,
        }
    }
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}
