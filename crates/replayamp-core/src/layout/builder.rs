use std::collections::HashSet;

use crate::channel::descriptor::{DEFAULT_GAIN, DEFAULT_OFFSET};
use crate::channel::{ByteOrder, ChannelDescriptor, ChannelType, DecodeError};

use super::config::{LayoutConfig, TypePolicy, parse_scale};
use super::error::ConfigError;

/// Type used for unknown tags under [`TypePolicy::Lenient`].
pub const LENIENT_FALLBACK_TYPE: ChannelType = ChannelType::Float32;

/// Packed description of one record: channels in physical order, no gaps.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordLayout {
    source_name: String,
    channels: Vec<ChannelDescriptor>,
    record_len: usize,
    byte_order: ByteOrder,
}

impl RecordLayout {
    /// Validate `config` and assign byte offsets in declaration order.
    ///
    /// # Examples
    /// ```
    /// use replayamp_core::{LayoutConfig, RecordLayout};
    ///
    /// let config = LayoutConfig::from_joined("a;b;c", "double;int32;float", "", "");
    /// let layout = RecordLayout::build("rec.raw", &config)?;
    /// let offsets: Vec<_> = layout.channels().iter().map(|c| c.byte_offset).collect();
    /// assert_eq!(offsets, vec![0, 8, 12]);
    /// assert_eq!(layout.record_len(), 16);
    /// # Ok::<(), replayamp_core::ConfigError>(())
    /// ```
    ///
    /// # Errors
    /// Returns `ConfigError` when list lengths disagree, a name repeats, or a
    /// type tag is unknown under the strict policy.
    pub fn build(source_name: &str, config: &LayoutConfig) -> Result<Self, ConfigError> {
        let names = &config.names;
        if names.is_empty() {
            return Err(ConfigError::NoChannels);
        }
        if names.len() > config.types.len() {
            return Err(ConfigError::NotEnoughTypes {
                names: names.len(),
                types: config.types.len(),
            });
        }
        if names.len() < config.types.len() {
            return Err(ConfigError::TooManyTypes {
                names: names.len(),
                types: config.types.len(),
            });
        }
        if !config.gains.is_empty() && config.gains.len() != names.len() {
            return Err(ConfigError::WrongGainCount {
                expected: names.len(),
                actual: config.gains.len(),
            });
        }
        if !config.offsets.is_empty() && config.offsets.len() != names.len() {
            return Err(ConfigError::WrongOffsetCount {
                expected: names.len(),
                actual: config.offsets.len(),
            });
        }

        let mut seen = HashSet::new();
        let mut channels = Vec::with_capacity(names.len());
        let mut byte_offset = 0usize;
        for (index, (name, tag)) in names.iter().zip(&config.types).enumerate() {
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::DuplicateChannel { name: name.clone() });
            }
            let channel_type = resolve_type(name, tag, config.type_policy)?;
            let gain = config
                .gains
                .get(index)
                .map_or(DEFAULT_GAIN, |entry| {
                    parse_scale(entry, DEFAULT_GAIN, name, "gain")
                });
            let offset = config
                .offsets
                .get(index)
                .map_or(DEFAULT_OFFSET, |entry| {
                    parse_scale(entry, DEFAULT_OFFSET, name, "offset")
                });
            channels.push(ChannelDescriptor {
                name: name.clone(),
                channel_type,
                byte_offset,
                gain,
                offset,
                index,
            });
            byte_offset += channel_type.width();
        }

        tracing::debug!(
            source = source_name,
            channels = channels.len(),
            record_len = byte_offset,
            "record layout built"
        );

        Ok(Self {
            source_name: source_name.to_string(),
            channels,
            record_len: byte_offset,
            byte_order: config.byte_order,
        })
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Channels of this source in physical order.
    pub fn channels(&self) -> &[ChannelDescriptor] {
        &self.channels
    }

    pub fn channel(&self, name: &str) -> Option<&ChannelDescriptor> {
        self.channels.iter().find(|channel| channel.name == name)
    }

    pub fn channel_index(&self, name: &str) -> Option<usize> {
        self.channel(name).map(|channel| channel.index)
    }

    /// Bytes per record (sum of channel widths).
    pub fn record_len(&self) -> usize {
        self.record_len
    }

    pub fn physical_channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Map channel names to layout indices; an empty selection means all.
    pub fn resolve_channels(&self, names: &[String]) -> Result<Vec<usize>, ConfigError> {
        if names.is_empty() {
            return Ok((0..self.channels.len()).collect());
        }
        names
            .iter()
            .map(|name| {
                self.channel_index(name)
                    .ok_or_else(|| ConfigError::UnknownActiveChannel { name: name.clone() })
            })
            .collect()
    }

    /// Decode every channel of one record into `out`, replacing its contents.
    pub fn decode_record(&self, record: &[u8], out: &mut Vec<f64>) -> Result<(), DecodeError> {
        out.clear();
        for channel in &self.channels {
            out.push(channel.decode(record, self.byte_order)?);
        }
        Ok(())
    }
}

fn resolve_type(channel: &str, tag: &str, policy: TypePolicy) -> Result<ChannelType, ConfigError> {
    if let Some(channel_type) = ChannelType::from_tag(tag) {
        return Ok(channel_type);
    }
    match policy {
        TypePolicy::Strict => Err(ConfigError::UnknownType {
            channel: channel.to_string(),
            tag: tag.to_string(),
        }),
        TypePolicy::Lenient => {
            tracing::warn!(
                channel,
                tag,
                fallback = LENIENT_FALLBACK_TYPE.tag(),
                "unknown channel type, decoding with fallback"
            );
            Ok(LENIENT_FALLBACK_TYPE)
        }
    }
}
