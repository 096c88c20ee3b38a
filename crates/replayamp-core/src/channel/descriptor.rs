use serde::Serialize;

use super::error::DecodeError;
use super::reader::{ByteOrder, RecordReader};
use super::types::ChannelType;

pub const DEFAULT_GAIN: f64 = 1.0;
pub const DEFAULT_OFFSET: f64 = 0.0;

/// One named, typed, scaled field of a record.
///
/// Descriptors are produced fully formed by [`crate::RecordLayout::build`];
/// `byte_offset` and `index` are positions inside that layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    pub byte_offset: usize,
    pub gain: f64,
    pub offset: f64,
    /// Position of the channel in its layout.
    pub index: usize,
}

impl ChannelDescriptor {
    pub fn width(&self) -> usize {
        self.channel_type.width()
    }

    pub fn is_signed(&self) -> bool {
        self.channel_type.is_signed()
    }

    /// Byte range covered by this channel within one record.
    pub fn byte_range(&self) -> std::ops::Range<usize> {
        self.byte_offset..self.byte_offset + self.width()
    }

    /// Decode the field without scaling.
    pub fn decode_raw(&self, record: &[u8], order: ByteOrder) -> Result<f64, DecodeError> {
        let reader = RecordReader::new(record, order);
        reader.require_len(self.byte_range().end)?;
        let raw = match self.channel_type {
            ChannelType::Float64 => reader.read_f64(self.byte_offset)?,
            ChannelType::Float32 => f64::from(reader.read_f32(self.byte_offset)?),
            ChannelType::Int32 => f64::from(reader.read_i32(self.byte_offset)?),
            ChannelType::Uint32 => f64::from(reader.read_u32(self.byte_offset)?),
        };
        Ok(raw)
    }

    /// Decode the field and apply `raw * gain + offset`.
    ///
    /// # Examples
    /// ```
    /// use replayamp_core::{ByteOrder, ChannelDescriptor, ChannelType};
    ///
    /// let channel = ChannelDescriptor {
    ///     name: "C3".to_string(),
    ///     channel_type: ChannelType::Float32,
    ///     byte_offset: 0,
    ///     gain: 2.0,
    ///     offset: 3.0,
    ///     index: 0,
    /// };
    /// let record = 5.0f32.to_ne_bytes();
    /// assert_eq!(channel.decode(&record, ByteOrder::Native).unwrap(), 13.0);
    /// ```
    pub fn decode(&self, record: &[u8], order: ByteOrder) -> Result<f64, DecodeError> {
        Ok(self.decode_raw(record, order)? * self.gain + self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::{ChannelDescriptor, DEFAULT_GAIN, DEFAULT_OFFSET};
    use crate::channel::error::DecodeError;
    use crate::channel::reader::ByteOrder;
    use crate::channel::types::ChannelType;

    fn channel(channel_type: ChannelType, byte_offset: usize) -> ChannelDescriptor {
        ChannelDescriptor {
            name: "ch".to_string(),
            channel_type,
            byte_offset,
            gain: DEFAULT_GAIN,
            offset: DEFAULT_OFFSET,
            index: 0,
        }
    }

    #[test]
    fn zero_bytes_decode_to_zero() {
        let record = [0u8; 8];
        for ty in ChannelType::ALL {
            let value = channel(ty, 0).decode(&record, ByteOrder::Native).unwrap();
            assert_eq!(value, 0.0, "{ty}");
        }
    }

    #[test]
    fn gain_and_offset_apply_affine_transform() {
        let mut ch = channel(ChannelType::Float32, 0);
        ch.gain = 2.0;
        ch.offset = 3.0;
        let record = 5.0f32.to_ne_bytes();
        assert_eq!(ch.decode(&record, ByteOrder::Native).unwrap(), 13.0);
        assert_eq!(ch.decode_raw(&record, ByteOrder::Native).unwrap(), 5.0);
    }

    #[test]
    fn int32_is_twos_complement() {
        let mut record = vec![0xffu8; 4];
        record.extend_from_slice(&(-42i32).to_le_bytes());
        let value = channel(ChannelType::Int32, 4)
            .decode(&record, ByteOrder::Little)
            .unwrap();
        assert_eq!(value, -42.0);
    }

    #[test]
    fn uint32_keeps_high_bit() {
        let record = u32::MAX.to_be_bytes();
        let value = channel(ChannelType::Uint32, 0)
            .decode(&record, ByteOrder::Big)
            .unwrap();
        assert_eq!(value, f64::from(u32::MAX));
    }

    #[test]
    fn float64_reads_full_width() {
        let record = std::f64::consts::PI.to_ne_bytes();
        let value = channel(ChannelType::Float64, 0)
            .decode(&record, ByteOrder::Native)
            .unwrap();
        assert_eq!(value, std::f64::consts::PI);
    }

    #[test]
    fn short_record_is_reported() {
        let record = [0u8; 5];
        let err = channel(ChannelType::Float32, 2)
            .decode(&record, ByteOrder::Native)
            .unwrap_err();
        assert_eq!(err, DecodeError::TooShort { needed: 6, actual: 5 });
    }
}
