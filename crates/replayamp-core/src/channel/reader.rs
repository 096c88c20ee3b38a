use serde::{Deserialize, Serialize};

use super::error::DecodeError;

/// Byte order of the numeric fields in a recording.
///
/// Recordings are raw memory dumps of the acquiring machine, so `Native` is
/// the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    #[default]
    Native,
    Little,
    Big,
}

impl std::str::FromStr for ByteOrder {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "native" => Ok(ByteOrder::Native),
            "little" | "le" => Ok(ByteOrder::Little),
            "big" | "be" => Ok(ByteOrder::Big),
            other => Err(format!(
                "unknown byte order '{other}' (expected native, little or big)"
            )),
        }
    }
}

/// Bounds-checked reads of fixed-width fields from one record.
///
/// # Examples
/// ```
/// use replayamp_core::{ByteOrder, RecordReader};
///
/// let record = [0x00, 0x00, 0x80, 0x3f];
/// let reader = RecordReader::new(&record, ByteOrder::Little);
/// assert_eq!(reader.read_f32(0).unwrap(), 1.0);
/// ```
pub struct RecordReader<'a> {
    record: &'a [u8],
    order: ByteOrder,
}

impl<'a> RecordReader<'a> {
    pub fn new(record: &'a [u8], order: ByteOrder) -> Self {
        Self { record, order }
    }

    pub fn require_len(&self, needed: usize) -> Result<(), DecodeError> {
        if self.record.len() < needed {
            return Err(DecodeError::TooShort {
                needed,
                actual: self.record.len(),
            });
        }
        Ok(())
    }

    pub fn read_array<const N: usize>(&self, offset: usize) -> Result<[u8; N], DecodeError> {
        let needed = offset + N;
        let bytes = self
            .record
            .get(offset..needed)
            .ok_or(DecodeError::TooShort {
                needed,
                actual: self.record.len(),
            })?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_f64(&self, offset: usize) -> Result<f64, DecodeError> {
        let bytes = self.read_array::<8>(offset)?;
        Ok(match self.order {
            ByteOrder::Native => f64::from_ne_bytes(bytes),
            ByteOrder::Little => f64::from_le_bytes(bytes),
            ByteOrder::Big => f64::from_be_bytes(bytes),
        })
    }

    pub fn read_f32(&self, offset: usize) -> Result<f32, DecodeError> {
        let bytes = self.read_array::<4>(offset)?;
        Ok(match self.order {
            ByteOrder::Native => f32::from_ne_bytes(bytes),
            ByteOrder::Little => f32::from_le_bytes(bytes),
            ByteOrder::Big => f32::from_be_bytes(bytes),
        })
    }

    pub fn read_i32(&self, offset: usize) -> Result<i32, DecodeError> {
        let bytes = self.read_array::<4>(offset)?;
        Ok(match self.order {
            ByteOrder::Native => i32::from_ne_bytes(bytes),
            ByteOrder::Little => i32::from_le_bytes(bytes),
            ByteOrder::Big => i32::from_be_bytes(bytes),
        })
    }

    pub fn read_u32(&self, offset: usize) -> Result<u32, DecodeError> {
        let bytes = self.read_array::<4>(offset)?;
        Ok(match self.order {
            ByteOrder::Native => u32::from_ne_bytes(bytes),
            ByteOrder::Little => u32::from_le_bytes(bytes),
            ByteOrder::Big => u32::from_be_bytes(bytes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ByteOrder, RecordReader};
    use crate::channel::error::DecodeError;

    #[test]
    fn reads_respect_byte_order() {
        let record = 0x0102_0304u32.to_be_bytes();
        let big = RecordReader::new(&record, ByteOrder::Big);
        let little = RecordReader::new(&record, ByteOrder::Little);
        assert_eq!(big.read_u32(0).unwrap(), 0x0102_0304);
        assert_eq!(little.read_u32(0).unwrap(), 0x0403_0201);
    }

    #[test]
    fn native_matches_host_encoding() {
        let record = (-7i32).to_ne_bytes();
        let reader = RecordReader::new(&record, ByteOrder::Native);
        assert_eq!(reader.read_i32(0).unwrap(), -7);
    }

    #[test]
    fn read_past_end_is_too_short() {
        let record = [0u8; 6];
        let reader = RecordReader::new(&record, ByteOrder::Native);
        let err = reader.read_f64(0).unwrap_err();
        assert_eq!(err, DecodeError::TooShort { needed: 8, actual: 6 });
        assert!(reader.read_f32(2).is_ok());
        assert!(reader.read_f32(3).is_err());
    }

    #[test]
    fn byte_order_parses_aliases() {
        assert_eq!("LE".parse::<ByteOrder>().unwrap(), ByteOrder::Little);
        assert_eq!("big".parse::<ByteOrder>().unwrap(), ByteOrder::Big);
        assert!("middle".parse::<ByteOrder>().is_err());
    }
}
