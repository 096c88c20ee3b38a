use std::io::{self, Read};

use thiserror::Error;

use crate::channel::DecodeError;
use crate::layout::{ConfigError, RecordLayout};

/// Lifecycle of a [`RecordDecoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Buffer allocated, nothing read yet.
    Ready,
    /// A whole record is available at the cursor.
    Streaming,
    /// A refill failed with an I/O error. No record is available; the next
    /// advance resumes the refill with the bytes already read.
    Interrupted,
    /// A refill produced no whole record. Terminal.
    Exhausted,
}

/// Outcome of [`RecordDecoder::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Record,
    EndOfStream,
}

#[derive(Debug, Error)]
pub enum DecoderError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("no current record (decoder is {state:?})")]
    NoRecord { state: DecoderState },
}

/// Buffered decoder turning a byte source into fixed-width records.
///
/// The buffer holds `batch_size` whole records. The cursor starts past the
/// end so the first [`advance`](Self::advance) triggers a refill. A refill
/// reads until the buffer is full or the source hits EOF; a refill that does
/// not yield one whole record ends the stream, so a trailing fragment is never
/// decoded.
///
/// An I/O error during a refill leaves no current record. Bytes read before
/// the error stay in the buffer and the next `advance` continues the same
/// refill, so records are never repeated or skipped.
///
/// # Examples
/// ```
/// use std::io::Cursor;
///
/// use replayamp_core::{Advance, LayoutConfig, RecordDecoder, RecordLayout};
///
/// let layout = RecordLayout::build("mem", &LayoutConfig::from_joined("x", "int32", "", ""))?;
/// let bytes: Vec<u8> = [1i32, 2, 3].iter().flat_map(|v| v.to_ne_bytes()).collect();
/// let mut decoder = RecordDecoder::new(Cursor::new(bytes), layout, 2)?;
///
/// let mut seen = Vec::new();
/// while decoder.advance()? == Advance::Record {
///     seen.push(decoder.values()?[0]);
/// }
/// assert_eq!(seen, vec![1.0, 2.0, 3.0]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct RecordDecoder<R> {
    source: R,
    layout: RecordLayout,
    batch_size: usize,
    buffer: Vec<u8>,
    cursor: usize,
    valid_bytes: usize,
    pending: usize,
    state: DecoderState,
    records_read: u64,
}

impl<R: Read> RecordDecoder<R> {
    /// Allocate the batch buffer for `layout`.
    ///
    /// # Errors
    /// Returns `ConfigError` for a zero batch size or a buffer that cannot be
    /// allocated.
    pub fn new(source: R, layout: RecordLayout, batch_size: usize) -> Result<Self, ConfigError> {
        if batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        let too_large = || ConfigError::BatchTooLarge {
            batch_size,
            record_len: layout.record_len(),
        };
        let capacity = batch_size
            .checked_mul(layout.record_len())
            .ok_or_else(too_large)?;
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(capacity).map_err(|_| too_large())?;
        buffer.resize(capacity, 0u8);
        Ok(Self {
            source,
            layout,
            batch_size,
            buffer,
            cursor: batch_size,
            valid_bytes: 0,
            pending: 0,
            state: DecoderState::Ready,
            records_read: 0,
        })
    }

    /// Move to the next record, refilling the buffer when needed.
    ///
    /// Once the stream is exhausted this keeps returning
    /// `Advance::EndOfStream` without reading from the source again.
    pub fn advance(&mut self) -> Result<Advance, DecoderError> {
        if self.state == DecoderState::Exhausted {
            return Ok(Advance::EndOfStream);
        }
        self.cursor += 1;
        if !self.record_available() {
            self.refill()?;
            if self.state == DecoderState::Exhausted {
                return Ok(Advance::EndOfStream);
            }
        }
        self.state = DecoderState::Streaming;
        self.records_read += 1;
        Ok(Advance::Record)
    }

    /// Bytes of the current record.
    pub fn record(&self) -> Result<&[u8], DecoderError> {
        if self.state != DecoderState::Streaming {
            return Err(DecoderError::NoRecord { state: self.state });
        }
        let start = self.cursor * self.layout.record_len();
        self.buffer
            .get(start..start + self.layout.record_len())
            .ok_or(DecoderError::NoRecord { state: self.state })
    }

    /// Decode every channel of the current record into `out`.
    pub fn decode_into(&self, out: &mut Vec<f64>) -> Result<(), DecoderError> {
        let record = self.record()?;
        self.layout.decode_record(record, out)?;
        Ok(())
    }

    pub fn values(&self) -> Result<Vec<f64>, DecoderError> {
        let mut out = Vec::with_capacity(self.layout.physical_channel_count());
        self.decode_into(&mut out)?;
        Ok(out)
    }

    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == DecoderState::Exhausted
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of records handed out so far.
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    fn record_available(&self) -> bool {
        (self.cursor + 1) * self.layout.record_len() <= self.valid_bytes
    }

    fn refill(&mut self) -> io::Result<()> {
        self.cursor = 0;
        self.valid_bytes = 0;
        let mut filled = std::mem::take(&mut self.pending);
        if let Err(err) = fill_buffer(&mut self.source, &mut self.buffer, &mut filled) {
            tracing::warn!(
                source = self.layout.source_name(),
                buffered = filled,
                error = %err,
                "refill interrupted"
            );
            self.pending = filled;
            self.state = DecoderState::Interrupted;
            return Err(err);
        }
        self.valid_bytes = filled;
        if self.record_available() {
            tracing::debug!(
                source = self.layout.source_name(),
                bytes = self.valid_bytes,
                records = self.valid_bytes / self.layout.record_len(),
                "buffer refilled"
            );
            return Ok(());
        }
        if self.valid_bytes > 0 {
            tracing::warn!(
                source = self.layout.source_name(),
                trailing_bytes = self.valid_bytes,
                record_len = self.layout.record_len(),
                "discarding trailing partial record"
            );
        }
        tracing::info!(
            source = self.layout.source_name(),
            records = self.records_read,
            "end of stream"
        );
        self.state = DecoderState::Exhausted;
        Ok(())
    }
}

/// Read into `buffer[*filled..]` until it is full or `source` reports EOF.
///
/// `filled` tracks progress and stays accurate when an error is returned.
/// Interrupted reads are retried; any other error is returned as-is.
pub fn fill_buffer<R: Read>(
    source: &mut R,
    buffer: &mut [u8],
    filled: &mut usize,
) -> io::Result<()> {
    while *filled < buffer.len() {
        match source.read(&mut buffer[*filled..]) {
            Ok(0) => break,
            Ok(n) => *filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor, Read};

    use super::{Advance, DecoderError, DecoderState, RecordDecoder, fill_buffer};
    use crate::layout::{ConfigError, LayoutConfig, RecordLayout};

    fn layout(names: &str, types: &str) -> RecordLayout {
        RecordLayout::build("test", &LayoutConfig::from_joined(names, types, "", "")).unwrap()
    }

    fn u32_records(values: &[u32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_ne_bytes()).collect()
    }

    fn drain<R: Read>(decoder: &mut RecordDecoder<R>) -> Vec<Vec<f64>> {
        let mut out = Vec::new();
        while decoder.advance().unwrap() == Advance::Record {
            out.push(decoder.values().unwrap());
        }
        out
    }

    /// Hands out at most `chunk` bytes per read call.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
        reads: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads += 1;
            let n = buf.len().min(self.chunk).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn zero_batch_is_rejected() {
        let err = RecordDecoder::new(Cursor::new(Vec::new()), layout("a", "float"), 0)
            .err()
            .unwrap();
        assert_eq!(err, ConfigError::ZeroBatchSize);
    }

    #[test]
    fn starts_ready_without_record() {
        let decoder = RecordDecoder::new(Cursor::new(Vec::new()), layout("a", "float"), 4).unwrap();
        assert_eq!(decoder.state(), DecoderState::Ready);
        assert!(matches!(
            decoder.record(),
            Err(DecoderError::NoRecord {
                state: DecoderState::Ready
            })
        ));
    }

    #[test]
    fn exact_multiple_yields_every_record() {
        let bytes = u32_records(&[1, 2, 3, 4, 5, 6]);
        let mut decoder = RecordDecoder::new(Cursor::new(bytes), layout("a", "uint32"), 3).unwrap();
        let values = drain(&mut decoder);
        assert_eq!(values.len(), 6);
        assert_eq!(values[5], vec![6.0]);
        assert_eq!(decoder.records_read(), 6);
        assert!(decoder.is_exhausted());
    }

    #[test]
    fn partial_last_batch_is_decoded() {
        let bytes = u32_records(&[10, 20, 30, 40, 50]);
        let mut decoder = RecordDecoder::new(Cursor::new(bytes), layout("a", "uint32"), 4).unwrap();
        let values: Vec<f64> = drain(&mut decoder).into_iter().map(|v| v[0]).collect();
        assert_eq!(values, vec![10.0, 20.0, 30.0, 40.0, 50.0]);
    }

    #[test]
    fn trailing_fragment_is_never_decoded() {
        let mut bytes = u32_records(&[1, 2]);
        bytes.extend_from_slice(&[0xaa, 0xbb]);
        let mut decoder =
            RecordDecoder::new(Cursor::new(bytes), layout("a;b", "uint32;uint32"), 8).unwrap();
        let values = drain(&mut decoder);
        assert_eq!(values, vec![vec![1.0, 2.0]]);
    }

    #[test]
    fn fragment_alone_in_refill_ends_stream() {
        let mut bytes = u32_records(&[7, 8]);
        bytes.push(0xff);
        let mut decoder = RecordDecoder::new(Cursor::new(bytes), layout("a", "uint32"), 2).unwrap();
        let values = drain(&mut decoder);
        assert_eq!(values, vec![vec![7.0], vec![8.0]]);
        assert!(decoder.is_exhausted());
    }

    #[test]
    fn end_of_stream_is_idempotent() {
        let bytes = u32_records(&[1]);
        let mut source = Trickle {
            data: bytes,
            pos: 0,
            chunk: 64,
            reads: 0,
        };
        {
            let mut decoder = RecordDecoder::new(&mut source, layout("a", "uint32"), 1).unwrap();
            assert_eq!(decoder.advance().unwrap(), Advance::Record);
            for _ in 0..5 {
                assert_eq!(decoder.advance().unwrap(), Advance::EndOfStream);
                assert!(decoder.record().is_err());
            }
        }
        // one read for the record, one read that hit EOF
        assert_eq!(source.reads, 2);
    }

    #[test]
    fn empty_source_ends_immediately() {
        let mut decoder =
            RecordDecoder::new(Cursor::new(Vec::new()), layout("a", "double"), 16).unwrap();
        assert_eq!(decoder.advance().unwrap(), Advance::EndOfStream);
        assert_eq!(decoder.records_read(), 0);
    }

    #[test]
    fn short_reads_are_accumulated_into_whole_records() {
        let bytes = u32_records(&[1, 2, 3]);
        let source = Trickle {
            data: bytes,
            pos: 0,
            chunk: 3,
            reads: 0,
        };
        let mut decoder = RecordDecoder::new(source, layout("a", "uint32"), 2).unwrap();
        let values: Vec<f64> = drain(&mut decoder).into_iter().map(|v| v[0]).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn mixed_layout_reads_fields_at_offsets() {
        let mut bytes = Vec::new();
        for i in 0..3 {
            bytes.extend_from_slice(&(i as f64 * 0.5).to_ne_bytes());
            bytes.extend_from_slice(&(-(i as i32)).to_ne_bytes());
            bytes.extend_from_slice(&(i as f32 + 0.25).to_ne_bytes());
        }
        let mut decoder =
            RecordDecoder::new(Cursor::new(bytes), layout("d;i;f", "double;int32;float"), 2)
                .unwrap();
        let values = drain(&mut decoder);
        assert_eq!(values[0], vec![0.0, 0.0, 0.25]);
        assert_eq!(values[2], vec![1.0, -2.0, 2.25]);
    }

    #[test]
    fn fill_buffer_stops_at_eof() {
        let mut source = Cursor::new(vec![1u8, 2, 3]);
        let mut buffer = [0u8; 8];
        let mut filled = 0;
        fill_buffer(&mut source, &mut buffer, &mut filled).unwrap();
        assert_eq!(filled, 3);
        fill_buffer(&mut source, &mut buffer, &mut filled).unwrap();
        assert_eq!(filled, 3);
    }

    /// Like `Trickle`, but fails once when the read position reaches `fail_at`.
    struct Flaky {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
        fail_at: Option<usize>,
    }

    impl Read for Flaky {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.fail_at == Some(self.pos) {
                self.fail_at = None;
                return Err(io::Error::other("transient"));
            }
            let n = buf.len().min(self.chunk).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn failed_refill_resumes_without_repeating_records() {
        let source = Flaky {
            data: u32_records(&[1, 2, 3, 4, 5, 6]),
            pos: 0,
            chunk: 5,
            // second refill fails after one short read
            fail_at: Some(17),
        };
        let mut decoder = RecordDecoder::new(source, layout("a", "uint32"), 3).unwrap();
        let mut seen = Vec::new();
        let mut failures = 0;
        loop {
            match decoder.advance() {
                Ok(Advance::Record) => seen.push(decoder.values().unwrap()[0]),
                Ok(Advance::EndOfStream) => break,
                Err(DecoderError::Io(_)) => {
                    failures += 1;
                    assert_eq!(decoder.state(), DecoderState::Interrupted);
                    assert!(matches!(
                        decoder.record(),
                        Err(DecoderError::NoRecord {
                            state: DecoderState::Interrupted
                        })
                    ));
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(failures, 1);
        assert_eq!(seen, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(decoder.records_read(), 6);
    }

    #[test]
    fn failure_at_batch_boundary_refills_again() {
        let source = Flaky {
            data: u32_records(&[1, 2, 3, 4, 5, 6]),
            pos: 0,
            chunk: 64,
            fail_at: Some(12),
        };
        let mut decoder = RecordDecoder::new(source, layout("a", "uint32"), 3).unwrap();
        let mut seen = Vec::new();
        for _ in 0..3 {
            assert_eq!(decoder.advance().unwrap(), Advance::Record);
            seen.push(decoder.values().unwrap()[0]);
        }
        assert!(matches!(decoder.advance(), Err(DecoderError::Io(_))));
        assert!(decoder.values().is_err());
        seen.extend(drain(&mut decoder).into_iter().map(|v| v[0]));
        assert_eq!(seen, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn unallocatable_batch_is_rejected() {
        let err = RecordDecoder::new(io::empty(), layout("a", "double"), 1 << 60)
            .err()
            .unwrap();
        assert_eq!(
            err,
            ConfigError::BatchTooLarge {
                batch_size: 1 << 60,
                record_len: 8
            }
        );
    }
}
