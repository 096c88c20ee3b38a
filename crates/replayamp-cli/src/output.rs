use std::borrow::Cow;
use std::io::{self, Write};

use clap::ValueEnum;
use replayamp_core::Sample;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Comma-separated values with a header row
    #[default]
    Csv,
    /// One JSON object per sample
    Jsonl,
}

#[derive(Serialize)]
struct SampleLine<'a> {
    index: u64,
    timestamp: f64,
    values: &'a [f64],
}

/// Writes decoded samples in the selected format.
pub struct SampleWriter<W: Write> {
    out: W,
    format: OutputFormat,
    channels: Vec<String>,
    header_written: bool,
}

impl<W: Write> SampleWriter<W> {
    pub fn new(out: W, format: OutputFormat, channels: Vec<String>) -> Self {
        Self {
            out,
            format,
            channels,
            header_written: false,
        }
    }

    pub fn write_sample(&mut self, sample: &Sample) -> io::Result<()> {
        match self.format {
            OutputFormat::Csv => {
                if !self.header_written {
                    self.write_csv_header()?;
                }
                write!(self.out, "{},{}", sample.index, sample.timestamp)?;
                for value in &sample.values {
                    write!(self.out, ",{value}")?;
                }
                writeln!(self.out)
            }
            OutputFormat::Jsonl => {
                let line = SampleLine {
                    index: sample.index,
                    timestamp: sample.timestamp,
                    values: &sample.values,
                };
                serde_json::to_writer(&mut self.out, &line)?;
                writeln!(self.out)
            }
        }
    }

    /// Flush, emitting the CSV header even when no sample was written.
    pub fn finish(mut self) -> io::Result<()> {
        if self.format == OutputFormat::Csv && !self.header_written {
            self.write_csv_header()?;
        }
        self.out.flush()
    }

    fn write_csv_header(&mut self) -> io::Result<()> {
        self.header_written = true;
        write!(self.out, "index,timestamp")?;
        for name in &self.channels {
            write!(self.out, ",{}", csv_field(name))?;
        }
        writeln!(self.out)
    }
}

/// Quote a header field when it contains a separator, quote or line break.
fn csv_field(name: &str) -> Cow<'_, str> {
    if name.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", name.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(name)
    }
}

#[cfg(test)]
mod tests {
    use super::{OutputFormat, SampleWriter};
    use replayamp_core::Sample;

    fn sample(index: u64) -> Sample {
        Sample {
            index,
            timestamp: index as f64 * 0.5,
            values: vec![1.5, -2.0],
        }
    }

    #[test]
    fn csv_has_header_then_rows() {
        let mut buf = Vec::new();
        let mut writer = SampleWriter::new(
            &mut buf,
            OutputFormat::Csv,
            vec!["a".to_string(), "b".to_string()],
        );
        writer.write_sample(&sample(0)).unwrap();
        writer.write_sample(&sample(1)).unwrap();
        writer.finish().unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "index,timestamp,a,b\n0,0,1.5,-2\n1,0.5,1.5,-2\n");
    }

    #[test]
    fn csv_header_written_for_empty_stream() {
        let mut buf = Vec::new();
        let writer = SampleWriter::new(&mut buf, OutputFormat::Csv, vec!["a".to_string()]);
        writer.finish().unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "index,timestamp,a\n");
    }

    #[test]
    fn csv_header_quotes_awkward_names() {
        let mut buf = Vec::new();
        let writer = SampleWriter::new(
            &mut buf,
            OutputFormat::Csv,
            vec!["Fp1,ref".to_string(), "say \"hi\"".to_string(), "C3".to_string()],
        );
        writer.finish().unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "index,timestamp,\"Fp1,ref\",\"say \"\"hi\"\"\",C3\n"
        );
    }

    #[test]
    fn jsonl_is_one_object_per_line() {
        let mut buf = Vec::new();
        let mut writer = SampleWriter::new(&mut buf, OutputFormat::Jsonl, Vec::new());
        writer.write_sample(&sample(2)).unwrap();
        writer.finish().unwrap();
        let text = String::from_utf8(buf).unwrap();
        let value: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(value["index"], 2);
        assert_eq!(value["values"][1], -2.0);
    }
}
