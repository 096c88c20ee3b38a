use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::layout::{ConfigError, LayoutConfig, RecordLayout};
use crate::{ChannelSummary, LayoutSummary, SUMMARY_VERSION};

use super::decoder::{Advance, RecordDecoder};
use super::{Sample, SampleSource, SourceError};

pub const DEFAULT_SAMPLING_RATE: f64 = 128.0;

type StopCallback = Box<dyn FnOnce() + Send>;

/// Acquisition settings that are not part of the record layout.
#[derive(Debug, Clone, PartialEq)]
pub struct AmplifierOptions {
    /// Samples per second, used for timestamps and the default batch size.
    pub sampling_rate: f64,
    /// Records per refill; defaults to one second of data.
    pub batch_size: Option<usize>,
    /// Channel names to emit, in order. Empty means every channel.
    pub active_channels: Vec<String>,
    /// Timestamp of the first sample, in seconds.
    pub start_time: f64,
    /// Skip the gain/offset transform.
    pub raw: bool,
}

impl Default for AmplifierOptions {
    fn default() -> Self {
        Self {
            sampling_rate: DEFAULT_SAMPLING_RATE,
            batch_size: None,
            active_channels: Vec::new(),
            start_time: 0.0,
            raw: false,
        }
    }
}

impl AmplifierOptions {
    fn resolved_batch_size(&self) -> usize {
        self.batch_size
            .unwrap_or_else(|| (self.sampling_rate as usize).max(1))
    }
}

/// Amplifier that replays a recorded file through [`SampleSource`].
///
/// # Examples
/// ```no_run
/// use std::path::Path;
///
/// use replayamp_core::{AmplifierOptions, FileAmplifier, LayoutConfig, SampleSource};
///
/// let config = LayoutConfig::from_joined("Fp1;Fp2", "float;float", "", "");
/// let mut amp = FileAmplifier::open(Path::new("rec.obci.raw"), &config, AmplifierOptions::default())?;
/// amp.on_stop(|| eprintln!("recording finished"));
/// while let Some(sample) = amp.next_sample()? {
///     println!("{} {:?}", sample.timestamp, sample.values);
/// }
/// # Ok::<(), replayamp_core::SourceError>(())
/// ```
pub struct FileAmplifier<R = File> {
    decoder: RecordDecoder<R>,
    active: Vec<usize>,
    options: AmplifierOptions,
    on_stop: Option<StopCallback>,
    stopped: bool,
}

impl FileAmplifier<File> {
    /// Open `path` and build the layout described by `config`.
    ///
    /// # Errors
    /// Returns `SourceError::DeviceOpen` when the file cannot be opened and
    /// `SourceError::Config` for an invalid layout or options.
    pub fn open(
        path: &Path,
        config: &LayoutConfig,
        options: AmplifierOptions,
    ) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(|source| SourceError::DeviceOpen {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "opened recording");
        Self::from_reader(&path.display().to_string(), file, config, options)
    }
}

impl<R: Read> FileAmplifier<R> {
    pub fn from_reader(
        source_name: &str,
        reader: R,
        config: &LayoutConfig,
        options: AmplifierOptions,
    ) -> Result<Self, SourceError> {
        if !options.sampling_rate.is_finite() || options.sampling_rate <= 0.0 {
            return Err(ConfigError::InvalidSamplingRate {
                rate: options.sampling_rate.to_string(),
            }
            .into());
        }
        let layout = RecordLayout::build(source_name, config)?;
        let active = layout.resolve_channels(&options.active_channels)?;
        let decoder = RecordDecoder::new(reader, layout, options.resolved_batch_size())?;
        Ok(Self {
            decoder,
            active,
            options,
            on_stop: None,
            stopped: false,
        })
    }

    /// Register the callback fired once when the recording runs out.
    pub fn on_stop<F>(&mut self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_stop = Some(Box::new(callback));
    }

    pub fn layout(&self) -> &RecordLayout {
        self.decoder.layout()
    }

    /// Layout indices of the emitted channels.
    pub fn active_channels(&self) -> &[usize] {
        &self.active
    }

    pub fn options(&self) -> &AmplifierOptions {
        &self.options
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn describe(&self) -> LayoutSummary {
        let layout = self.decoder.layout();
        LayoutSummary {
            summary_version: SUMMARY_VERSION,
            source: layout.source_name().to_string(),
            record_len: layout.record_len(),
            physical_channels: layout.physical_channel_count(),
            byte_order: layout.byte_order(),
            sampling_rate: self.options.sampling_rate,
            batch_size: self.decoder.batch_size(),
            channels: layout
                .channels()
                .iter()
                .map(|channel| ChannelSummary {
                    name: channel.name.clone(),
                    channel_type: channel.channel_type,
                    byte_offset: channel.byte_offset,
                    width: channel.width(),
                    signed: channel.is_signed(),
                    gain: channel.gain,
                    offset: channel.offset,
                    active: self.active.contains(&channel.index),
                })
                .collect(),
        }
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        tracing::info!(
            source = self.decoder.layout().source_name(),
            samples = self.decoder.records_read(),
            "stopping acquisition"
        );
        if let Some(callback) = self.on_stop.take() {
            callback();
        }
    }
}

impl<R: Read> SampleSource for FileAmplifier<R> {
    fn next_sample(&mut self) -> Result<Option<Sample>, SourceError> {
        if self.decoder.advance()? == Advance::EndOfStream {
            self.stop();
            return Ok(None);
        }

        let record = self.decoder.record()?;
        let layout = self.decoder.layout();
        let order = layout.byte_order();
        let mut values = Vec::with_capacity(self.active.len());
        for &index in &self.active {
            let channel = &layout.channels()[index];
            let value = if self.options.raw {
                channel.decode_raw(record, order)?
            } else {
                channel.decode(record, order)?
            };
            values.push(value);
        }

        let index = self.decoder.records_read() - 1;
        Ok(Some(Sample {
            index,
            timestamp: self.options.start_time + index as f64 / self.options.sampling_rate,
            values,
        }))
    }
}
