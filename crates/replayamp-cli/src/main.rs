use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use glob::glob;
use replayamp_core::{FileAmplifier, Sample, SampleSource, SourceError, spawn_source};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod output;

use config::{SourceArgs, resolve_source};
use output::{OutputFormat, SampleWriter};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (commit ",
    env!("REPLAYAMP_BUILD_COMMIT"),
    ", ",
    env!("REPLAYAMP_BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "replayamp")]
#[command(version, long_version = LONG_VERSION)]
#[command(
    about = "Replay recorded multi-channel amplifier data as a live sample source.",
    long_about = None,
    after_help = "Examples:\n  replayamp describe -f rec.raw -n 'C3;C4' -t 'float;float'\n  replayamp replay -f rec.raw -n 'C3;C4;trig' -t 'float;float;uint32' -g '0.1;0.1;1' -s 256\n  replayamp replay --config session.json --format jsonl -o samples.jsonl"
)]
struct Cli {
    /// Log progress to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the record layout of a recording as JSON.
    Describe {
        #[command(flatten)]
        source: SourceArgs,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Decode a recording and write its samples.
    Replay {
        #[command(flatten)]
        source: SourceArgs,

        /// Output path (default: stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,

        /// Stop after this many samples
        #[arg(long)]
        max_samples: Option<u64>,

        /// Pace samples at the sampling rate, like a live amplifier
        #[arg(long)]
        realtime: bool,

        /// Emit values without applying gains and offsets
        #[arg(long)]
        raw: bool,

        /// Read the recording on a background thread
        #[arg(long)]
        threaded: bool,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Describe { source, pretty } => cmd_describe(source, pretty),
        Commands::Replay {
            source,
            output,
            format,
            max_samples,
            realtime,
            raw,
            threaded,
            quiet,
        } => cmd_replay(
            source,
            ReplaySettings {
                output,
                format,
                max_samples,
                realtime,
                raw,
                threaded,
                quiet,
            },
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

#[derive(Debug)]
pub(crate) struct CliError {
    pub(crate) message: String,
    pub(crate) hint: Option<String>,
}

impl CliError {
    pub(crate) fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

impl From<SourceError> for CliError {
    fn from(err: SourceError) -> Self {
        let hint = match &err {
            SourceError::DeviceOpen { .. } => Some("check the -f/--file path".to_string()),
            SourceError::Config(_) => Some(
                "check --names, --types, --gains, --offsets and --active-channels".to_string(),
            ),
            _ => None,
        };
        CliError::new(err.to_string(), hint)
    }
}

#[derive(Debug)]
struct ReplaySettings {
    output: Option<PathBuf>,
    format: OutputFormat,
    max_samples: Option<u64>,
    realtime: bool,
    raw: bool,
    threaded: bool,
    quiet: bool,
}

fn open_amplifier(source: &SourceArgs, raw: bool) -> Result<FileAmplifier, CliError> {
    let mut resolved = resolve_source(source)?;
    let path = resolve_input_path(&resolved.file)?;
    validate_input_file(&path)?;
    resolved.options.raw = raw;
    Ok(FileAmplifier::open(&path, &resolved.layout, resolved.options)?)
}

fn cmd_describe(source: SourceArgs, pretty: bool) -> Result<(), CliError> {
    let amp = open_amplifier(&source, false)?;
    let summary = amp.describe();
    let json = if pretty {
        serde_json::to_string_pretty(&summary)
    } else {
        serde_json::to_string(&summary)
    }
    .context("JSON serialization failed")?;
    println!("{}", json);
    Ok(())
}

fn cmd_replay(source: SourceArgs, settings: ReplaySettings) -> Result<(), CliError> {
    let mut amp = open_amplifier(&source, settings.raw)?;
    let channels: Vec<String> = amp
        .active_channels()
        .iter()
        .map(|&index| amp.layout().channels()[index].name.clone())
        .collect();
    let sampling_rate = amp.options().sampling_rate;
    let capacity = amp.describe().batch_size;

    let stopped = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stopped);
    amp.on_stop(move || {
        flag.store(true, Ordering::SeqCst);
        tracing::info!("recording exhausted, acquisition stopped");
    });

    let out: Box<dyn Write> = match settings.output.as_ref() {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create output directory: {}", parent.display())
                    })?;
                }
            }
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let mut writer = SampleWriter::new(out, settings.format, channels);

    let pacing = settings.realtime.then(|| Pacer::new(sampling_rate));
    let written = if settings.threaded {
        let stream = spawn_source(amp, capacity)?;
        pump(stream, &mut writer, settings.max_samples, pacing)?
    } else {
        let samples = std::iter::from_fn(|| amp.next_sample().transpose());
        pump(samples, &mut writer, settings.max_samples, pacing)?
    };
    writer.finish().context("Failed to write samples")?;

    if !settings.quiet {
        let reason = if stopped.load(Ordering::SeqCst) {
            "end of recording"
        } else {
            "sample limit reached"
        };
        match settings.output.as_ref() {
            Some(path) => eprintln!("OK: {written} samples ({reason}) -> {}", path.display()),
            None => eprintln!("OK: {written} samples ({reason})"),
        }
    }
    Ok(())
}

/// Drive the acquisition loop until the source ends or the limit is hit.
fn pump<I, W>(
    samples: I,
    writer: &mut SampleWriter<W>,
    max_samples: Option<u64>,
    mut pacing: Option<Pacer>,
) -> Result<u64, CliError>
where
    I: Iterator<Item = Result<Sample, SourceError>>,
    W: Write,
{
    let mut samples = samples;
    let mut written = 0u64;
    while max_samples.is_none_or(|max| written < max) {
        let Some(sample) = samples.next() else {
            break;
        };
        let sample = sample?;
        if let Some(pacer) = pacing.as_mut() {
            pacer.wait_for(sample.index);
        }
        writer
            .write_sample(&sample)
            .context("Failed to write samples")?;
        written += 1;
    }
    Ok(written)
}

/// Sleeps so sample `n` is released no earlier than `n / rate` after start.
struct Pacer {
    start: Instant,
    rate: f64,
}

impl Pacer {
    fn new(rate: f64) -> Self {
        Self {
            start: Instant::now(),
            rate,
        }
    }

    fn wait_for(&mut self, index: u64) {
        let remaining = self.remaining(index);
        if !remaining.is_zero() {
            std::thread::sleep(remaining);
        }
    }

    /// Time left until sample `index` is due, saturating at `Duration::MAX`.
    fn remaining(&self, index: u64) -> Duration {
        let offset =
            Duration::try_from_secs_f64(index as f64 / self.rate).unwrap_or(Duration::MAX);
        offset.saturating_sub(self.start.elapsed())
    }
}

/// Missing files are left to `FileAmplifier::open`, which reports them as a
/// device-open error.
fn validate_input_file(input: &Path) -> Result<(), CliError> {
    if input.exists() && !input.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", input.display()),
            Some("point -f/--file at a recorded sample file".to_string()),
        ));
    }
    Ok(())
}

fn resolve_input_path(input: &Path) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.to_path_buf());
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    if matches.is_empty() {
        return Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern".to_string()),
        ));
    }
    if matches.len() > 1 {
        let listed = matches
            .iter()
            .take(3)
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let more = if matches.len() > 3 { ", ..." } else { "" };
        return Err(CliError::new(
            format!(
                "multiple files match pattern '{}' ({} matches); matches: {}{}",
                pattern,
                matches.len(),
                listed,
                more
            ),
            Some("pass a single recording, or run once per file".to_string()),
        ));
    }

    Ok(matches.remove(0))
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}
