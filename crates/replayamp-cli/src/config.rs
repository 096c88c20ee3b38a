use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use replayamp_core::{
    AmplifierOptions, ByteOrder, DEFAULT_SAMPLING_RATE, LayoutConfig, TypePolicy, split_list,
};
use serde::Deserialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::CliError;

/// Options describing the recording and how to read it.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Path to a file with sample data (glob patterns must match one file)
    #[arg(short = 'f', long)]
    pub file: Option<PathBuf>,

    /// Names of channels in the file separated by semicolons
    #[arg(short = 'n', long)]
    pub names: Option<String>,

    /// Channel types separated by semicolons. Available values: double,float,int32,uint32
    #[arg(short = 't', long)]
    pub types: Option<String>,

    /// Gains for all channels separated by semicolons (empty: 1.0 for every channel)
    #[arg(short = 'g', long)]
    pub gains: Option<String>,

    /// Offsets for all channels separated by semicolons (empty: 0.0 for every channel)
    #[arg(long)]
    pub offsets: Option<String>,

    /// Sampling rate in Hz
    #[arg(short = 's', long)]
    pub sampling_rate: Option<f64>,

    /// Records read per refill (default: one second of data)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Byte order of the recording: native, little or big
    #[arg(long)]
    pub byte_order: Option<ByteOrder>,

    /// Decode unknown channel types as float instead of failing
    #[arg(long)]
    pub lenient_types: bool,

    /// Channels to emit, separated by semicolons (default: all)
    #[arg(long)]
    pub active_channels: Option<String>,

    /// RFC 3339 timestamp of the first sample (default: 0 seconds)
    #[arg(long)]
    pub start_time: Option<String>,

    /// JSON file with default values for the options above
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// JSON configuration file; command-line values take precedence.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplayConfig {
    pub file: Option<PathBuf>,
    pub names: Option<Vec<String>>,
    pub types: Option<Vec<String>>,
    pub gains: Option<Vec<f64>>,
    pub offsets: Option<Vec<f64>>,
    pub sampling_rate: Option<f64>,
    pub batch_size: Option<usize>,
    pub byte_order: Option<ByteOrder>,
    pub type_policy: Option<TypePolicy>,
    pub active_channels: Option<Vec<String>>,
    pub start_time: Option<String>,
}

impl ReplayConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

/// Fully merged settings for one run.
#[derive(Debug)]
pub struct ResolvedSource {
    pub file: PathBuf,
    pub layout: LayoutConfig,
    pub options: AmplifierOptions,
}

pub fn resolve_source(args: &SourceArgs) -> Result<ResolvedSource, CliError> {
    let file_config = match &args.config {
        Some(path) => ReplayConfig::load(path)?,
        None => ReplayConfig::default(),
    };
    merge(args, file_config)
}

fn merge(args: &SourceArgs, config: ReplayConfig) -> Result<ResolvedSource, CliError> {
    let file = args.file.clone().or(config.file).ok_or_else(|| {
        CliError::new(
            "missing input file",
            Some("use -f/--file or set \"file\" in the config file".to_string()),
        )
    })?;

    let names = pick_list(args.names.as_deref(), config.names);
    let types = pick_list(args.types.as_deref(), config.types);
    if names.is_empty() || types.is_empty() {
        return Err(CliError::new(
            "missing channel names or types",
            Some("use -n/--names and -t/--types (semicolon separated)".to_string()),
        ));
    }
    let gains = pick_list(args.gains.as_deref(), config.gains.map(numbers_to_strings));
    let offsets = pick_list(
        args.offsets.as_deref(),
        config.offsets.map(numbers_to_strings),
    );

    let type_policy = if args.lenient_types {
        TypePolicy::Lenient
    } else {
        config.type_policy.unwrap_or_default()
    };
    let layout = LayoutConfig {
        names,
        types,
        gains,
        offsets,
        byte_order: args.byte_order.or(config.byte_order).unwrap_or_default(),
        type_policy,
    };

    let start_time = match args.start_time.as_deref().or(config.start_time.as_deref()) {
        Some(text) => parse_start_time(text)?,
        None => 0.0,
    };
    let options = AmplifierOptions {
        sampling_rate: args
            .sampling_rate
            .or(config.sampling_rate)
            .unwrap_or(DEFAULT_SAMPLING_RATE),
        batch_size: args.batch_size.or(config.batch_size),
        active_channels: pick_list(args.active_channels.as_deref(), config.active_channels),
        start_time,
        raw: false,
    };

    Ok(ResolvedSource {
        file,
        layout,
        options,
    })
}

fn pick_list(cli: Option<&str>, file: Option<Vec<String>>) -> Vec<String> {
    match cli {
        Some(joined) => split_list(joined),
        None => file.unwrap_or_default(),
    }
}

fn numbers_to_strings(values: Vec<f64>) -> Vec<String> {
    values.iter().map(f64::to_string).collect()
}

/// Parse an RFC 3339 timestamp into Unix seconds.
pub fn parse_start_time(text: &str) -> Result<f64, CliError> {
    let parsed = OffsetDateTime::parse(text, &Rfc3339).map_err(|err| {
        CliError::new(
            format!("invalid start time '{text}'"),
            Some(format!("expected RFC 3339, e.g. 2024-01-31T12:00:00Z ({err})")),
        )
    })?;
    Ok(parsed.unix_timestamp_nanos() as f64 / 1e9)
}
