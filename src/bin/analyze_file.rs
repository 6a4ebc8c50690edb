//! Estimate the tempo of one or more audio files
//!
//! Usage:
//!   analyze_file [OPTIONS] <PATH>...
//!
//! Notes:
//! - Parallelism is across files (`--jobs`); `--parallel-hops` also spreads
//!   the hop lengths of each file over the pool.
//! - Exit code 2 on configuration errors, 1 if any file failed to load.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rayon::prelude::*;
use stratum_tempo::{
    analyze_file, AggregateMode, AnalysisError, ChannelMixMode, TempoConfig, TempoReport,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Estimate the tempo (BPM) of audio files", long_about = None)]
struct Cli {
    /// Audio files to analyze
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Resample to this rate before analysis (default: native rate)
    #[arg(long, value_name = "HZ")]
    sr: Option<u32>,

    /// Hop length in samples; repeat to set the priority order
    #[arg(long = "hop", value_name = "H")]
    hops: Vec<usize>,

    /// Number of tempo candidates
    #[arg(long, default_value_t = 5)]
    candidates: usize,

    /// Candidate aggregation: median, mean or none
    #[arg(long, default_value = "median")]
    aggregate: String,

    /// Seconds to skip at the start
    #[arg(long, default_value_t = 0.0)]
    offset: f32,

    /// Maximum seconds to analyze
    #[arg(long)]
    duration: Option<f32>,

    /// Lower bound of the preferred tempo range
    #[arg(long, value_name = "BPM", requires = "prefer_max")]
    prefer_min: Option<f32>,

    /// Upper bound of the preferred tempo range
    #[arg(long, value_name = "BPM", requires = "prefer_min")]
    prefer_max: Option<f32>,

    /// Disable octave normalization into the preferred range
    #[arg(long)]
    no_normalize: bool,

    /// Keep the first channel instead of averaging all channels
    #[arg(long, conflicts_with = "mix")]
    stereo: bool,

    /// Channel reduction: mono (average), first or dominant (loudest channel)
    #[arg(long, value_name = "MODE")]
    mix: Option<String>,

    /// Trim leading and trailing silence
    #[arg(long)]
    trim_silence: bool,

    /// Skip harmonic-percussive separation
    #[arg(long)]
    no_percussive: bool,

    /// Evaluate hop lengths in parallel
    #[arg(long)]
    parallel_hops: bool,

    /// Parallel workers (default: CPU-1)
    #[arg(long)]
    jobs: Option<usize>,

    /// Emit one JSON object per line instead of text reports
    #[arg(long)]
    json: bool,
}

fn default_jobs() -> usize {
    let n = std::thread::available_parallelism().map(|v| v.get()).unwrap_or(1);
    std::cmp::max(1, n.saturating_sub(1))
}

fn build_config(cli: &Cli) -> Result<TempoConfig, AnalysisError> {
    let aggregate: AggregateMode = cli.aggregate.parse()?;

    let mut config = TempoConfig {
        target_sample_rate: cli.sr,
        n_candidates: cli.candidates,
        offset_seconds: cli.offset,
        duration_seconds: cli.duration,
        normalize_octave: !cli.no_normalize,
        trim_silence: cli.trim_silence,
        percussive: !cli.no_percussive,
        parallel_hops: cli.parallel_hops,
        ..TempoConfig::default()
    }
    .with_mono(!cli.stereo)
    .with_aggregate(aggregate);

    if let Some(mix) = &cli.mix {
        let mode: ChannelMixMode = mix.parse()?;
        config = config.with_channel_mix(mode);
    }

    if !cli.hops.is_empty() {
        config = config.with_hop_lengths(&cli.hops);
    }
    if let (Some(min), Some(max)) = (cli.prefer_min, cli.prefer_max) {
        config = config.with_preferred_range(min, max);
    }

    config.validate()?;
    Ok(config)
}

fn print_report(report: &TempoReport, json: bool) {
    if json {
        match serde_json::to_string(report) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!(
                "[stratum-tempo] ERROR: cannot serialize report for {}: {}",
                report.path.display(),
                e
            ),
        }
    } else {
        println!("{}", report);
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[stratum-tempo] ERROR: {}", e);
            return ExitCode::from(2);
        }
    };

    let jobs = cli.jobs.map(|j| j.max(1)).unwrap_or_else(default_jobs);
    log::debug!("Analyzing {} file(s), jobs={}", cli.paths.len(), jobs);

    let pool = match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("[stratum-tempo] ERROR: cannot start worker pool: {}", e);
            return ExitCode::from(1);
        }
    };

    let results: Vec<Result<TempoReport, AnalysisError>> = pool.install(|| {
        cli.paths
            .par_iter()
            .map(|path| analyze_file(path, &config))
            .collect()
    });

    let mut exit = ExitCode::SUCCESS;
    for (path, result) in cli.paths.iter().zip(results) {
        match result {
            Ok(report) => print_report(&report, cli.json),
            Err(e @ AnalysisError::ConfigurationError(_)) => {
                eprintln!("[stratum-tempo] ERROR: {}: {}", path.display(), e);
                return ExitCode::from(2);
            }
            Err(e) => {
                eprintln!("[stratum-tempo] ERROR: {}: {}", path.display(), e);
                exit = ExitCode::from(1);
            }
        }
    }

    exit
}
