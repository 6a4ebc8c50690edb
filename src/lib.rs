//! # Stratum Tempo
//!
//! A tempo (BPM) estimation engine for music files, producing a ranked list of
//! candidate tempos, an aggregate, and a single picked tempo.
//!
//! ## Features
//!
//! - **Percussive isolation**: Median-filter HPSS before onset detection
//! - **Multi-resolution candidates**: Spectral-flux onset envelopes at several hop lengths
//! - **Global tempogram**: Autocorrelation tempogram with a preferred-range prior
//! - **Octave normalization**: Folds half/double-time picks into the preferred range
//!
//! ## Quick Start
//!
//! ```no_run
//! use stratum_tempo::{analyze_file, TempoConfig};
//!
//! let config = TempoConfig::default().with_preferred_range(85.0, 95.0);
//! let report = analyze_file("track.mp3", &config)?;
//!
//! println!("{}", report);
//! println!("Picked: {:.2} BPM", report.analysis.picked_bpm);
//! # Ok::<(), stratum_tempo::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! The analysis pipeline follows this flow:
//!
//! ```text
//! Audio Loader → Percussive Isolator → Onset Envelopes → Candidates
//!              → Global Tempogram → Prior → Octave Normalizer → Report
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod preprocessing;

use std::path::Path;
use std::time::Instant;

// Re-export main types
pub use analysis::result::{TempoAnalysis, TempoReport};
pub use config::{AggregateMode, PreferredRange, TempoConfig};
pub use error::AnalysisError;
pub use io::Waveform;
pub use preprocessing::channel_mixer::ChannelMixMode;

use analysis::aggregate::{finalize_candidates, round2};
use analysis::octave::normalize_octave;
use analysis::prior::{apply_prior, pick_tempo, resolve_metrical_level};
use features::onset::hpss::percussive_component;
use features::onset::spectral_flux::onset_envelope;
use features::period::multi_resolution::generate_candidates;
use features::period::tempogram_autocorr::{
    autocorrelation_tempogram, effective_win_length, strength_profile, ProfileAggregate,
    StrengthProfile,
};

/// Analyze mono samples
///
/// Runs the full pipeline on a caller-supplied buffer. Loader options
/// (offset, duration, resampling, trimming) do not apply here.
///
/// # Arguments
///
/// * `samples` - Mono audio samples, normalized to [-1.0, 1.0]
/// * `sample_rate` - Sample rate in Hz (typically 44100 or 48000)
/// * `config` - Analysis configuration parameters
///
/// # Returns
///
/// `TempoAnalysis` with candidates, aggregate and picked tempo. Silence is not
/// an error: it yields empty candidates and a picked tempo of 0.0.
///
/// # Errors
///
/// * `AnalysisError::ConfigurationError` if `config` is invalid
/// * `AnalysisError::InvalidInput` for empty samples or a zero sample rate
///
/// # Example
///
/// ```no_run
/// use stratum_tempo::{analyze_samples, TempoConfig};
///
/// let samples = vec![0.0f32; 44100 * 30]; // 30 seconds of silence
/// let analysis = analyze_samples(&samples, 44100, &TempoConfig::default())?;
/// assert_eq!(analysis.picked_bpm, 0.0);
/// # Ok::<(), stratum_tempo::AnalysisError>(())
/// ```
pub fn analyze_samples(
    samples: &[f32],
    sample_rate: u32,
    config: &TempoConfig,
) -> Result<TempoAnalysis, AnalysisError> {
    let start_time = Instant::now();
    config.validate()?;

    if samples.is_empty() {
        return Err(AnalysisError::InvalidInput("Empty audio samples".to_string()));
    }

    let waveform = Waveform::new(samples.to_vec(), sample_rate)?;
    analyze_waveform(&waveform, config, start_time)
}

/// Load and analyze an audio file
///
/// The configuration is validated before the file is opened.
///
/// # Errors
///
/// * `AnalysisError::ConfigurationError` if `config` is invalid
/// * `AnalysisError::LoadError` if the file cannot be read or decoded
pub fn analyze_file(path: impl AsRef<Path>, config: &TempoConfig) -> Result<TempoReport, AnalysisError> {
    let start_time = Instant::now();
    let path = path.as_ref();
    config.validate()?;

    log::debug!("Analyzing file: {}", path.display());
    let waveform = io::load_waveform(path, &io::LoadOptions::from(config))?;
    let analysis = analyze_waveform(&waveform, config, start_time)?;

    Ok(TempoReport {
        path: path.to_path_buf(),
        analysis,
    })
}

/// Global tempo profile at the display hop (empty for silent input)
fn global_profile(waveform: &Waveform, config: &TempoConfig) -> Result<StrengthProfile, AnalysisError> {
    let sample_rate = waveform.sample_rate();
    let envelope = match onset_envelope(waveform.samples(), sample_rate, config.display_hop, config.frame_size) {
        Ok(envelope) => envelope,
        Err(AnalysisError::EmptyOnsetEnvelope) => {
            log::debug!("Global tempogram skipped: empty onset envelope");
            return Ok(StrengthProfile::default());
        }
        Err(e) => return Err(e),
    };

    let win_length = effective_win_length(
        config.tempogram_win_length,
        sample_rate,
        config.display_hop,
        config.bpm_min,
    );
    let tempogram = autocorrelation_tempogram(&envelope, win_length)?;
    Ok(strength_profile(
        &tempogram,
        ProfileAggregate::Mean,
        config.bpm_min,
        config.bpm_max,
    ))
}

fn analyze_waveform(
    waveform: &Waveform,
    config: &TempoConfig,
    start_time: Instant,
) -> Result<TempoAnalysis, AnalysisError> {
    let sample_rate = waveform.sample_rate();

    log::debug!(
        "Starting tempo analysis: {} samples at {} Hz",
        waveform.len(),
        sample_rate
    );

    // Percussive isolation
    let signal = if config.percussive {
        let hpss_hop = (config.frame_size / 4).max(1);
        let percussive = percussive_component(
            waveform.samples(),
            config.frame_size,
            hpss_hop,
            config.hpss_kernel,
        )?;
        Waveform::new(percussive, sample_rate)?
    } else {
        waveform.clone()
    };

    // Candidates across hop lengths
    let pool = generate_candidates(&signal, config)?;

    // Global tempogram, prior, pick
    let mut profile = global_profile(&signal, config)?;
    let range = config.preferred_range.as_ref();
    apply_prior(&mut profile, range, config.prior_sigma);

    let raw_picked = pick_tempo(&profile)
        .map(|bpm| resolve_metrical_level(&profile, bpm, &pool.candidates))
        .or_else(|| pool.candidates.first().copied())
        .unwrap_or(0.0);
    let picked = if config.normalize_octave {
        normalize_octave(raw_picked, range, config.octave_depth)
    } else {
        raw_picked
    };

    let (candidates, aggregate) = finalize_candidates(
        &pool.candidates,
        config.aggregate,
        config.n_candidates,
        config.pad_candidates,
    );

    let processing_time_ms = start_time.elapsed().as_secs_f32() * 1000.0;

    log::debug!(
        "Tempo analysis done: picked {:.2} BPM (raw {:.2}), aggregate {:?}, {:.1} ms",
        picked,
        raw_picked,
        aggregate,
        processing_time_ms
    );

    Ok(TempoAnalysis {
        candidates,
        aggregate_mode: config.aggregate,
        aggregate,
        picked_bpm: round2(picked),
        raw_picked_bpm: round2(raw_picked),
        sample_rate,
        display_hop: config.display_hop,
        frame_rate: sample_rate as f32 / config.display_hop as f32,
        preferred_range: config.preferred_range,
        normalize_octave: config.normalize_octave,
        used_fallback: pool.used_fallback,
        duration_seconds: waveform.duration_seconds(),
        processing_time_ms,
    })
}
