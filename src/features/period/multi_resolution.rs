//! Multi-resolution tempo candidates
//!
//! Evaluates the onset envelope at several hop lengths in priority order and
//! pools the strongest periodicity of each resolution. Every hop produces an
//! explicit [`HopOutcome`]; a fixed decision table turns the outcomes into the
//! candidate pool:
//!
//! | Outcome / state            | Action                                      |
//! |----------------------------|---------------------------------------------|
//! | `Candidates`               | append the first `peaks_per_hop` BPMs        |
//! | `NoCandidate`              | skip the hop                                 |
//! | pool holds `n_candidates`  | stop, truncate to `n_candidates`             |
//! | all hops done, pool empty  | median-tempogram fallback at the display hop |
//! | fallback fails             | empty pool (tempo unknown)                   |
//!
//! # Reference
//!
//! Schreiber, H., & Müller, M. (2018). A Single-Step Approach to Musical Tempo Estimation
//! Using a Convolutional Neural Network. *Proceedings of the International Society for
//! Music Information Retrieval Conference*.

use rayon::prelude::*;

use super::peak_picking::{find_peaks, parabolic_offset};
use super::tempogram_autocorr::{
    autocorrelation_tempogram, effective_win_length, ProfileAggregate, Tempogram,
    MIN_PERIODIC_STRENGTH,
};
use crate::config::TempoConfig;
use crate::error::AnalysisError;
use crate::features::onset::spectral_flux::onset_envelope;
use crate::io::Waveform;

/// Minimum peak height relative to the strongest lag in range
const PEAK_THRESHOLD: f32 = 0.01;

/// Why a hop length produced no candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoCandidateReason {
    /// The onset envelope had no frames or no energy
    EmptyOnsetEnvelope,
    /// The tempogram had no peak inside the BPM range
    NoPeriodicity,
}

/// Result of evaluating one hop length
#[derive(Debug, Clone, PartialEq)]
pub enum HopOutcome {
    /// Ranked BPMs, strongest first
    Candidates {
        /// Hop length in samples
        hop_length: usize,
        /// Candidate BPMs (finite, positive, strongest first)
        bpms: Vec<f32>,
    },
    /// No usable periodicity at this resolution
    NoCandidate {
        /// Hop length in samples
        hop_length: usize,
        /// Reason
        reason: NoCandidateReason,
    },
}

impl HopOutcome {
    /// Hop length the outcome belongs to
    pub fn hop_length(&self) -> usize {
        match self {
            HopOutcome::Candidates { hop_length, .. } | HopOutcome::NoCandidate { hop_length, .. } => {
                *hop_length
            }
        }
    }

    /// Candidate BPMs (empty for `NoCandidate`)
    pub fn bpms(&self) -> &[f32] {
        match self {
            HopOutcome::Candidates { bpms, .. } => bpms,
            HopOutcome::NoCandidate { .. } => &[],
        }
    }
}

/// Pooled candidates with the outcomes that produced them
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePool {
    /// Pooled BPMs in hop priority order, at most `n_candidates`
    pub candidates: Vec<f32>,

    /// Outcomes of the hops that were evaluated, in priority order
    pub outcomes: Vec<HopOutcome>,

    /// True when the candidates came from the median-tempogram fallback
    pub used_fallback: bool,
}

/// Rank the peaks of a tempogram's mean lag strengths
///
/// # Arguments
///
/// * `tempogram` - Autocorrelation tempogram
/// * `bpm_min` / `bpm_max` - Inclusive BPM range
/// * `limit` - Maximum number of BPMs to return
///
/// # Returns
///
/// BPMs strongest first, refined between lags by parabolic interpolation.
/// A refinement that leaves the BPM range falls back to the integer lag.
/// Peaks below [`MIN_PERIODIC_STRENGTH`] are not periodicity and are dropped.
pub fn rank_tempo_peaks(tempogram: &Tempogram, bpm_min: f32, bpm_max: f32, limit: usize) -> Vec<f32> {
    let strengths = tempogram.lag_strengths(ProfileAggregate::Mean);
    let lags = tempogram.lag_range(bpm_min, bpm_max);
    if lags.is_empty() {
        return Vec::new();
    }

    find_peaks(&strengths, lags, PEAK_THRESHOLD)
        .into_iter()
        .filter(|&(_, strength)| strength >= MIN_PERIODIC_STRENGTH)
        .filter_map(|(lag, _)| {
            let refined = tempogram.lag_bpm(lag as f32 + parabolic_offset(&strengths, lag));
            let bpm = if refined >= bpm_min && refined <= bpm_max {
                refined
            } else {
                tempogram.lag_bpm(lag as f32)
            };
            (bpm.is_finite() && bpm > 0.0).then_some(bpm)
        })
        .take(limit)
        .collect()
}

/// Evaluate one hop length
///
/// # Errors
///
/// Only non-recoverable errors (invalid STFT or tempogram parameters) are
/// returned; an empty envelope becomes `NoCandidate`.
pub fn evaluate_hop(
    waveform: &Waveform,
    hop_length: usize,
    config: &TempoConfig,
) -> Result<HopOutcome, AnalysisError> {
    let sample_rate = waveform.sample_rate();

    let envelope = match onset_envelope(waveform.samples(), sample_rate, hop_length, config.frame_size) {
        Ok(envelope) => envelope,
        Err(AnalysisError::EmptyOnsetEnvelope) => {
            log::debug!("hop {}: empty onset envelope", hop_length);
            return Ok(HopOutcome::NoCandidate {
                hop_length,
                reason: NoCandidateReason::EmptyOnsetEnvelope,
            });
        }
        Err(e) => return Err(e),
    };

    let win_length = effective_win_length(
        config.tempogram_win_length,
        sample_rate,
        hop_length,
        config.bpm_min,
    );
    let tempogram = autocorrelation_tempogram(&envelope, win_length)?;
    let bpms = rank_tempo_peaks(&tempogram, config.bpm_min, config.bpm_max, config.n_candidates);

    if bpms.is_empty() {
        log::debug!("hop {}: no periodicity in range", hop_length);
        return Ok(HopOutcome::NoCandidate {
            hop_length,
            reason: NoCandidateReason::NoPeriodicity,
        });
    }

    log::debug!("hop {}: candidates {:?}", hop_length, bpms);
    Ok(HopOutcome::Candidates { hop_length, bpms })
}

/// Add an outcome's share to the pool; returns true once the pool is full
fn fill_pool(pool: &mut Vec<f32>, outcome: &HopOutcome, n_candidates: usize, peaks_per_hop: usize) -> bool {
    pool.extend(outcome.bpms().iter().take(peaks_per_hop));
    if pool.len() >= n_candidates {
        pool.truncate(n_candidates);
        true
    } else {
        false
    }
}

/// Apply the pooling decision table to outcomes in priority order
///
/// # Returns
///
/// The pool and the number of outcomes consumed before it filled up
pub fn pool_candidates(
    outcomes: &[HopOutcome],
    n_candidates: usize,
    peaks_per_hop: usize,
) -> (Vec<f32>, usize) {
    let mut pool = Vec::with_capacity(n_candidates);
    for (i, outcome) in outcomes.iter().enumerate() {
        if fill_pool(&mut pool, outcome, n_candidates, peaks_per_hop) {
            return (pool, i + 1);
        }
    }
    (pool, outcomes.len())
}

/// Pool per-hop results in priority order
///
/// Results are consumed lazily and the walk stops once the pool is full, so
/// an error from a hop after that point is never seen. Feeding the results
/// of every hop (as the parallel path does) therefore fails exactly when the
/// sequential walk would.
///
/// # Returns
///
/// The pool and the outcomes that were consumed
///
/// # Errors
///
/// The first error among the consumed results
pub fn pool_results<I>(
    results: I,
    n_candidates: usize,
    peaks_per_hop: usize,
) -> Result<(Vec<f32>, Vec<HopOutcome>), AnalysisError>
where
    I: IntoIterator<Item = Result<HopOutcome, AnalysisError>>,
{
    let mut pool = Vec::with_capacity(n_candidates);
    let mut outcomes = Vec::new();
    for result in results {
        let outcome = result?;
        let full = fill_pool(&mut pool, &outcome, n_candidates, peaks_per_hop);
        outcomes.push(outcome);
        if full {
            break;
        }
    }
    Ok((pool, outcomes))
}

/// Median-tempogram estimate at the display hop
///
/// Returns `None` when the envelope is empty or the median profile has no
/// energy in range.
pub fn fallback_estimate(waveform: &Waveform, config: &TempoConfig) -> Result<Option<f32>, AnalysisError> {
    let sample_rate = waveform.sample_rate();
    let hop_length = config.display_hop;

    let envelope = match onset_envelope(waveform.samples(), sample_rate, hop_length, config.frame_size) {
        Ok(envelope) => envelope,
        Err(AnalysisError::EmptyOnsetEnvelope) => return Ok(None),
        Err(e) => return Err(e),
    };

    let win_length = effective_win_length(
        config.tempogram_win_length,
        sample_rate,
        hop_length,
        config.bpm_min,
    );
    let tempogram = autocorrelation_tempogram(&envelope, win_length)?;
    let strengths = tempogram.lag_strengths(ProfileAggregate::Median);

    let mut best: Option<(usize, f32)> = None;
    for lag in tempogram.lag_range(config.bpm_min, config.bpm_max) {
        let s = strengths[lag];
        if s >= MIN_PERIODIC_STRENGTH && best.map_or(true, |(_, b)| s > b) {
            best = Some((lag, s));
        }
    }

    Ok(best
        .map(|(lag, _)| tempogram.lag_bpm(lag as f32))
        .filter(|bpm| bpm.is_finite() && *bpm > 0.0))
}

/// Generate the tempo candidate pool
///
/// # Arguments
///
/// * `waveform` - Signal to analyse (typically the percussive component)
/// * `config` - Hop lengths, candidate count, BPM range and parallelism
///
/// # Returns
///
/// Candidate pool; an empty pool means the tempo is unknown
///
/// # Errors
///
/// Propagates non-recoverable stage errors
pub fn generate_candidates(waveform: &Waveform, config: &TempoConfig) -> Result<CandidatePool, AnalysisError> {
    let n_candidates = config.n_candidates;
    let peaks_per_hop = config.peaks_per_hop;

    let (mut candidates, outcomes) = if config.parallel_hops {
        let results: Vec<Result<HopOutcome, AnalysisError>> = config
            .hop_lengths
            .par_iter()
            .map(|&hop| evaluate_hop(waveform, hop, config))
            .collect();
        pool_results(results, n_candidates, peaks_per_hop)?
    } else {
        let results = config
            .hop_lengths
            .iter()
            .map(|&hop| evaluate_hop(waveform, hop, config));
        pool_results(results, n_candidates, peaks_per_hop)?
    };

    let mut used_fallback = false;
    if candidates.is_empty() {
        if let Some(bpm) = fallback_estimate(waveform, config)? {
            log::warn!(
                "No hop produced a candidate; using median tempogram estimate {:.2} BPM",
                bpm
            );
            candidates = vec![bpm; n_candidates];
            used_fallback = true;
        } else {
            log::warn!("No tempo candidates found; tempo unknown");
        }
    }

    log::debug!(
        "Candidate pool: {:?} ({} hops evaluated, fallback={})",
        candidates,
        outcomes.len(),
        used_fallback
    );

    Ok(CandidatePool {
        candidates,
        outcomes,
        used_fallback,
    })
}
