//! Autocorrelation tempogram
//!
//! Local autocorrelation of the onset envelope: every envelope frame gets a
//! centered, Hann-windowed segment of `win_length` frames whose
//! autocorrelation (normalized by lag 0) becomes one tempogram column. The
//! columns are reduced across time into a lag-strength curve, and lags are
//! mapped to BPM with `bpm = 60 * sample_rate / (hop_length * lag)`.
//!
//! # Reference
//!
//! Grosche, P., Müller, M., & Kurth, F. (2010). Cyclic Tempogram - A Mid-level
//! Tempo Representation for Music Signals.
//! *IEEE International Conference on Acoustics, Speech, and Signal Processing (ICASSP)*.
//!
//! # Example
//!
//! ```no_run
//! use stratum_tempo::features::onset::OnsetEnvelope;
//! use stratum_tempo::features::period::tempogram_autocorr::{
//!     autocorrelation_tempogram, strength_profile, ProfileAggregate,
//! };
//!
//! let envelope = OnsetEnvelope::new(vec![0.0f32; 2000], 512, 44100);
//! let tempogram = autocorrelation_tempogram(&envelope, 384)?;
//! let profile = strength_profile(&tempogram, ProfileAggregate::Mean, 30.0, 240.0);
//! println!("{} BPM bins", profile.len());
//! # Ok::<(), stratum_tempo::AnalysisError>(())
//! ```

use std::ops::Range;

use super::autocorrelation::{bpm_to_lag, lag_to_bpm, Autocorrelator};
use crate::error::AnalysisError;
use crate::features::onset::OnsetEnvelope;
use crate::features::spectrogram::hann_window;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Weakest lag strength that counts as periodicity
///
/// Columns are normalized so lag 0 is 1.0; FFT round-off on aperiodic input
/// stays several orders of magnitude below this.
pub const MIN_PERIODIC_STRENGTH: f32 = 1e-3;

/// How tempogram columns are reduced across time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileAggregate {
    /// Frame-wise mean (global tempo profile)
    Mean,
    /// Frame-wise median (robust fallback estimate)
    Median,
}

/// Local autocorrelation columns of an onset envelope
#[derive(Debug, Clone)]
pub struct Tempogram {
    /// One column per envelope frame, `win_length` lags each
    columns: Vec<Vec<f32>>,
    win_length: usize,
    sample_rate: u32,
    hop_length: usize,
}

impl Tempogram {
    /// Columns, `frames x lags`
    pub fn columns(&self) -> &[Vec<f32>] {
        &self.columns
    }

    /// Number of frames
    pub fn n_frames(&self) -> usize {
        self.columns.len()
    }

    /// Lags per column
    pub fn win_length(&self) -> usize {
        self.win_length
    }

    /// Sample rate of the analysed signal
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Hop length of the onset envelope
    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    /// BPM of a (possibly fractional) lag
    pub fn lag_bpm(&self, lag: f32) -> f32 {
        lag_to_bpm(lag, self.sample_rate, self.hop_length)
    }

    /// Lags whose BPM lies in `[bpm_min, bpm_max]`, lag 0 excluded
    ///
    /// Lags the envelope is too short to contain a full period of are left
    /// out, so a short envelope yields an empty range.
    pub fn lag_range(&self, bpm_min: f32, bpm_max: f32) -> Range<usize> {
        let max_lag = self.win_length.min(self.columns.len());
        let mut lags = (1..max_lag).filter(|&lag| {
            let bpm = self.lag_bpm(lag as f32);
            bpm >= bpm_min && bpm <= bpm_max
        });
        match lags.next() {
            Some(first) => {
                let last = lags.last().unwrap_or(first);
                first..last + 1
            }
            None => 0..0,
        }
    }

    /// Reduce the columns across time into one strength per lag
    pub fn lag_strengths(&self, aggregate: ProfileAggregate) -> Vec<f32> {
        let n_frames = self.columns.len();
        if n_frames == 0 {
            return vec![0.0; self.win_length];
        }

        match aggregate {
            ProfileAggregate::Mean => {
                let mut sums = vec![0.0f64; self.win_length];
                for column in &self.columns {
                    for (sum, &v) in sums.iter_mut().zip(column.iter()) {
                        *sum += v as f64;
                    }
                }
                sums.into_iter()
                    .map(|s| (s / n_frames as f64) as f32)
                    .collect()
            }
            ProfileAggregate::Median => {
                let mut scratch = Vec::with_capacity(n_frames);
                (0..self.win_length)
                    .map(|lag| {
                        scratch.clear();
                        scratch.extend(self.columns.iter().map(|c| c[lag]));
                        median(&mut scratch)
                    })
                    .collect()
            }
        }
    }
}

/// Median with the mean of the two middle values for even counts
fn median(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_unstable_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Window length that reaches the lag of `bpm_min`
///
/// Returns `win_length` unless the slowest tempo needs a longer lag axis.
pub fn effective_win_length(
    win_length: usize,
    sample_rate: u32,
    hop_length: usize,
    bpm_min: f32,
) -> usize {
    let slowest_lag = bpm_to_lag(bpm_min, sample_rate, hop_length);
    if !slowest_lag.is_finite() {
        return win_length;
    }
    win_length.max(slowest_lag.ceil() as usize + 2)
}

/// Compute the autocorrelation tempogram of an onset envelope
///
/// # Arguments
///
/// * `envelope` - Onset envelope
/// * `win_length` - Autocorrelation window in envelope frames (default: 384)
///
/// # Returns
///
/// Tempogram with one lag-0-normalized column per envelope frame. Columns of
/// silent segments are all zero.
///
/// # Errors
///
/// * `AnalysisError::EmptyOnsetEnvelope` if the envelope has no frames
/// * `AnalysisError::InvalidInput` if `win_length < 2`
pub fn autocorrelation_tempogram(
    envelope: &OnsetEnvelope,
    win_length: usize,
) -> Result<Tempogram, AnalysisError> {
    if win_length < 2 {
        return Err(AnalysisError::InvalidInput(format!(
            "Tempogram window must be >= 2 frames, got {}",
            win_length
        )));
    }
    if envelope.is_empty() {
        return Err(AnalysisError::EmptyOnsetEnvelope);
    }

    let values = envelope.values();
    let n_frames = values.len();
    let half = win_length / 2;

    log::debug!(
        "Computing autocorrelation tempogram: {} frames, win_length={}, hop={}",
        n_frames,
        win_length,
        envelope.hop_length()
    );

    // Zero padding so frame t sits at the window center
    let mut padded = vec![0.0f32; half];
    padded.extend_from_slice(values);
    padded.resize(n_frames + win_length, 0.0);

    let window = hann_window(win_length);
    let mut plan = Autocorrelator::new(win_length);
    let mut segment = vec![0.0f32; win_length];
    let mut columns = Vec::with_capacity(n_frames);

    for t in 0..n_frames {
        for ((slot, &x), &w) in segment
            .iter_mut()
            .zip(padded[t..t + win_length].iter())
            .zip(window.iter())
        {
            *slot = x * w;
        }

        let mut column = vec![0.0f32; win_length];
        plan.process(&segment, &mut column);

        let norm = column[0];
        if norm > EPSILON && norm.is_finite() {
            for v in column.iter_mut() {
                *v /= norm;
                if !v.is_finite() {
                    *v = 0.0;
                }
            }
        } else {
            column.fill(0.0);
        }
        columns.push(column);
    }

    Ok(Tempogram {
        columns,
        win_length,
        sample_rate: envelope.sample_rate(),
        hop_length: envelope.hop_length(),
    })
}

/// Tempo strength per BPM, ascending BPM order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrengthProfile {
    /// BPM of each bin (ascending)
    pub bpms: Vec<f32>,

    /// Strength of each bin (non-negative)
    pub strengths: Vec<f32>,
}

impl StrengthProfile {
    /// Number of BPM bins
    pub fn len(&self) -> usize {
        self.bpms.len()
    }

    /// True when no lag fell inside the BPM range
    pub fn is_empty(&self) -> bool {
        self.bpms.is_empty()
    }
}

/// Reduce a tempogram into a BPM strength profile
///
/// Keeps lags `>= 1` whose BPM lies in `[bpm_min, bpm_max]`. Larger lags are
/// slower tempi, so lags are walked downwards to produce ascending BPM.
pub fn strength_profile(
    tempogram: &Tempogram,
    aggregate: ProfileAggregate,
    bpm_min: f32,
    bpm_max: f32,
) -> StrengthProfile {
    let strengths = tempogram.lag_strengths(aggregate);
    let lags = tempogram.lag_range(bpm_min, bpm_max);

    let mut profile = StrengthProfile {
        bpms: Vec::with_capacity(lags.len()),
        strengths: Vec::with_capacity(lags.len()),
    };
    for lag in lags.rev() {
        let strength = strengths[lag];
        profile.bpms.push(tempogram.lag_bpm(lag as f32));
        profile.strengths.push(if strength.is_finite() {
            strength.max(0.0)
        } else {
            0.0
        });
    }

    log::debug!(
        "Strength profile: {} bins in [{:.1}, {:.1}] BPM ({:?})",
        profile.len(),
        bpm_min,
        bpm_max,
        aggregate
    );

    profile
}
