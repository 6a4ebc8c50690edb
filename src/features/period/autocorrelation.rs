//! FFT-accelerated autocorrelation and lag/BPM conversion
//!
//! Uses the identity `ACF = IFFT(|FFT(signal)|²)` with zero padding to at
//! least twice the signal length, so the result is the linear (not circular)
//! autocorrelation.
//!
//! # Reference
//!
//! Ellis, D. P. W., & Pikrakis, A. (2006). Real-time Beat Induction.
//! *Proceedings of the International Conference on Music Information Retrieval*.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::error::AnalysisError;

/// Convert a lag in frames to BPM: `60 * sample_rate / (hop_length * lag)`
///
/// Lag zero has no tempo and maps to `f32::INFINITY`.
pub fn lag_to_bpm(lag: f32, sample_rate: u32, hop_length: usize) -> f32 {
    if lag <= 0.0 {
        return f32::INFINITY;
    }
    60.0 * sample_rate as f32 / (hop_length as f32 * lag)
}

/// Convert BPM to a (fractional) lag in frames
pub fn bpm_to_lag(bpm: f32, sample_rate: u32, hop_length: usize) -> f32 {
    60.0 * sample_rate as f32 / (hop_length as f32 * bpm)
}

/// Reusable autocorrelation plan for signals of one length
///
/// Plans the forward/inverse FFTs and the work buffer once; the tempogram
/// runs it for every onset frame.
pub struct Autocorrelator {
    len: usize,
    fft_size: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
}

impl Autocorrelator {
    /// Plan autocorrelation of signals with `len` samples
    pub fn new(len: usize) -> Self {
        // FFT size: next power of 2 >= 2*n (for zero-padding)
        let fft_size = (2 * len.max(1)).next_power_of_two();
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(fft_size);
        let inverse = planner.plan_fft_inverse(fft_size);
        Self {
            len,
            fft_size,
            forward,
            inverse,
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
        }
    }

    /// Signal length this plan was built for
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for a zero-length plan
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Autocorrelate `signal` into `out` (both `len` long), lags `0..len`
    ///
    /// Values are clamped at zero; the input signals here are non-negative
    /// so negative values only come from round-off.
    pub fn process(&mut self, signal: &[f32], out: &mut [f32]) {
        let n = self.len.min(signal.len()).min(out.len());

        for (slot, &x) in self.buffer.iter_mut().zip(signal[..n].iter()) {
            *slot = Complex::new(x, 0.0);
        }
        for slot in self.buffer[n..].iter_mut() {
            *slot = Complex::new(0.0, 0.0);
        }

        self.forward.process(&mut self.buffer);
        for x in self.buffer.iter_mut() {
            *x = *x * x.conj();
        }
        self.inverse.process(&mut self.buffer);

        let scale = 1.0 / self.fft_size as f32;
        for (o, x) in out[..n].iter_mut().zip(self.buffer.iter()) {
            *o = (x.re * scale).max(0.0);
        }
    }
}

/// Compute autocorrelation using FFT acceleration
///
/// # Arguments
///
/// * `signal` - Input signal (onset envelope or a window of it)
///
/// # Returns
///
/// Autocorrelation function (same length as input, lag 0 first)
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for an empty signal
pub fn compute_autocorrelation_fft(signal: &[f32]) -> Result<Vec<f32>, AnalysisError> {
    if signal.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "Cannot autocorrelate an empty signal".to_string(),
        ));
    }
    let mut plan = Autocorrelator::new(signal.len());
    let mut acf = vec![0.0f32; signal.len()];
    plan.process(signal, &mut acf);
    Ok(acf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_autocorrelation_fft() {
        // Simple periodic signal: [1, 0, 1, 0, 1, 0]
        let signal = vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0];
        let acf = compute_autocorrelation_fft(&signal).unwrap();

        assert_eq!(acf.len(), signal.len());
        assert!((acf[0] - 3.0).abs() < 1e-4);
        assert!(acf[1].abs() < 1e-4);
        assert!((acf[2] - 2.0).abs() < 1e-4);
        assert!((acf[4] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_matches_direct_sum() {
        let signal: Vec<f32> = (0..50).map(|i| ((i * 7) % 11) as f32 / 10.0).collect();
        let acf = compute_autocorrelation_fft(&signal).unwrap();
        for lag in [0usize, 1, 5, 13, 49] {
            let direct: f32 = (0..signal.len() - lag)
                .map(|i| signal[i] * signal[i + lag])
                .sum();
            assert!(
                (acf[lag] - direct).abs() < 1e-2,
                "lag {}: fft {} vs direct {}",
                lag,
                acf[lag],
                direct
            );
        }
    }

    #[test]
    fn test_empty_signal() {
        assert!(compute_autocorrelation_fft(&[]).is_err());
    }

    #[test]
    fn test_lag_bpm_conversion() {
        // 44100 Hz, hop 512, lag 43 -> ~120.2 BPM
        let bpm = lag_to_bpm(43.0, 44100, 512);
        assert!((bpm - 120.18).abs() < 0.01);
        let lag = bpm_to_lag(bpm, 44100, 512);
        assert!((lag - 43.0).abs() < 1e-3);
        assert!(lag_to_bpm(0.0, 44100, 512).is_infinite());
    }
}
