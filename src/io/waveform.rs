//! Mono waveform supplied to the analysis core

use crate::error::AnalysisError;
use crate::preprocessing::sanitize::sanitize_logged;

/// Single-channel floating-point audio with its sample rate
///
/// Samples are always finite: non-finite input is replaced with zero on
/// construction.
#[derive(Debug, Clone)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Waveform {
    /// Wrap mono samples, replacing non-finite values with zero
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if `sample_rate` is 0
    pub fn new(mut samples: Vec<f32>, sample_rate: u32) -> Result<Self, AnalysisError> {
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidInput(
                "Sample rate must be > 0".to_string(),
            ));
        }
        sanitize_logged(&mut samples, "waveform");
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when there are no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_finite_samples_replaced() {
        let wave = Waveform::new(vec![0.5, f32::NAN, f32::INFINITY, -0.5], 8000).unwrap();
        assert_eq!(wave.samples(), &[0.5, 0.0, 0.0, -0.5]);
        assert_eq!(wave.sample_rate(), 8000);
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        assert!(Waveform::new(vec![0.0; 4], 0).is_err());
    }

    #[test]
    fn test_duration() {
        let wave = Waveform::new(vec![0.0; 22050], 44100).unwrap();
        assert!((wave.duration_seconds() - 0.5).abs() < 1e-6);
    }
}
