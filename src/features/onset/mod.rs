//! Onset strength modules
//!
//! - Harmonic-percussive source separation (HPSS)
//! - Spectral flux onset envelope

pub mod hpss;
pub mod spectral_flux;

/// Onset-strength curve at a fixed hop length
#[derive(Debug, Clone)]
pub struct OnsetEnvelope {
    values: Vec<f32>,
    hop_length: usize,
    sample_rate: u32,
}

impl OnsetEnvelope {
    /// Wrap envelope values; negative and non-finite values are clamped to 0.0
    pub fn new(mut values: Vec<f32>, hop_length: usize, sample_rate: u32) -> Self {
        for v in &mut values {
            if !v.is_finite() || *v < 0.0 {
                *v = 0.0;
            }
        }
        Self {
            values,
            hop_length,
            sample_rate,
        }
    }

    /// Strength values, one per frame
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Hop length in samples
    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    /// Sample rate of the source signal
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames per second
    pub fn frame_rate(&self) -> f32 {
        self.sample_rate as f32 / self.hop_length as f32
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when there are no frames
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
