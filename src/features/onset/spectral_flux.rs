//! Spectral flux onset envelope
//!
//! Converts a signal into a non-negative onset-strength curve:
//! 1. Magnitude STFT at the requested hop length
//! 2. Log compression `ln(1 + γ·|X|)`
//! 3. Half-wave rectified frame-to-frame difference, summed over bins
//! 4. Normalization to [0, 1]
//!
//! # Reference
//!
//! Bello, J. P., Daudet, L., Abdallah, S., Duxbury, C., Davies, M., & Sandler, M. B. (2005).
//! A Tutorial on Onset Detection in Music Signals.
//! *IEEE Transactions on Speech and Audio Processing*, 13(5), 1035-1047.
//!
//! # Example
//!
//! ```no_run
//! use stratum_tempo::features::onset::spectral_flux::onset_envelope;
//!
//! let samples = vec![0.0f32; 44100 * 10];
//! let envelope = onset_envelope(&samples, 44100, 512, 2048)?;
//! println!("{} frames at {:.2} Hz", envelope.len(), envelope.frame_rate());
//! # Ok::<(), stratum_tempo::AnalysisError>(())
//! ```

use super::OnsetEnvelope;
use crate::error::AnalysisError;
use crate::features::spectrogram::magnitude_spectrogram;
use crate::preprocessing::sanitize::sanitize_logged;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Log compression factor
const LOG_COMPRESSION: f32 = 100.0;

/// Spectral flux of a magnitude spectrogram, one value per frame
///
/// The first frame has no predecessor and is 0.0.
pub fn spectral_flux(magnitude_spec_frames: &[Vec<f32>]) -> Vec<f32> {
    if magnitude_spec_frames.is_empty() {
        return Vec::new();
    }

    let compressed: Vec<Vec<f32>> = magnitude_spec_frames
        .iter()
        .map(|frame| {
            frame
                .iter()
                .map(|&x| (1.0 + LOG_COMPRESSION * x.max(0.0)).ln())
                .collect()
        })
        .collect();

    let mut flux = Vec::with_capacity(compressed.len());
    flux.push(0.0);
    for pair in compressed.windows(2) {
        let rise: f32 = pair[0]
            .iter()
            .zip(pair[1].iter())
            .map(|(&prev, &curr)| (curr - prev).max(0.0))
            .sum();
        flux.push(rise);
    }

    flux
}

/// Compute the onset envelope of a signal at one hop length
///
/// # Arguments
///
/// * `samples` - Audio samples (typically the percussive component)
/// * `sample_rate` - Sample rate in Hz
/// * `hop_length` - Samples between onset frames
/// * `frame_size` - STFT frame size (default: 2048)
///
/// # Errors
///
/// * `AnalysisError::InvalidInput` for a zero sample rate or invalid STFT parameters
/// * `AnalysisError::EmptyOnsetEnvelope` when fewer than two frames exist or
///   the envelope carries no energy (silence)
pub fn onset_envelope(
    samples: &[f32],
    sample_rate: u32,
    hop_length: usize,
    frame_size: usize,
) -> Result<OnsetEnvelope, AnalysisError> {
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidInput(
            "Sample rate must be > 0".to_string(),
        ));
    }

    let mag = magnitude_spectrogram(samples, frame_size, hop_length)?;
    if mag.len() < 2 {
        log::debug!(
            "Onset envelope at hop {}: only {} frame(s)",
            hop_length,
            mag.len()
        );
        return Err(AnalysisError::EmptyOnsetEnvelope);
    }

    let mut flux = spectral_flux(&mag);
    sanitize_logged(&mut flux, "onset envelope");

    let max_flux = flux.iter().copied().fold(0.0f32, f32::max);
    if max_flux <= EPSILON {
        log::debug!("Onset envelope at hop {} carries no energy", hop_length);
        return Err(AnalysisError::EmptyOnsetEnvelope);
    }
    for v in &mut flux {
        *v /= max_flux;
    }

    log::debug!(
        "Onset envelope: {} frames at hop {} (max raw flux {:.4})",
        flux.len(),
        hop_length,
        max_flux
    );

    Ok(OnsetEnvelope::new(flux, hop_length, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flux_detects_rise_only() {
        let mut spec = vec![vec![0.1f32; 16]; 6];
        spec[3] = vec![1.0; 16];
        let flux = spectral_flux(&spec);
        assert_eq!(flux.len(), 6);
        assert_eq!(flux[0], 0.0);
        assert!(flux[3] > 0.0);
        // Decay back to 0.1 is not an onset
        assert_eq!(flux[4], 0.0);
    }

    #[test]
    fn test_envelope_peaks_at_clicks() {
        let sr = 22050;
        let mut samples = vec![0.0f32; sr as usize * 2];
        for pos in (0..samples.len()).step_by(11025) {
            samples[pos] = 1.0;
        }
        let env = onset_envelope(&samples, sr, 512, 2048).unwrap();
        assert_eq!(env.len(), 1 + samples.len() / 512);
        assert!(env.values().iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert!(env.values().iter().any(|&v| v > 0.5));
    }

    #[test]
    fn test_silence_is_empty_envelope() {
        let samples = vec![0.0f32; 44100];
        let result = onset_envelope(&samples, 44100, 512, 2048);
        assert_eq!(result.unwrap_err(), AnalysisError::EmptyOnsetEnvelope);
    }

    #[test]
    fn test_too_short_is_empty_envelope() {
        let samples = vec![0.5f32; 100];
        let result = onset_envelope(&samples, 44100, 512, 2048);
        assert_eq!(result.unwrap_err(), AnalysisError::EmptyOnsetEnvelope);
    }

    #[test]
    fn test_invalid_sample_rate() {
        assert!(matches!(
            onset_envelope(&[0.0; 10], 0, 512, 2048),
            Err(AnalysisError::InvalidInput(_))
        ));
    }
}
