//! Harmonic-percussive source separation (HPSS)
//!
//! Median filtering of the magnitude spectrogram: smoothing along time keeps
//! sustained (harmonic) partials, smoothing along frequency keeps broadband
//! transients (percussive). A soft Wiener mask built from both estimates is
//! applied to the complex STFT and the percussive part is resynthesised.
//!
//! # Reference
//!
//! Fitzgerald, D. (2010). Harmonic/Percussive Separation using Median Filtering.
//! *Proceedings of the International Conference on Digital Audio Effects (DAFx)*.

use crate::error::AnalysisError;
use crate::features::spectrogram::{istft, magnitude, stft};

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Median of a scratch buffer (upper middle for even lengths)
fn median_of(buf: &mut [f32]) -> f32 {
    if buf.is_empty() {
        return 0.0;
    }
    let mid = buf.len() / 2;
    let (_, m, _) = buf.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    *m
}

/// Decompose a magnitude spectrogram into harmonic and percussive components
///
/// # Arguments
///
/// * `magnitude_spec` - Magnitude spectrogram (n_frames × n_bins)
/// * `kernel` - Median filter length, used both along time and along frequency
///
/// # Returns
///
/// Tuple of (harmonic, percussive) median-filtered spectrograms
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for a zero kernel or ragged frames
pub fn hpss_decompose(
    magnitude_spec: &[Vec<f32>],
    kernel: usize,
) -> Result<(Vec<Vec<f32>>, Vec<Vec<f32>>), AnalysisError> {
    if kernel == 0 {
        return Err(AnalysisError::InvalidInput(
            "HPSS kernel must be > 0".to_string(),
        ));
    }
    if magnitude_spec.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let n_frames = magnitude_spec.len();
    let n_bins = magnitude_spec[0].len();
    if magnitude_spec.iter().any(|f| f.len() != n_bins) {
        return Err(AnalysisError::InvalidInput(
            "Inconsistent frame lengths in spectrogram".to_string(),
        ));
    }

    log::debug!(
        "Decomposing spectrogram with HPSS: {} frames x {} bins, kernel={}",
        n_frames,
        n_bins,
        kernel
    );

    let half = kernel / 2;
    let mut scratch = Vec::with_capacity(kernel);

    let mut harmonic = vec![vec![0.0f32; n_bins]; n_frames];
    for bin in 0..n_bins {
        for t in 0..n_frames {
            let start = t.saturating_sub(half);
            let end = (t + half + 1).min(n_frames);
            scratch.clear();
            scratch.extend((start..end).map(|i| magnitude_spec[i][bin]));
            harmonic[t][bin] = median_of(&mut scratch);
        }
    }

    let mut percussive = vec![vec![0.0f32; n_bins]; n_frames];
    for (t, frame) in magnitude_spec.iter().enumerate() {
        for bin in 0..n_bins {
            let start = bin.saturating_sub(half);
            let end = (bin + half + 1).min(n_bins);
            scratch.clear();
            scratch.extend_from_slice(&frame[start..end]);
            percussive[t][bin] = median_of(&mut scratch);
        }
    }

    Ok((harmonic, percussive))
}

/// Soft percussive mask `P² / (H² + P²)`, zero where both estimates vanish
pub fn percussive_mask(harmonic: &[Vec<f32>], percussive: &[Vec<f32>]) -> Vec<Vec<f32>> {
    let mut mask = percussive.to_vec();
    percussive_mask_in_place(harmonic, &mut mask);
    mask
}

/// Overwrite the percussive estimate with its soft mask
pub fn percussive_mask_in_place(harmonic: &[Vec<f32>], percussive: &mut [Vec<f32>]) {
    for (h_frame, p_frame) in harmonic.iter().zip(percussive.iter_mut()) {
        for (&h, p) in h_frame.iter().zip(p_frame.iter_mut()) {
            let p2 = *p * *p;
            let denom = h * h + p2;
            *p = if denom > EPSILON { p2 / denom } else { 0.0 };
        }
    }
}

/// Isolate the percussive component of a signal
///
/// # Arguments
///
/// * `samples` - Audio samples
/// * `frame_size` - STFT frame size (default: 2048)
/// * `hop_size` - STFT hop size (default: 512)
/// * `kernel` - Median filter length (default: 31)
///
/// # Returns
///
/// Percussive waveform with the same length as the input
pub fn percussive_component(
    samples: &[f32],
    frame_size: usize,
    hop_size: usize,
    kernel: usize,
) -> Result<Vec<f32>, AnalysisError> {
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let mut spec = stft(samples, frame_size, hop_size)?;
    let (harmonic, mut mask) = {
        let mag = magnitude(&spec);
        hpss_decompose(&mag, kernel)?
    };
    percussive_mask_in_place(&harmonic, &mut mask);
    drop(harmonic);

    for (frame, mask_frame) in spec.iter_mut().zip(mask.iter()) {
        for (c, &m) in frame.iter_mut().zip(mask_frame.iter()) {
            *c *= m;
        }
    }

    istft(&spec, frame_size, hop_size, samples.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertical_line_is_percussive() {
        // One broadband frame in otherwise silent spectrogram
        let mut spec = vec![vec![0.0f32; 64]; 40];
        for v in spec[20].iter_mut() {
            *v = 1.0;
        }
        let (harmonic, percussive) = hpss_decompose(&spec, 9).unwrap();
        assert_eq!(percussive[20][32], 1.0);
        assert_eq!(harmonic[20][32], 0.0);
    }

    #[test]
    fn test_horizontal_line_is_harmonic() {
        // One sustained bin across all frames
        let mut spec = vec![vec![0.0f32; 64]; 40];
        for frame in spec.iter_mut() {
            frame[10] = 1.0;
        }
        let (harmonic, percussive) = hpss_decompose(&spec, 9).unwrap();
        assert_eq!(harmonic[20][10], 1.0);
        assert_eq!(percussive[20][10], 0.0);
    }

    #[test]
    fn test_mask_handles_silence() {
        let zeros = vec![vec![0.0f32; 8]; 4];
        let mask = percussive_mask(&zeros, &zeros);
        assert!(mask.iter().flatten().all(|&m| m == 0.0));
    }

    #[test]
    fn test_mask_in_place_matches_mask() {
        let harmonic = vec![vec![0.0, 1.0, 2.0, 0.5], vec![3.0, 0.0, 1.0, 0.0]];
        let percussive = vec![vec![0.0, 1.0, 1.0, 2.0], vec![1.0, 0.0, 3.0, 0.7]];
        let mask = percussive_mask(&harmonic, &percussive);

        let mut in_place = percussive.clone();
        percussive_mask_in_place(&harmonic, &mut in_place);
        assert_eq!(in_place, mask);
        assert_eq!(in_place[0][0], 0.0);
        assert_eq!(in_place[0][1], 0.5);
        assert_eq!(in_place[1][3], 1.0);
        assert!(in_place.iter().flatten().all(|&m| (0.0..=1.0).contains(&m)));
    }

    #[test]
    fn test_percussive_component_suppresses_tone() {
        let sr = 22050.0;
        let samples: Vec<f32> = (0..22050)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sr).sin() * 0.5)
            .collect();
        let perc = percussive_component(&samples, 1024, 256, 17).unwrap();
        assert_eq!(perc.len(), samples.len());

        let energy = |x: &[f32]| x.iter().map(|v| v * v).sum::<f32>();
        assert!(energy(&perc) < 0.1 * energy(&samples));
    }

    #[test]
    fn test_percussive_component_keeps_clicks() {
        let mut samples = vec![0.0f32; 22050];
        for pos in (0..22050).step_by(5512) {
            samples[pos] = 1.0;
        }
        let perc = percussive_component(&samples, 1024, 256, 17).unwrap();
        let energy = |x: &[f32]| x.iter().map(|v| v * v).sum::<f32>();
        assert!(energy(&perc) > 0.3 * energy(&samples));
    }

    #[test]
    fn test_invalid_kernel() {
        assert!(hpss_decompose(&[vec![0.0; 4]], 0).is_err());
    }
}
