//! Silence detection and trimming utilities
//!
//! Removes leading and trailing regions whose frame RMS sits below a
//! threshold relative to the loudest frame, so intros and outros do not
//! dilute the global periodicity.

use crate::error::AnalysisError;

/// Silence detection configuration
#[derive(Debug, Clone)]
pub struct SilenceDetector {
    /// Threshold in dB relative to the loudest frame (default: -30.0)
    pub threshold_db: f32,

    /// Frame size for RMS analysis (default: 2048)
    pub frame_size: usize,

    /// Hop between RMS frames (default: 512)
    pub hop_size: usize,
}

impl Default for SilenceDetector {
    fn default() -> Self {
        Self {
            threshold_db: -30.0,
            frame_size: 2048,
            hop_size: 512,
        }
    }
}

/// Detect and trim leading/trailing silence
///
/// # Arguments
///
/// * `samples` - Audio samples
/// * `detector` - Silence detection configuration
///
/// # Returns
///
/// Trimmed samples and the removed regions as `(start, end)` sample ranges.
/// Audio that is silent throughout is returned unchanged.
pub fn detect_and_trim(
    samples: &[f32],
    detector: &SilenceDetector,
) -> Result<(Vec<f32>, Vec<(usize, usize)>), AnalysisError> {
    if detector.frame_size == 0 || detector.hop_size == 0 {
        return Err(AnalysisError::InvalidInput(
            "Silence detector frame and hop size must be > 0".to_string(),
        ));
    }

    log::debug!(
        "Detecting silence in {} samples (threshold {:.1} dB)",
        samples.len(),
        detector.threshold_db
    );

    if samples.len() < detector.frame_size {
        return Ok((samples.to_vec(), Vec::new()));
    }

    let num_frames = (samples.len() - detector.frame_size) / detector.hop_size + 1;
    let frame_rms: Vec<f32> = (0..num_frames)
        .map(|f| {
            let start = f * detector.hop_size;
            let frame = &samples[start..start + detector.frame_size];
            (frame.iter().map(|&s| s * s).sum::<f32>() / frame.len() as f32).sqrt()
        })
        .collect();

    let reference = frame_rms.iter().copied().fold(0.0f32, f32::max);
    if reference <= 0.0 {
        log::debug!("Audio is silent throughout, nothing trimmed");
        return Ok((samples.to_vec(), Vec::new()));
    }

    let threshold = reference * 10f32.powf(detector.threshold_db / 20.0);
    let is_loud = |rms: &f32| *rms > threshold;

    let first = frame_rms.iter().position(is_loud).unwrap_or(0);
    let last = frame_rms.iter().rposition(is_loud).unwrap_or(num_frames - 1);

    let start = first * detector.hop_size;
    let end = (last * detector.hop_size + detector.frame_size).min(samples.len());

    let mut removed = Vec::new();
    if start > 0 {
        removed.push((0, start));
    }
    if end < samples.len() {
        removed.push((end, samples.len()));
    }

    log::debug!(
        "Trimmed silence: kept samples [{}, {}) of {}",
        start,
        end,
        samples.len()
    );

    Ok((samples[start..end].to_vec(), removed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (i as f32 * 440.0 * 2.0 * std::f32::consts::PI / 44100.0).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_trims_leading_and_trailing_silence() {
        let mut samples = vec![0.0f32; 44100];
        samples.extend(tone(44100));
        samples.extend(vec![0.0f32; 44100]);

        let (trimmed, removed) = detect_and_trim(&samples, &SilenceDetector::default()).unwrap();

        assert!(trimmed.len() < samples.len());
        assert!(trimmed.len() >= 44100, "content must be kept, got {}", trimmed.len());
        assert!(trimmed.len() < 44100 + 2 * 2048);
        assert_eq!(removed.len(), 2);
    }

    #[test]
    fn test_all_silent_unchanged() {
        let samples = vec![0.0f32; 44100];
        let (trimmed, removed) = detect_and_trim(&samples, &SilenceDetector::default()).unwrap();
        assert_eq!(trimmed.len(), samples.len());
        assert!(removed.is_empty());
    }

    #[test]
    fn test_short_input_unchanged() {
        let samples = vec![0.5f32; 100];
        let (trimmed, _) = detect_and_trim(&samples, &SilenceDetector::default()).unwrap();
        assert_eq!(trimmed.len(), 100);
    }

    #[test]
    fn test_invalid_detector() {
        let detector = SilenceDetector {
            hop_size: 0,
            ..SilenceDetector::default()
        };
        assert!(detect_and_trim(&[0.0; 4096], &detector).is_err());
    }
}
