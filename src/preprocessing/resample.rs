//! Sample rate conversion using rubato

use rubato::{FftFixedInOut, Resampler};

use crate::error::AnalysisError;

/// Chunk size fed to the FFT resampler
const CHUNK_SIZE: usize = 1024;

/// Resample mono audio from `source_rate` to `target_rate`
///
/// The resampler's output delay is dropped from the front and the input is
/// flushed with zero chunks, so the output is time-aligned with the input and
/// cut to the proportional length.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for zero rates and
/// `AnalysisError::LoadError` if the resampler cannot be built or fails.
pub fn resample(
    samples: &[f32],
    source_rate: u32,
    target_rate: u32,
) -> Result<Vec<f32>, AnalysisError> {
    if source_rate == 0 || target_rate == 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "Invalid resampling rates: {} -> {}",
            source_rate, target_rate
        )));
    }

    if source_rate == target_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    log::debug!(
        "Resampling {} samples: {} Hz -> {} Hz",
        samples.len(),
        source_rate,
        target_rate
    );

    let mut resampler =
        FftFixedInOut::<f32>::new(source_rate as usize, target_rate as usize, CHUNK_SIZE, 1)
            .map_err(|e| AnalysisError::LoadError(format!("resampler setup failed: {}", e)))?;

    let expected_len =
        ((samples.len() as u64 * target_rate as u64) / source_rate as u64) as usize;
    let delay = resampler.output_delay();
    let wanted = delay + expected_len;
    let mut output: Vec<f32> = Vec::with_capacity(wanted + CHUNK_SIZE);

    let mut pos = 0;
    while pos < samples.len() || output.len() < wanted {
        let chunk_size = resampler.input_frames_next();
        let end = (pos + chunk_size).min(samples.len());
        let mut chunk = samples[pos..end].to_vec();
        chunk.resize(chunk_size, 0.0);

        let resampled = resampler
            .process(&[chunk], None)
            .map_err(|e| AnalysisError::LoadError(format!("resampling failed: {}", e)))?;

        match resampled.into_iter().next() {
            Some(channel) if !channel.is_empty() => output.extend(channel),
            _ => break,
        }

        pos = end;
    }

    let mut output = output.split_off(delay.min(output.len()));
    output.truncate(expected_len);

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_rate() {
        let samples = vec![0.25f32; 1000];
        let out = resample(&samples, 44100, 44100).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn test_downsample_length() {
        let samples: Vec<f32> = (0..44100)
            .map(|i| (i as f32 * 220.0 * 2.0 * std::f32::consts::PI / 44100.0).sin())
            .collect();
        let out = resample(&samples, 44100, 22050).unwrap();
        assert_eq!(out.len(), 22050);
        assert!(out.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_click_position_preserved() {
        let mut samples = vec![0.0f32; 44100];
        samples[22050] = 1.0;
        let out = resample(&samples, 44100, 22050).unwrap();
        assert_eq!(out.len(), 22050);

        let peak = out
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.abs().partial_cmp(&b.1.abs()).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert!(
            (peak as i64 - 11025).abs() <= 2,
            "click moved to sample {}",
            peak
        );
    }

    #[test]
    fn test_tail_survives() {
        let mut samples = vec![0.0f32; 44100];
        samples[44000] = 1.0;
        let out = resample(&samples, 44100, 22050).unwrap();
        let tail_energy: f32 = out[21900..].iter().map(|s| s * s).sum();
        assert!(tail_energy > 1e-3, "tail energy {}", tail_energy);
    }

    #[test]
    fn test_invalid_rates() {
        assert!(resample(&[0.0; 10], 0, 44100).is_err());
        assert!(resample(&[0.0; 10], 44100, 0).is_err());
    }
}
