//! Audio I/O modules
//!
//! Decoding with Symphonia and conversion to the mono [`Waveform`] the
//! analysis core consumes.

pub mod decoder;
pub mod waveform;

pub use waveform::Waveform;

use std::path::Path;

use crate::config::TempoConfig;
use crate::error::AnalysisError;
use crate::preprocessing::channel_mixer::{downmix, ChannelMixMode};
use crate::preprocessing::resample::resample;
use crate::preprocessing::silence::{detect_and_trim, SilenceDetector};

/// Options controlling how a file becomes a [`Waveform`]
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Target sample rate, `None` keeps the native rate
    pub target_sample_rate: Option<u32>,
    /// Downmix strategy
    pub channel_mix: ChannelMixMode,
    /// Seconds skipped at the start
    pub offset_seconds: f32,
    /// Maximum seconds kept after the offset
    pub duration_seconds: Option<f32>,
    /// Trim leading/trailing silence
    pub trim_silence: bool,
    /// Silence threshold in dB relative to the loudest frame
    pub trim_threshold_db: f32,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            target_sample_rate: None,
            channel_mix: ChannelMixMode::Mono,
            offset_seconds: 0.0,
            duration_seconds: None,
            trim_silence: false,
            trim_threshold_db: -30.0,
        }
    }
}

impl From<&TempoConfig> for LoadOptions {
    fn from(config: &TempoConfig) -> Self {
        Self {
            target_sample_rate: config.target_sample_rate,
            channel_mix: config.channel_mix,
            offset_seconds: config.offset_seconds,
            duration_seconds: config.duration_seconds,
            trim_silence: config.trim_silence,
            trim_threshold_db: config.trim_threshold_db,
        }
    }
}

/// Load an audio file as a mono waveform
///
/// Decodes, selects the `(offset, duration)` interval at the native rate,
/// downmixes, resamples, replaces non-finite samples and optionally trims
/// silence.
///
/// # Errors
///
/// Returns `AnalysisError::LoadError` when the path does not exist, is not
/// decodable audio, or yields zero samples (including an interval past the
/// end of the file).
pub fn load_waveform(path: &Path, options: &LoadOptions) -> Result<Waveform, AnalysisError> {
    let decoded = decoder::decode_file(path)?;
    let native_rate = decoded.sample_rate;
    let frames = decoded.frames();

    let start = ((options.offset_seconds.max(0.0) as f64) * native_rate as f64) as usize;
    let end = match options.duration_seconds {
        Some(d) => start.saturating_add(((d.max(0.0) as f64) * native_rate as f64) as usize),
        None => frames,
    }
    .min(frames);

    if start >= end {
        return Err(AnalysisError::LoadError(format!(
            "no samples in the requested interval (offset {:.2}s) of {}",
            options.offset_seconds,
            path.display()
        )));
    }

    let channels: Vec<Vec<f32>> = decoded
        .channels
        .iter()
        .map(|c| c[start..end].to_vec())
        .collect();
    let mono = downmix(&channels, options.channel_mix)?;

    let (samples, sample_rate) = match options.target_sample_rate {
        Some(target) if target != native_rate => (resample(&mono, native_rate, target)?, target),
        _ => (mono, native_rate),
    };

    let mut waveform = Waveform::new(samples, sample_rate)?;

    if options.trim_silence {
        let detector = SilenceDetector {
            threshold_db: options.trim_threshold_db,
            ..SilenceDetector::default()
        };
        let (trimmed, removed) = detect_and_trim(waveform.samples(), &detector)?;
        log::debug!("Silence trimming removed {} region(s)", removed.len());
        waveform = Waveform::new(trimmed, sample_rate)?;
    }

    if waveform.is_empty() {
        return Err(AnalysisError::LoadError(format!(
            "decoded zero samples from {}",
            path.display()
        )));
    }

    log::debug!(
        "Loaded {}: {} samples at {} Hz ({:.2}s)",
        path.display(),
        waveform.len(),
        waveform.sample_rate(),
        waveform.duration_seconds()
    );

    Ok(waveform)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, sample_rate: u32, channels: u16, frames: usize) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            let v = (i as f32 * 0.01).sin() * 0.5;
            for _ in 0..channels {
                writer.write_sample(v).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_offset_and_duration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, 8000, 1, 8000 * 4);

        let options = LoadOptions {
            offset_seconds: 1.0,
            duration_seconds: Some(2.0),
            ..LoadOptions::default()
        };
        let wave = load_waveform(&path, &options).unwrap();
        assert_eq!(wave.len(), 16000);
        assert_eq!(wave.sample_rate(), 8000);
    }

    #[test]
    fn test_offset_past_end_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.wav");
        write_wav(&path, 8000, 1, 8000);

        let options = LoadOptions {
            offset_seconds: 5.0,
            ..LoadOptions::default()
        };
        assert!(matches!(
            load_waveform(&path, &options),
            Err(AnalysisError::LoadError(_))
        ));
    }

    #[test]
    fn test_stereo_downmix_and_resample() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, 16000, 2, 16000);

        let options = LoadOptions {
            target_sample_rate: Some(8000),
            ..LoadOptions::default()
        };
        let wave = load_waveform(&path, &options).unwrap();
        assert_eq!(wave.sample_rate(), 8000);
        assert_eq!(wave.len(), 8000);
    }

    #[test]
    fn test_missing_path() {
        let result = load_waveform(Path::new("/no/such/file.flac"), &LoadOptions::default());
        assert!(matches!(result, Err(AnalysisError::LoadError(_))));
    }
}
