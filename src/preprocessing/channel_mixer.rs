//! Channel mixing utilities (multi-channel to mono conversion)

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Channel mixing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelMixMode {
    /// Simple average of all channels
    Mono,
    /// Keep the first channel only
    First,
    /// Keep the channel with the highest RMS
    Dominant,
}

impl std::str::FromStr for ChannelMixMode {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mono" => Ok(ChannelMixMode::Mono),
            "first" => Ok(ChannelMixMode::First),
            "dominant" => Ok(ChannelMixMode::Dominant),
            other => Err(AnalysisError::ConfigurationError(format!(
                "unknown channel mix '{}' (expected mono, first or dominant)",
                other
            ))),
        }
    }
}

/// Convert deinterleaved channels to a single channel
///
/// # Arguments
///
/// * `channels` - One sample vector per channel
/// * `mode` - Mixing mode
///
/// # Returns
///
/// Mono samples; the length is the shortest channel length
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` when no channel is supplied
pub fn downmix(channels: &[Vec<f32>], mode: ChannelMixMode) -> Result<Vec<f32>, AnalysisError> {
    if channels.is_empty() {
        return Err(AnalysisError::InvalidInput("No channels to mix".to_string()));
    }

    log::debug!("Mixing {} channel(s) using {:?}", channels.len(), mode);

    if channels.len() == 1 {
        return Ok(channels[0].clone());
    }

    let frames = channels.iter().map(|c| c.len()).min().unwrap_or(0);

    let mixed = match mode {
        ChannelMixMode::Mono => {
            let scale = 1.0 / channels.len() as f32;
            (0..frames)
                .map(|i| channels.iter().map(|c| c[i]).sum::<f32>() * scale)
                .collect()
        }
        ChannelMixMode::First => channels[0][..frames].to_vec(),
        ChannelMixMode::Dominant => {
            let loudest = channels
                .iter()
                .enumerate()
                .map(|(idx, c)| (idx, rms(&c[..frames])))
                .fold((0usize, f32::NEG_INFINITY), |best, cur| {
                    if cur.1 > best.1 {
                        cur
                    } else {
                        best
                    }
                })
                .0;
            channels[loudest][..frames].to_vec()
        }
    };

    Ok(mixed)
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|&s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_average() {
        let channels = vec![vec![1.0, 0.0, -1.0], vec![0.0, 1.0, -1.0]];
        let mono = downmix(&channels, ChannelMixMode::Mono).unwrap();
        assert_eq!(mono, vec![0.5, 0.5, -1.0]);
    }

    #[test]
    fn test_first_channel() {
        let channels = vec![vec![0.1, 0.2], vec![0.9, 0.9]];
        let mono = downmix(&channels, ChannelMixMode::First).unwrap();
        assert_eq!(mono, vec![0.1, 0.2]);
    }

    #[test]
    fn test_dominant_channel() {
        let channels = vec![vec![0.1, -0.1], vec![0.8, -0.8]];
        let mono = downmix(&channels, ChannelMixMode::Dominant).unwrap();
        assert_eq!(mono, vec![0.8, -0.8]);
    }

    #[test]
    fn test_uneven_lengths_truncate() {
        let channels = vec![vec![1.0, 1.0, 1.0], vec![1.0, 1.0]];
        let mono = downmix(&channels, ChannelMixMode::Mono).unwrap();
        assert_eq!(mono.len(), 2);
    }

    #[test]
    fn test_mix_mode_parsing() {
        assert_eq!("dominant".parse::<ChannelMixMode>().unwrap(), ChannelMixMode::Dominant);
        assert_eq!("First".parse::<ChannelMixMode>().unwrap(), ChannelMixMode::First);
        assert_eq!("mono".parse::<ChannelMixMode>().unwrap(), ChannelMixMode::Mono);
        assert!(matches!(
            "left".parse::<ChannelMixMode>(),
            Err(AnalysisError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_no_channels() {
        assert!(downmix(&[], ChannelMixMode::Mono).is_err());
    }
}
