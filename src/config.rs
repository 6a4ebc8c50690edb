//! Configuration parameters for tempo analysis

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::preprocessing::channel_mixer::ChannelMixMode;

/// Default hop lengths, in priority order (samples between onset frames)
pub const DEFAULT_HOP_LENGTHS: [usize; 5] = [256, 384, 512, 768, 1024];

/// Slowest tempo the tempogram may be asked to resolve
pub const MIN_BPM: f32 = 1.0;

/// Largest accepted octave normalization depth
pub const MAX_OCTAVE_DEPTH: u32 = 16;

/// How pooled tempo candidates are reduced to one scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateMode {
    /// Middle value (mean of the two middle values for even counts)
    Median,
    /// Arithmetic mean
    Mean,
    /// No aggregation; only the raw candidate list is reported
    None,
}

impl AggregateMode {
    /// Lowercase name used in reports
    pub fn name(&self) -> &'static str {
        match self {
            AggregateMode::Median => "median",
            AggregateMode::Mean => "mean",
            AggregateMode::None => "none",
        }
    }
}

impl std::str::FromStr for AggregateMode {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "median" => Ok(AggregateMode::Median),
            "mean" => Ok(AggregateMode::Mean),
            "none" => Ok(AggregateMode::None),
            other => Err(AnalysisError::ConfigurationError(format!(
                "unknown aggregation mode '{}' (expected median, mean or none)",
                other
            ))),
        }
    }
}

/// Caller-supplied BPM window used to bias selection and correct octave errors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreferredRange {
    /// Lower bound in BPM
    pub min_bpm: f32,
    /// Upper bound in BPM
    pub max_bpm: f32,
}

impl PreferredRange {
    /// Build a range, rejecting `max <= min` and non-positive or non-finite bounds
    pub fn new(min_bpm: f32, max_bpm: f32) -> Result<Self, AnalysisError> {
        let range = Self { min_bpm, max_bpm };
        range.validate()?;
        Ok(range)
    }

    /// Midpoint of the window
    pub fn center(&self) -> f32 {
        (self.min_bpm + self.max_bpm) / 2.0
    }

    /// Inclusive membership test
    pub fn contains(&self, bpm: f32) -> bool {
        bpm >= self.min_bpm && bpm <= self.max_bpm
    }

    fn validate(&self) -> Result<(), AnalysisError> {
        if !self.min_bpm.is_finite() || !self.max_bpm.is_finite() {
            return Err(AnalysisError::ConfigurationError(format!(
                "preferred range bounds must be finite, got [{}, {}]",
                self.min_bpm, self.max_bpm
            )));
        }
        if self.min_bpm <= 0.0 {
            return Err(AnalysisError::ConfigurationError(format!(
                "preferred range minimum must be > 0, got {}",
                self.min_bpm
            )));
        }
        if self.max_bpm <= self.min_bpm {
            return Err(AnalysisError::ConfigurationError(format!(
                "preferred range maximum must exceed minimum, got [{}, {}]",
                self.min_bpm, self.max_bpm
            )));
        }
        Ok(())
    }
}

/// Tempo analysis configuration
///
/// Every parameter of a run lives here; nothing is read from the process
/// environment. Build one with [`TempoConfig::default`] and adjust fields or
/// use the `with_*` helpers, then pass it to [`crate::analyze_file`] or
/// [`crate::analyze_samples`].
#[derive(Debug, Clone)]
pub struct TempoConfig {
    // Loading
    /// Target sample rate in Hz, `None` keeps the native rate (default: None)
    pub target_sample_rate: Option<u32>,

    /// Downmix strategy for multi-channel sources (default: Mono average)
    pub channel_mix: ChannelMixMode,

    /// Seconds skipped at the start of the file (default: 0.0)
    pub offset_seconds: f32,

    /// Maximum seconds analyzed after the offset, `None` for the rest of the file
    pub duration_seconds: Option<f32>,

    /// Remove leading/trailing silence before analysis (default: false)
    pub trim_silence: bool,

    /// Silence threshold in dB relative to the loudest frame (default: -30.0)
    pub trim_threshold_db: f32,

    // Percussive isolation
    /// Feed the percussive HPSS component to onset detection (default: true)
    pub percussive: bool,

    /// Median filter length for HPSS, in frames and bins (default: 31)
    pub hpss_kernel: usize,

    // Spectral analysis
    /// STFT frame size in samples (default: 2048)
    pub frame_size: usize,

    /// Hop lengths tried for candidate generation, in priority order
    pub hop_lengths: Vec<usize>,

    /// Hop length for the global tempogram, the fallback estimate and display (default: 512)
    pub display_hop: usize,

    // Candidates
    /// Size of the pooled candidate list (default: 5)
    pub n_candidates: usize,

    /// Candidates contributed by each hop length, strongest first (default: 1)
    pub peaks_per_hop: usize,

    /// Pad a short, non-empty pool with the aggregate (default: true)
    pub pad_candidates: bool,

    /// Aggregation over pooled candidates (default: Median)
    pub aggregate: AggregateMode,

    // Tempogram
    /// Minimum BPM considered (default: 30.0)
    pub bpm_min: f32,

    /// Maximum BPM considered (default: 240.0)
    pub bpm_max: f32,

    /// Autocorrelation window in onset frames (default: 384)
    /// Raised automatically when shorter than the lag of `bpm_min`
    pub tempogram_win_length: usize,

    // Prior and octave correction
    /// Optional preferred BPM window (default: None)
    pub preferred_range: Option<PreferredRange>,

    /// Gaussian prior standard deviation, `None` uses `max((max - min) / 2, 1)`
    pub prior_sigma: Option<f32>,

    /// Apply octave correction toward the preferred range (default: true)
    pub normalize_octave: bool,

    /// Halving/doubling iterations for octave correction (default: 3)
    pub octave_depth: u32,

    // Execution
    /// Evaluate hop lengths on the rayon pool (default: false)
    /// Candidate order is unaffected
    pub parallel_hops: bool,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: None,
            channel_mix: ChannelMixMode::Mono,
            offset_seconds: 0.0,
            duration_seconds: None,
            trim_silence: false,
            trim_threshold_db: -30.0,
            percussive: true,
            hpss_kernel: 31,
            frame_size: 2048,
            hop_lengths: DEFAULT_HOP_LENGTHS.to_vec(),
            display_hop: 512,
            n_candidates: 5,
            peaks_per_hop: 1,
            pad_candidates: true,
            aggregate: AggregateMode::Median,
            bpm_min: 30.0,
            bpm_max: 240.0,
            tempogram_win_length: 384,
            preferred_range: None,
            prior_sigma: None,
            normalize_octave: true,
            octave_depth: 3,
            parallel_hops: false,
        }
    }
}

impl TempoConfig {
    /// Set the preferred BPM window
    pub fn with_preferred_range(mut self, min_bpm: f32, max_bpm: f32) -> Self {
        self.preferred_range = Some(PreferredRange { min_bpm, max_bpm });
        self
    }

    /// Set the hop lengths, in priority order
    pub fn with_hop_lengths(mut self, hop_lengths: &[usize]) -> Self {
        self.hop_lengths = hop_lengths.to_vec();
        self
    }

    /// Average channels (`true`) or keep the first channel only (`false`)
    pub fn with_mono(mut self, mono: bool) -> Self {
        self.channel_mix = if mono {
            ChannelMixMode::Mono
        } else {
            ChannelMixMode::First
        };
        self
    }

    /// Set how multi-channel audio is reduced to mono
    pub fn with_channel_mix(mut self, mode: ChannelMixMode) -> Self {
        self.channel_mix = mode;
        self
    }

    /// Set the aggregation mode
    pub fn with_aggregate(mut self, mode: AggregateMode) -> Self {
        self.aggregate = mode;
        self
    }

    /// Check every parameter
    ///
    /// Called by the entry points before any audio is touched.
    ///
    /// # Errors
    ///
    /// `AnalysisError::ConfigurationError` naming the offending parameter.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if let Some(range) = &self.preferred_range {
            range.validate()?;
        }

        if self.hop_lengths.is_empty() {
            return Err(AnalysisError::ConfigurationError(
                "hop length set must not be empty".to_string(),
            ));
        }
        if let Some(bad) = self.hop_lengths.iter().find(|&&h| h == 0) {
            return Err(AnalysisError::ConfigurationError(format!(
                "hop lengths must be > 0, got {}",
                bad
            )));
        }
        if self.display_hop == 0 {
            return Err(AnalysisError::ConfigurationError(
                "display hop length must be > 0".to_string(),
            ));
        }
        if self.frame_size < 2 {
            return Err(AnalysisError::ConfigurationError(format!(
                "frame size must be >= 2, got {}",
                self.frame_size
            )));
        }
        if self.n_candidates == 0 {
            return Err(AnalysisError::ConfigurationError(
                "candidate count must be > 0".to_string(),
            ));
        }
        if self.peaks_per_hop == 0 {
            return Err(AnalysisError::ConfigurationError(
                "peaks per hop must be > 0".to_string(),
            ));
        }
        if !(self.bpm_min > 0.0) || !self.bpm_max.is_finite() || self.bpm_max <= self.bpm_min {
            return Err(AnalysisError::ConfigurationError(format!(
                "invalid tempogram BPM range [{}, {}]",
                self.bpm_min, self.bpm_max
            )));
        }
        if self.bpm_min < MIN_BPM {
            return Err(AnalysisError::ConfigurationError(format!(
                "minimum tempo must be >= {} BPM, got {}",
                MIN_BPM, self.bpm_min
            )));
        }
        if self.octave_depth > MAX_OCTAVE_DEPTH {
            return Err(AnalysisError::ConfigurationError(format!(
                "octave depth must be <= {}, got {}",
                MAX_OCTAVE_DEPTH, self.octave_depth
            )));
        }
        if self.tempogram_win_length < 2 {
            return Err(AnalysisError::ConfigurationError(format!(
                "tempogram window must be >= 2 frames, got {}",
                self.tempogram_win_length
            )));
        }
        if self.hpss_kernel == 0 {
            return Err(AnalysisError::ConfigurationError(
                "HPSS kernel must be > 0".to_string(),
            ));
        }
        if let Some(sigma) = self.prior_sigma {
            if !(sigma > 0.0) || !sigma.is_finite() {
                return Err(AnalysisError::ConfigurationError(format!(
                    "prior sigma must be a positive finite number, got {}",
                    sigma
                )));
            }
        }
        if self.target_sample_rate == Some(0) {
            return Err(AnalysisError::ConfigurationError(
                "target sample rate must be > 0".to_string(),
            ));
        }
        if !(self.offset_seconds >= 0.0) || !self.offset_seconds.is_finite() {
            return Err(AnalysisError::ConfigurationError(format!(
                "start offset must be >= 0 seconds, got {}",
                self.offset_seconds
            )));
        }
        if let Some(duration) = self.duration_seconds {
            if !(duration > 0.0) || !duration.is_finite() {
                return Err(AnalysisError::ConfigurationError(format!(
                    "duration must be > 0 seconds, got {}",
                    duration
                )));
            }
        }
        if !self.trim_threshold_db.is_finite() {
            return Err(AnalysisError::ConfigurationError(
                "silence threshold must be finite".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TempoConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.hop_lengths, vec![256, 384, 512, 768, 1024]);
        assert_eq!(config.n_candidates, 5);
        assert_eq!(config.aggregate, AggregateMode::Median);
        assert!(config.preferred_range.is_none());
    }

    #[test]
    fn test_inverted_preferred_range_rejected() {
        let config = TempoConfig::default().with_preferred_range(100.0, 80.0);
        match config.validate() {
            Err(AnalysisError::ConfigurationError(msg)) => assert!(msg.contains("100")),
            other => panic!("expected configuration error, got {:?}", other),
        }

        assert!(PreferredRange::new(90.0, 90.0).is_err());
        assert!(PreferredRange::new(85.0, 95.0).is_ok());
    }

    #[test]
    fn test_invalid_hops_and_counts_rejected() {
        let config = TempoConfig::default().with_hop_lengths(&[512, 0]);
        assert!(config.validate().is_err());

        let config = TempoConfig::default().with_hop_lengths(&[]);
        assert!(config.validate().is_err());

        let config = TempoConfig {
            n_candidates: 0,
            ..TempoConfig::default()
        };
        assert!(config.validate().is_err());

        let config = TempoConfig {
            prior_sigma: Some(0.0),
            ..TempoConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_aggregate_mode_parsing() {
        assert_eq!("median".parse::<AggregateMode>().unwrap(), AggregateMode::Median);
        assert_eq!("MEAN".parse::<AggregateMode>().unwrap(), AggregateMode::Mean);
        assert_eq!("none".parse::<AggregateMode>().unwrap(), AggregateMode::None);
        assert!("mode".parse::<AggregateMode>().is_err());
    }

    #[test]
    fn test_preferred_range_membership() {
        let range = PreferredRange::new(85.0, 95.0).unwrap();
        assert_eq!(range.center(), 90.0);
        assert!(range.contains(85.0));
        assert!(range.contains(95.0));
        assert!(!range.contains(95.01));
    }

    #[test]
    fn test_with_mono_selects_mix_mode() {
        assert_eq!(TempoConfig::default().with_mono(false).channel_mix, ChannelMixMode::First);
        assert_eq!(TempoConfig::default().with_mono(true).channel_mix, ChannelMixMode::Mono);
        assert_eq!(
            TempoConfig::default()
                .with_channel_mix(ChannelMixMode::Dominant)
                .channel_mix,
            ChannelMixMode::Dominant
        );
    }

    #[test]
    fn test_octave_depth_bounded() {
        let config = TempoConfig {
            octave_depth: u32::MAX,
            ..TempoConfig::default()
        };
        match config.validate() {
            Err(AnalysisError::ConfigurationError(msg)) => assert!(msg.contains("octave depth")),
            other => panic!("expected configuration error, got {:?}", other),
        }

        let config = TempoConfig {
            octave_depth: MAX_OCTAVE_DEPTH,
            ..TempoConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tiny_bpm_min_rejected() {
        let config = TempoConfig {
            bpm_min: 1e-6,
            ..TempoConfig::default()
        };
        match config.validate() {
            Err(AnalysisError::ConfigurationError(msg)) => assert!(msg.contains("minimum tempo")),
            other => panic!("expected configuration error, got {:?}", other),
        }

        let config = TempoConfig {
            bpm_min: MIN_BPM,
            ..TempoConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
