//! Analysis result types

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::{AggregateMode, PreferredRange};

/// Complete tempo analysis of one signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoAnalysis {
    /// Pooled candidate BPMs, rounded to two decimals (empty when unknown)
    pub candidates: Vec<f32>,

    /// Aggregation mode
    pub aggregate_mode: AggregateMode,

    /// Aggregate of the candidates (`None` when aggregation is disabled)
    pub aggregate: Option<f32>,

    /// Picked tempo after octave normalization (0.0 when unknown)
    pub picked_bpm: f32,

    /// Picked tempo before octave normalization
    pub raw_picked_bpm: f32,

    /// Sample rate the analysis ran at
    pub sample_rate: u32,

    /// Hop length of the global tempogram
    pub display_hop: usize,

    /// Onset frames per second at the display hop
    pub frame_rate: f32,

    /// Preferred range, if any
    pub preferred_range: Option<PreferredRange>,

    /// Whether octave normalization was enabled
    pub normalize_octave: bool,

    /// True when the candidates came from the median-tempogram fallback
    pub used_fallback: bool,

    /// Duration of the analysed signal in seconds
    pub duration_seconds: f32,

    /// Wall-clock processing time in milliseconds
    ///
    /// Not serialized, so JSON reports of the same input are identical.
    #[serde(skip)]
    pub processing_time_ms: f32,
}

impl TempoAnalysis {
    /// True when no tempo could be determined
    pub fn is_unknown(&self) -> bool {
        self.picked_bpm <= 0.0
    }
}

/// Tempo analysis of a file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoReport {
    /// Analysed file
    pub path: PathBuf,

    /// Analysis
    #[serde(flatten)]
    pub analysis: TempoAnalysis,
}

impl fmt::Display for TempoReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = &self.analysis;

        writeln!(f, "File     : {}", self.path.display())?;
        writeln!(
            f,
            "SR/HL    : {} / {}  (frame_rate ≈ {:.2} Hz)",
            a.sample_rate, a.display_hop, a.frame_rate
        )?;
        if let Some(range) = &a.preferred_range {
            writeln!(
                f,
                "Prefers  : [{:.2} … {:.2}] BPM (normalization={})",
                range.min_bpm,
                range.max_bpm,
                if a.normalize_octave { "on" } else { "off" }
            )?;
        }

        let candidates: Vec<String> = a.candidates.iter().map(|c| format!("{:.2}", c)).collect();
        writeln!(f, "Candidates (BPM): [{}]", candidates.join(", "))?;

        match a.aggregate {
            Some(value) => writeln!(f, "Aggregate ({}): {:.2} BPM", a.aggregate_mode.name(), value)?,
            None => writeln!(f, "Aggregate ({}): n/a", a.aggregate_mode.name())?,
        }

        write!(f, "Picked   : {:.2} BPM", a.picked_bpm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis() -> TempoAnalysis {
        TempoAnalysis {
            candidates: vec![118.2, 119.0, 236.4, 120.1, 119.5],
            aggregate_mode: AggregateMode::Median,
            aggregate: Some(119.5),
            picked_bpm: 119.5,
            raw_picked_bpm: 119.5,
            sample_rate: 44100,
            display_hop: 512,
            frame_rate: 86.132_81,
            preferred_range: None,
            normalize_octave: true,
            used_fallback: false,
            duration_seconds: 30.0,
            processing_time_ms: 12.0,
        }
    }

    #[test]
    fn test_report_lines() {
        let report = TempoReport {
            path: PathBuf::from("/music/track.wav"),
            analysis: analysis(),
        };
        let text = report.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "File     : /music/track.wav",
                "SR/HL    : 44100 / 512  (frame_rate ≈ 86.13 Hz)",
                "Candidates (BPM): [118.20, 119.00, 236.40, 120.10, 119.50]",
                "Aggregate (median): 119.50 BPM",
                "Picked   : 119.50 BPM",
            ]
        );
    }

    #[test]
    fn test_report_with_range_and_unknown_tempo() {
        let mut a = analysis();
        a.candidates.clear();
        a.aggregate = Some(0.0);
        a.picked_bpm = 0.0;
        a.preferred_range = Some(PreferredRange::new(85.0, 95.0).unwrap());
        a.normalize_octave = false;
        let text = TempoReport {
            path: PathBuf::from("silence.wav"),
            analysis: a,
        }
        .to_string();

        assert!(text.contains("Prefers  : [85.00 … 95.00] BPM (normalization=off)"));
        assert!(text.contains("Candidates (BPM): []"));
        assert!(text.contains("Aggregate (median): 0.00 BPM"));
        assert!(text.ends_with("Picked   : 0.00 BPM"));
    }

    #[test]
    fn test_aggregate_none_prints_na() {
        let mut a = analysis();
        a.aggregate_mode = AggregateMode::None;
        a.aggregate = None;
        let text = TempoReport {
            path: PathBuf::from("x.wav"),
            analysis: a,
        }
        .to_string();
        assert!(text.contains("Aggregate (none): n/a"));
    }

    #[test]
    fn test_json_serialization() {
        let report = TempoReport {
            path: PathBuf::from("x.wav"),
            analysis: analysis(),
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"aggregate_mode\":\"median\""));
        assert!(json.contains("\"path\":\"x.wav\""));
        let back: TempoReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.analysis.candidates, report.analysis.candidates);
    }

    #[test]
    fn test_json_omits_processing_time() {
        let mut slow = analysis();
        slow.processing_time_ms = 312.3;
        let mut fast = analysis();
        fast.processing_time_ms = 8.1;

        let a = serde_json::to_string(&slow).unwrap();
        let b = serde_json::to_string(&fast).unwrap();
        assert!(!a.contains("processing_time_ms"));
        assert_eq!(a, b);

        let back: TempoAnalysis = serde_json::from_str(&a).unwrap();
        assert_eq!(back.processing_time_ms, 0.0);
    }
}
