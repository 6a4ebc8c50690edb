//! Error types for the tempo estimation engine

use std::fmt;

/// Errors that can occur during tempo analysis
///
/// Callers of the top-level entry points see [`AnalysisError::LoadError`],
/// [`AnalysisError::ConfigurationError`] and, for bad sample buffers,
/// [`AnalysisError::InvalidInput`]. The numeric and sparsity variants are
/// produced by individual stages and recovered inside the pipeline, which
/// degrades to an "unknown tempo" result instead.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Input file missing, unreadable, or not decodable audio
    LoadError(String),

    /// Invalid configuration (preferred range, hop lengths, candidate count, ...)
    ConfigurationError(String),

    /// Degenerate input (silence, too short) produced no usable onset structure
    EmptyOnsetEnvelope,

    /// Non-finite values in an intermediate computation
    NumericInstability(String),

    /// Invalid arguments passed directly to a stage function
    InvalidInput(String),
}

impl AnalysisError {
    /// True for failures that are recovered locally by the pipeline
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AnalysisError::EmptyOnsetEnvelope | AnalysisError::NumericInstability(_)
        )
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::LoadError(msg) => write!(f, "Load error: {}", msg),
            AnalysisError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            AnalysisError::EmptyOnsetEnvelope => write!(f, "Onset envelope is empty"),
            AnalysisError::NumericInstability(msg) => write!(f, "Numeric instability: {}", msg),
            AnalysisError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl std::error::Error for AnalysisError {}

impl From<std::io::Error> for AnalysisError {
    fn from(err: std::io::Error) -> Self {
        AnalysisError::LoadError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_parameter() {
        let err = AnalysisError::ConfigurationError("preferred range [100, 80]".to_string());
        assert_eq!(err.to_string(), "Configuration error: preferred range [100, 80]");
    }

    #[test]
    fn test_recoverable_variants() {
        assert!(AnalysisError::EmptyOnsetEnvelope.is_recoverable());
        assert!(AnalysisError::NumericInstability("nan".to_string()).is_recoverable());
        assert!(!AnalysisError::LoadError("missing".to_string()).is_recoverable());
        assert!(!AnalysisError::ConfigurationError("bad".to_string()).is_recoverable());
    }
}
