//! Period estimation modules
//!
//! Convert onset envelopes to tempo estimates using:
//! - FFT autocorrelation
//! - Autocorrelation tempogram and BPM strength profiles
//! - Peak picking
//! - Multi-resolution candidate pooling

pub mod autocorrelation;
pub mod multi_resolution;
pub mod peak_picking;
pub mod tempogram_autocorr;

pub use multi_resolution::{generate_candidates, CandidatePool, HopOutcome, NoCandidateReason};
pub use tempogram_autocorr::{strength_profile, ProfileAggregate, StrengthProfile, Tempogram};
