//! Feature extraction modules
//!
//! This module contains the tempo feature pipeline:
//! - STFT / ISTFT
//! - Onset strength (HPSS + spectral flux)
//! - Period estimation (tempogram, candidates)

pub mod onset;
pub mod period;
pub mod spectrogram;
