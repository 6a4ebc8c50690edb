//! Audio preprocessing modules
//!
//! This module contains utilities for preparing audio for analysis:
//! - Channel mixing (multi-channel to mono)
//! - Resampling
//! - Silence detection and trimming
//! - Non-finite value sanitization

pub mod channel_mixer;
pub mod resample;
pub mod sanitize;
pub mod silence;
