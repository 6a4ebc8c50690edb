//! Non-finite value replacement
//!
//! NaN and infinities are replaced with zero wherever they show up
//! (waveform, onset envelope, tempogram) so they never propagate.

use crate::error::AnalysisError;

/// Replace non-finite values with 0.0 in place
///
/// # Returns
///
/// Number of values replaced
pub fn sanitize_in_place(values: &mut [f32]) -> usize {
    let mut replaced = 0;
    for v in values.iter_mut() {
        if !v.is_finite() {
            *v = 0.0;
            replaced += 1;
        }
    }
    replaced
}

/// Sanitize and log a warning naming the stage when anything was replaced
///
/// # Returns
///
/// The recovered `AnalysisError::NumericInstability`, if any value was replaced
pub fn sanitize_logged(values: &mut [f32], stage: &str) -> Option<AnalysisError> {
    let replaced = sanitize_in_place(values);
    if replaced == 0 {
        return None;
    }
    let err = AnalysisError::NumericInstability(format!(
        "replaced {} non-finite value(s) with 0.0 in {}",
        replaced, stage
    ));
    log::warn!("{} (recovered)", err);
    Some(err)
}
