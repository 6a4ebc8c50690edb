//! Candidate aggregation and rounding

use crate::config::AggregateMode;

/// Round to two decimals
pub fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

/// Median with the mean of the two middle values for even counts
fn median(values: &[f32]) -> f32 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Aggregate candidate BPMs
///
/// # Returns
///
/// * `None` for [`AggregateMode::None`]
/// * `Some(0.0)` for an empty candidate list
/// * otherwise the median or mean, rounded to two decimals
pub fn aggregate(values: &[f32], mode: AggregateMode) -> Option<f32> {
    let value = match mode {
        AggregateMode::None => return None,
        _ if values.is_empty() => 0.0,
        AggregateMode::Median => median(values),
        AggregateMode::Mean => values.iter().sum::<f32>() / values.len() as f32,
    };
    Some(round2(value))
}

/// Round candidates, drop non-positive or non-finite ones, and optionally
/// pad up to `n_candidates` with the aggregate
///
/// # Returns
///
/// Tuple of (reported candidates, aggregate)
pub fn finalize_candidates(
    candidates: &[f32],
    mode: AggregateMode,
    n_candidates: usize,
    pad: bool,
) -> (Vec<f32>, Option<f32>) {
    let mut clean: Vec<f32> = candidates
        .iter()
        .filter(|c| c.is_finite() && **c > 0.0)
        .map(|&c| round2(c))
        .collect();
    let agg = aggregate(&clean, mode);

    if pad && !clean.is_empty() && clean.len() < n_candidates {
        if let Some(fill) = agg {
            clean.resize(n_candidates, fill);
        }
    }
    clean.truncate(n_candidates);

    (clean, agg)
}
