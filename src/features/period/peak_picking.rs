//! Peak detection utilities
//!
//! Finds local maxima in lag-strength curves and refines their position
//! between samples.

use std::ops::Range;

const EPSILON: f32 = 1e-10;

/// Find interior local maxima within an index window
///
/// An index `i` is a peak when `signal[i] > signal[i - 1]` and
/// `signal[i] >= signal[i + 1]` (the left edge of a plateau wins). The
/// first and last samples of `signal` can never be peaks, so a window
/// boundary does not create artificial maxima.
///
/// # Arguments
///
/// * `signal` - Signal to search
/// * `window` - Index range to report peaks from (clamped to the signal)
/// * `threshold` - Minimum peak height, relative to the window maximum (0.0-1.0)
///
/// # Returns
///
/// Vector of (index, value) pairs sorted by value (highest first), ties by
/// ascending index
///
/// # Example
///
/// ```
/// use stratum_tempo::features::period::peak_picking::find_peaks;
///
/// let signal = vec![0.0, 0.5, 1.0, 0.7, 0.3, 0.9, 0.2];
/// let peaks = find_peaks(&signal, 0..signal.len(), 0.5);
/// assert_eq!(peaks[0].0, 2);
/// assert_eq!(peaks[1].0, 5);
/// ```
pub fn find_peaks(signal: &[f32], window: Range<usize>, threshold: f32) -> Vec<(usize, f32)> {
    if signal.len() < 3 {
        // Need at least 3 points for local maximum detection
        return vec![];
    }

    let start = window.start.max(1);
    let end = window.end.min(signal.len() - 1);
    if start >= end {
        return vec![];
    }

    let max_value = signal[start..end].iter().copied().fold(0.0f32, f32::max);
    if max_value < EPSILON {
        return vec![];
    }
    let min_height = max_value * threshold.clamp(0.0, 1.0);

    let mut peaks: Vec<(usize, f32)> = (start..end)
        .filter(|&i| {
            let v = signal[i];
            v > signal[i - 1] && v >= signal[i + 1] && v >= min_height && v > EPSILON
        })
        .map(|i| (i, signal[i]))
        .collect();

    peaks.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    log::debug!(
        "Found {} peaks in [{}, {}) (threshold {:.3})",
        peaks.len(),
        start,
        end,
        min_height
    );

    peaks
}

/// Sub-sample offset of a peak by parabolic interpolation
///
/// Fits a parabola through `(i-1, i, i+1)` and returns the vertex offset in
/// `[-0.5, 0.5]`. Returns 0.0 at the signal edges or for flat neighbourhoods.
pub fn parabolic_offset(signal: &[f32], index: usize) -> f32 {
    if index == 0 || index + 1 >= signal.len() {
        return 0.0;
    }
    let (y0, y1, y2) = (signal[index - 1], signal[index], signal[index + 1]);
    let denom = y0 - 2.0 * y1 + y2;
    if denom.abs() < EPSILON {
        return 0.0;
    }
    (0.5 * (y0 - y2) / denom).clamp(-0.5, 0.5)
}
