//! Octave normalization
//!
//! Folds a tempo into the preferred range by halving or doubling.

use crate::config::{PreferredRange, MAX_OCTAVE_DEPTH};

/// Fold `bpm` into `range` by powers of two
///
/// Considers `bpm * 2^k` for `k` in `-depth..=depth`. Among the values inside
/// the range (inclusive) the one nearest the range center wins, ties going to
/// the lower value. Returns `bpm` unchanged when there is no range, `bpm` is
/// not positive, or no multiple lands in the range. `depth` is capped at
/// [`MAX_OCTAVE_DEPTH`].
///
/// # Example
///
/// ```
/// use stratum_tempo::analysis::octave::normalize_octave;
/// use stratum_tempo::config::PreferredRange;
///
/// let range = PreferredRange::new(85.0, 95.0)?;
/// assert_eq!(normalize_octave(184.0, Some(&range), 3), 92.0);
/// # Ok::<(), stratum_tempo::AnalysisError>(())
/// ```
pub fn normalize_octave(bpm: f32, range: Option<&PreferredRange>, depth: u32) -> f32 {
    let Some(range) = range else {
        return bpm;
    };
    if !bpm.is_finite() || bpm <= 0.0 {
        return bpm;
    }

    let depth = depth.min(MAX_OCTAVE_DEPTH);
    let mut multiples = Vec::with_capacity(2 * depth as usize + 1);
    multiples.push(bpm);
    let (mut up, mut down) = (bpm, bpm);
    for _ in 0..depth {
        up *= 2.0;
        down /= 2.0;
        multiples.push(up);
        multiples.push(down);
    }
    multiples.sort_by(|a, b| a.total_cmp(b));

    let center = range.center();
    let mut best: Option<f32> = None;
    for &candidate in multiples.iter().filter(|&&m| range.contains(m)) {
        let closer = best.map_or(true, |b| (candidate - center).abs() < (b - center).abs());
        if closer {
            best = Some(candidate);
        }
    }

    match best {
        Some(folded) => {
            if folded != bpm {
                log::debug!("Octave normalization: {:.2} -> {:.2} BPM", bpm, folded);
            }
            folded
        }
        None => bpm,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(min: f32, max: f32) -> PreferredRange {
        PreferredRange::new(min, max).unwrap()
    }

    #[test]
    fn test_halves_into_range() {
        assert_eq!(normalize_octave(184.0, Some(&range(85.0, 95.0)), 3), 92.0);
    }

    #[test]
    fn test_doubles_into_range() {
        assert_eq!(normalize_octave(45.0, Some(&range(85.0, 95.0)), 3), 90.0);
        assert_eq!(normalize_octave(22.5, Some(&range(170.0, 190.0)), 3), 180.0);
    }

    #[test]
    fn test_noop_cases() {
        assert_eq!(normalize_octave(184.0, None, 3), 184.0);
        assert_eq!(normalize_octave(0.0, Some(&range(85.0, 95.0)), 3), 0.0);
        // 100 * 2^k never lands in [130, 140]
        assert_eq!(normalize_octave(100.0, Some(&range(130.0, 140.0)), 3), 100.0);
    }

    #[test]
    fn test_depth_limits_search() {
        // 960 needs three halvings to reach 120
        assert_eq!(normalize_octave(960.0, Some(&range(110.0, 130.0)), 2), 960.0);
        assert_eq!(normalize_octave(960.0, Some(&range(110.0, 130.0)), 3), 120.0);
    }

    #[test]
    fn test_huge_depth_is_capped() {
        assert_eq!(normalize_octave(184.0, Some(&range(85.0, 95.0)), u32::MAX), 92.0);
    }

    #[test]
    fn test_wide_range_prefers_center_then_lower() {
        // Both 80 and 160 are inside [60, 180]; center 120 is 40 away from each
        assert_eq!(normalize_octave(80.0, Some(&range(60.0, 180.0)), 3), 80.0);
        assert_eq!(normalize_octave(160.0, Some(&range(60.0, 180.0)), 3), 80.0);
        // Already inside and nearest: unchanged
        assert_eq!(normalize_octave(128.0, Some(&range(60.0, 180.0)), 3), 128.0);
    }
}
