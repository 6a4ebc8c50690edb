//! Preferred-range tempo prior
//!
//! Weights a strength profile with a Gaussian centered on the preferred range
//! and picks the strongest tempo.

use crate::config::PreferredRange;
use crate::features::period::peak_picking::parabolic_offset;
use crate::features::period::tempogram_autocorr::MIN_PERIODIC_STRENGTH;
use crate::features::period::StrengthProfile;

/// Relative distance within which a pooled candidate supports a tempo
const AGREEMENT_TOLERANCE: f32 = 0.03;

/// Profile support a half/double-time level needs, relative to the pick
const METRICAL_SUPPORT_RATIO: f32 = 0.5;

/// Metrical levels checked against the pick
const METRICAL_FACTORS: [f32; 2] = [2.0, 0.5];

/// Default prior width: half the range, never below 1 BPM
pub fn default_sigma(range: &PreferredRange) -> f32 {
    ((range.max_bpm - range.min_bpm) / 2.0).max(1.0)
}

/// Gaussian weight `exp(-0.5 * ((bpm - center) / sigma)²)`
pub fn gaussian_weight(bpm: f32, center: f32, sigma: f32) -> f32 {
    let z = (bpm - center) / sigma;
    (-0.5 * z * z).exp()
}

/// Multiply a Gaussian prior into the profile strengths
///
/// # Arguments
///
/// * `profile` - Strength profile to weight in place
/// * `range` - Preferred range; `None` leaves the profile unchanged
/// * `sigma` - Explicit prior width, otherwise [`default_sigma`]
pub fn apply_prior(profile: &mut StrengthProfile, range: Option<&PreferredRange>, sigma: Option<f32>) {
    let Some(range) = range else {
        return;
    };
    let center = range.center();
    let sigma = sigma.unwrap_or_else(|| default_sigma(range));

    log::debug!(
        "Applying tempo prior: center {:.2} BPM, sigma {:.2}",
        center,
        sigma
    );

    for (strength, &bpm) in profile.strengths.iter_mut().zip(profile.bpms.iter()) {
        *strength *= gaussian_weight(bpm, center, sigma);
    }
}

/// Index of the strongest bin, ties to the first (slowest)
fn strongest_bin(profile: &StrengthProfile) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &strength) in profile.strengths.iter().enumerate() {
        if strength >= MIN_PERIODIC_STRENGTH && best.map_or(true, |(_, s)| strength > s) {
            best = Some((i, strength));
        }
    }
    best.map(|(i, _)| i)
}

/// BPM of bin `index` moved towards its vertex by parabolic interpolation
///
/// Adjacent bins are adjacent lags and the period `1/bpm` is linear in lag,
/// so the offset is applied to the period.
fn refined_bpm(profile: &StrengthProfile, index: usize) -> f32 {
    let bpm = profile.bpms[index];
    let offset = parabolic_offset(&profile.strengths, index);
    let neighbour = if offset > 0.0 {
        index + 1
    } else if offset < 0.0 {
        index - 1
    } else {
        return bpm;
    };

    let period = 1.0 / bpm;
    let refined = 1.0 / (period + offset.abs() * (1.0 / profile.bpms[neighbour] - period));
    if refined.is_finite() && refined > 0.0 {
        refined
    } else {
        bpm
    }
}

/// BPM with the highest strength
///
/// Ties go to the first (slowest) bin; the winner is refined between bins by
/// parabolic interpolation. Returns `None` for an empty profile or one whose
/// strengths all stay below [`MIN_PERIODIC_STRENGTH`].
pub fn pick_tempo(profile: &StrengthProfile) -> Option<f32> {
    strongest_bin(profile).map(|i| refined_bpm(profile, i))
}

/// Profile strength around `bpm`: the sum of the two bins bracketing it
///
/// A period that falls between two lags splits its energy over both, so a
/// single bin under-reports it.
fn support(profile: &StrengthProfile, bpm: f32) -> f32 {
    let upper = profile.bpms.partition_point(|&b| b < bpm);
    match profile.bpms.get(upper) {
        None => 0.0,
        Some(&b) if b == bpm => profile.strengths[upper],
        Some(_) if upper == 0 => 0.0,
        Some(_) => profile.strengths[upper - 1] + profile.strengths[upper],
    }
}

fn agreeing(candidates: &[f32], bpm: f32) -> usize {
    candidates
        .iter()
        .filter(|&&c| (c - bpm).abs() <= AGREEMENT_TOLERANCE * bpm)
        .count()
}

/// Move the pick to double or half time when the pooled candidates say so
///
/// The pick changes only when more pooled candidates agree with the other
/// metrical level than with the pick itself and the (prior-weighted) profile
/// still supports that level with at least half the pick's strength. The
/// finer hop lengths resolve periods that land between two lags at the
/// display hop, where the pick alone would fall an octave low.
pub fn resolve_metrical_level(profile: &StrengthProfile, picked: f32, candidates: &[f32]) -> f32 {
    if picked <= 0.0 || candidates.is_empty() {
        return picked;
    }

    let own_votes = agreeing(candidates, picked);
    let own_support = support(profile, picked);

    for factor in METRICAL_FACTORS {
        let level = picked * factor;
        let votes = agreeing(candidates, level);
        let level_support = support(profile, level);
        if votes > own_votes && level_support >= METRICAL_SUPPORT_RATIO * own_support {
            log::debug!(
                "Metrical level: {:.2} -> {:.2} BPM (votes {} vs {}, support {:.3} vs {:.3})",
                picked,
                level,
                votes,
                own_votes,
                level_support,
                own_support
            );
            return level;
        }
    }

    picked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(bpms: &[f32], strengths: &[f32]) -> StrengthProfile {
        StrengthProfile {
            bpms: bpms.to_vec(),
            strengths: strengths.to_vec(),
        }
    }

    #[test]
    fn test_default_sigma() {
        let range = PreferredRange::new(85.0, 95.0).unwrap();
        assert_eq!(default_sigma(&range), 5.0);
        let narrow = PreferredRange::new(120.0, 121.0).unwrap();
        assert_eq!(default_sigma(&narrow), 1.0);
    }

    #[test]
    fn test_prior_moves_pick_into_range() {
        let mut p = profile(&[60.0, 90.0, 120.0], &[0.4, 0.5, 1.0]);
        assert_eq!(pick_tempo(&p), Some(120.0));

        let range = PreferredRange::new(80.0, 100.0).unwrap();
        apply_prior(&mut p, Some(&range), None);
        let picked = pick_tempo(&p).unwrap();
        assert!((picked - 90.0).abs() < 0.5, "picked {}", picked);
        // Center weight is exactly 1
        assert!((p.strengths[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_no_range_is_noop() {
        let mut p = profile(&[60.0, 120.0], &[0.3, 0.7]);
        let before = p.clone();
        apply_prior(&mut p, None, Some(3.0));
        assert_eq!(p, before);
    }

    #[test]
    fn test_pick_ties_and_empty() {
        let p = profile(&[100.0, 110.0, 120.0, 130.0], &[0.5, 0.9, 0.5, 0.9]);
        assert_eq!(pick_tempo(&p), Some(110.0));
        assert_eq!(pick_tempo(&StrengthProfile::default()), None);
        assert_eq!(pick_tempo(&profile(&[100.0], &[0.0])), None);
    }

    #[test]
    fn test_round_off_is_not_a_tempo() {
        let p = profile(&[60.0, 90.0, 120.0], &[2e-9, 6e-9, 1e-9]);
        assert_eq!(pick_tempo(&p), None);
    }

    #[test]
    fn test_pick_refined_towards_stronger_neighbour() {
        // Bins at lags 22, 21, 20 (22050 Hz, hop 512)
        let bpms = [117.45, 123.05, 129.2];
        let picked = pick_tempo(&profile(&bpms, &[0.8, 0.82, 0.1])).unwrap();
        assert!(picked > 117.45 && picked < 123.05, "picked {}", picked);
        assert!(picked < 120.5);
    }

    #[test]
    fn test_split_double_time_wins_with_pool_agreement() {
        // 120 BPM at 22050 / 512 falls between lags 21 and 22; lag 43 is sharp
        let p = profile(
            &[60.09, 61.52, 117.45, 123.05],
            &[0.88, 0.05, 0.47, 0.45],
        );
        let picked = pick_tempo(&p).unwrap();
        assert!((picked - 60.09).abs() < 0.5);

        let pool = [120.08, 119.61, 60.04, 40.04, 118.47];
        let resolved = resolve_metrical_level(&p, picked, &pool);
        assert!((resolved - 120.0).abs() < 1.5, "resolved {}", resolved);
    }

    #[test]
    fn test_metrical_level_needs_profile_support() {
        // Prior has suppressed the double-time bins
        let p = profile(&[60.09, 61.52, 117.45, 123.05], &[0.88, 0.05, 1e-6, 1e-6]);
        let pool = [120.08, 119.61, 118.47];
        assert_eq!(resolve_metrical_level(&p, 60.09, &pool), 60.09);
    }

    #[test]
    fn test_support_outside_profile_is_zero() {
        let p = profile(&[60.0, 120.0], &[0.7, 1.0]);
        assert_eq!(support(&p, 30.0), 0.0);
        assert_eq!(support(&p, 240.0), 0.0);
        assert_eq!(support(&p, 120.0), 1.0);
        assert!((support(&p, 90.0) - 1.7).abs() < 1e-6);
    }

    #[test]
    fn test_metrical_level_keeps_agreed_pick() {
        let p = profile(&[60.0, 120.0, 240.0], &[0.7, 1.0, 0.6]);
        let pool = [120.2, 119.8, 240.1, 120.0];
        assert_eq!(resolve_metrical_level(&p, 120.0, &pool), 120.0);
        assert_eq!(resolve_metrical_level(&p, 120.0, &[]), 120.0);
    }

    #[test]
    fn test_gaussian_weight() {
        assert_eq!(gaussian_weight(90.0, 90.0, 5.0), 1.0);
        assert!((gaussian_weight(95.0, 90.0, 5.0) - (-0.5f32).exp()).abs() < 1e-6);
    }
}
