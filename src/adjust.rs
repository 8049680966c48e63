//! Color adjustment values and their normalization.
//!
//! User input arrives as free text or raw numbers and is clamped into the
//! valid domain of each channel before any pixel is touched.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Valid saturation domain (1.0 is neutral).
pub const SATURATION_RANGE: (f64, f64) = (0.0, 2.0);
/// Valid brightness domain (0.0 is neutral).
pub const BRIGHTNESS_RANGE: (f64, f64) = (-1.0, 1.0);
/// Valid contrast domain (1.0 is neutral).
pub const CONTRAST_RANGE: (f64, f64) = (0.0, 2.0);

/// Color adjustment values on the application-facing scale.
///
/// Values built through [`normalize`] (or any constructor on this type) are
/// always inside their valid domains:
///
/// | Field        | Domain    | Neutral |
/// |--------------|-----------|---------|
/// | `saturation` | `[0, 2]`  | `1`     |
/// | `brightness` | `[-1, 1]` | `0`     |
/// | `contrast`   | `[0, 2]`  | `1`     |
///
/// # Example
///
/// ```rust
/// use imageprep::adjust::normalize;
///
/// let adj = normalize(3.5, -2.0, 1.2);
/// assert_eq!(adj.saturation, 2.0);
/// assert_eq!(adj.brightness, -1.0);
/// assert_eq!(adj.contrast, 1.2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Adjustments {
    pub saturation: f64,
    pub brightness: f64,
    pub contrast: f64,
}

impl Default for Adjustments {
    fn default() -> Self {
        Self::identity()
    }
}

impl Adjustments {
    /// The no-op adjustment set (1, 0, 1).
    pub const fn identity() -> Self {
        Self {
            saturation: 1.0,
            brightness: 0.0,
            contrast: 1.0,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Build adjustments from free-text user input.
    ///
    /// Missing or unparseable values fall back to the neutral value of that
    /// channel; the result is then clamped like [`normalize`].
    pub fn from_inputs(
        saturation: Option<&str>,
        brightness: Option<&str>,
        contrast: Option<&str>,
    ) -> Self {
        Self::identity().with_inputs(saturation, brightness, contrast)
    }

    /// Override channels from free-text user input.
    ///
    /// Missing or unparseable values keep this set's value for that channel.
    pub fn with_inputs(
        self,
        saturation: Option<&str>,
        brightness: Option<&str>,
        contrast: Option<&str>,
    ) -> Self {
        normalize(
            parse_or(saturation, "saturation", self.saturation),
            parse_or(brightness, "brightness", self.brightness),
            parse_or(contrast, "contrast", self.contrast),
        )
    }

    /// Draw a random adjustment set, each value rounded to two decimals.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let saturation = round2(rng.gen_range(SATURATION_RANGE.0..SATURATION_RANGE.1));
        let brightness = round2(rng.gen_range(BRIGHTNESS_RANGE.0..BRIGHTNESS_RANGE.1));
        let contrast = round2(rng.gen_range(CONTRAST_RANGE.0..CONTRAST_RANGE.1));
        normalize(saturation, brightness, contrast)
    }
}

/// Clamp raw adjustment inputs into their valid domains.
///
/// NaN is treated as a missing value and replaced with the neutral value.
pub fn normalize(saturation: f64, brightness: f64, contrast: f64) -> Adjustments {
    let neutral = Adjustments::identity();
    Adjustments {
        saturation: clamp_or(saturation, SATURATION_RANGE, neutral.saturation),
        brightness: clamp_or(brightness, BRIGHTNESS_RANGE, neutral.brightness),
        contrast: clamp_or(contrast, CONTRAST_RANGE, neutral.contrast),
    }
}

fn clamp_or(value: f64, (min, max): (f64, f64), fallback: f64) -> f64 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}

fn parse_or(input: Option<&str>, name: &str, fallback: f64) -> f64 {
    let Some(raw) = input.map(str::trim).filter(|s| !s.is_empty()) else {
        return fallback;
    };
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            log::warn!("Ignoring unparseable {name} value {raw:?}, using {fallback}");
            fallback
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    // ── normalize ────────────────────────────────────────────────────

    #[test]
    fn normalize_clamps_out_of_range() {
        let adj = normalize(-1.0, 4.0, 9.0);
        assert_eq!(adj.saturation, 0.0);
        assert_eq!(adj.brightness, 1.0);
        assert_eq!(adj.contrast, 2.0);

        let adj = normalize(2.5, -3.0, -0.5);
        assert_eq!(adj.saturation, 2.0);
        assert_eq!(adj.brightness, -1.0);
        assert_eq!(adj.contrast, 0.0);
    }

    #[test]
    fn normalize_keeps_in_range_values() {
        let adj = normalize(0.4, -0.25, 1.75);
        assert_eq!(adj, Adjustments { saturation: 0.4, brightness: -0.25, contrast: 1.75 });
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = [
            (-5.0, 5.0, 0.3),
            (1.0, 0.0, 1.0),
            (2.0001, -1.0001, 7.0),
            (0.7, 0.2, 1.9),
        ];
        for (s, b, c) in inputs {
            let once = normalize(s, b, c);
            let twice = normalize(once.saturation, once.brightness, once.contrast);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn normalize_nan_falls_back_to_identity() {
        let adj = normalize(f64::NAN, f64::NAN, f64::NAN);
        assert!(adj.is_identity());
    }

    #[test]
    fn normalize_infinite_values_clamp() {
        let adj = normalize(f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY);
        assert_eq!(adj, Adjustments { saturation: 2.0, brightness: -1.0, contrast: 2.0 });
    }

    // ── from_inputs ──────────────────────────────────────────────────

    #[test]
    fn from_inputs_defaults_missing_values() {
        assert!(Adjustments::from_inputs(None, None, None).is_identity());
        assert!(Adjustments::from_inputs(Some(""), Some("  "), None).is_identity());
    }

    #[test]
    fn from_inputs_defaults_unparseable_values() {
        let adj = Adjustments::from_inputs(Some("lots"), Some("0.1"), Some("1.2x"));
        assert_eq!(adj.saturation, 1.0);
        assert_eq!(adj.brightness, 0.1);
        assert_eq!(adj.contrast, 1.0);
    }

    #[test]
    fn with_inputs_keeps_base_for_missing_and_bad_values() {
        let base = normalize(1.4, -0.2, 0.8);
        let adj = base.with_inputs(None, Some("oops"), Some("1.1"));
        assert_eq!(adj, Adjustments { saturation: 1.4, brightness: -0.2, contrast: 1.1 });
        assert_eq!(base.with_inputs(Some("-0.5"), None, None).saturation, 0.0);
    }

    #[test]
    fn from_inputs_clamps_parsed_values() {
        let adj = Adjustments::from_inputs(Some("3"), Some("-7"), Some(" 1.5 "));
        assert_eq!(adj, Adjustments { saturation: 2.0, brightness: -1.0, contrast: 1.5 });
    }

    // ── random ───────────────────────────────────────────────────────

    #[test]
    fn random_values_are_in_range_and_rounded() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let adj = Adjustments::random(&mut rng);
            assert!((0.0..=2.0).contains(&adj.saturation));
            assert!((-1.0..=1.0).contains(&adj.brightness));
            assert!((0.0..=2.0).contains(&adj.contrast));
            for v in [adj.saturation, adj.brightness, adj.contrast] {
                assert!(((v * 100.0).round() - v * 100.0).abs() < 1e-6, "{v} not rounded");
            }
        }
    }

    #[test]
    fn random_is_reproducible_with_seed() {
        let a = Adjustments::random(&mut StdRng::seed_from_u64(42));
        let b = Adjustments::random(&mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}
