use helpers::general::{inv_lerp, lerp};
use serde::Deserialize;

const MIN_CURVE_RANGE: f64 = 1e-4;

/// * `max_boost_early` - (m/s) Boost for an answer inside the early window
/// * `min_boost_late` - (m/s) Boost for an answer at or after the late clamp
/// * `early_window_m` - (m) In-segment distance up to which the maximum boost is granted
/// * `late_clamp_m` - (m) In-segment distance from which on only the minimum boost is granted
#[derive(Debug, Deserialize, Clone)]
pub struct BoostCurve {
    pub max_boost_early: f64,
    pub min_boost_late: f64,
    pub early_window_m: f64,
    pub late_clamp_m: f64,
}

impl Default for BoostCurve {
    fn default() -> Self {
        BoostCurve {
            max_boost_early: 3.0,
            min_boost_late: 0.5,
            early_window_m: 5.0,
            late_clamp_m: 40.0,
        }
    }
}

impl BoostCurve {
    /// boost returns the nominal boost for an answer given after seg_meters in the segment.
    pub fn boost(&self, seg_meters: f64) -> f64 {
        boost(
            seg_meters,
            self.early_window_m,
            self.late_clamp_m,
            self.max_boost_early,
            self.min_boost_late,
        )
    }
}

/// boost rewards early answers: max_boost up to early_window, a linear ramp down to min_boost
/// until late_clamp and min_boost afterwards.
pub fn boost(
    seg_meters: f64,
    early_window: f64,
    late_clamp: f64,
    max_boost: f64,
    min_boost: f64,
) -> f64 {
    if seg_meters <= early_window {
        max_boost
    } else if seg_meters < late_clamp {
        let t = inv_lerp(early_window, late_clamp, seg_meters, MIN_CURVE_RANGE);
        lerp(max_boost, min_boost, t)
    } else {
        min_boost
    }
}
