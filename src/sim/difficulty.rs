//! Difficulty coupling
//!
//! A [`Ramp`] maps a progress value (elapsed seconds, score, level) to a
//! multiplier that never decreases and never exceeds its cap. A
//! [`DifficultyCurve`] turns two ramps into a spawn interval (shrinking,
//! floored) and an entity speed (growing, capped).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Ramp {
    /// `min(base + rate * x, cap)`
    Linear { base: f32, rate: f32, cap: f32 },
    /// `min(base + floor(x / step) * increment, cap)`
    Stepwise {
        base: f32,
        step: f32,
        increment: f32,
        cap: f32,
    },
}

impl Ramp {
    pub const fn flat(value: f32) -> Self {
        Ramp::Linear {
            base: value,
            rate: 0.0,
            cap: value,
        }
    }

    /// Value at progress `x`. Negative progress reads as zero.
    pub fn at(&self, x: f32) -> f32 {
        let x = if x.is_finite() { x.max(0.0) } else { 0.0 };
        match *self {
            Ramp::Linear { base, rate, cap } => (base + rate.max(0.0) * x).min(cap.max(base)),
            Ramp::Stepwise {
                base,
                step,
                increment,
                cap,
            } => {
                let steps = if step > 0.0 { (x / step).floor() } else { 0.0 };
                (base + steps * increment.max(0.0)).min(cap.max(base))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyCurve {
    /// Divides the base spawn interval
    pub pace: Ramp,
    /// Multiplies the base speed
    pub speed_ramp: Ramp,
    pub base_interval: f32,
    pub min_interval: f32,
    pub base_speed: f32,
    pub max_speed: f32,
}

impl DifficultyCurve {
    pub fn spawn_interval(&self, x: f32) -> f32 {
        let pace = self.pace.at(x).max(f32::EPSILON);
        (self.base_interval / pace).max(self.min_interval)
    }

    pub fn speed(&self, x: f32) -> f32 {
        (self.base_speed * self.speed_ramp.at(x)).min(self.max_speed)
    }

    /// Normalised difficulty in `0..=1` (how far the pace ramp has climbed)
    pub fn factor(&self, x: f32) -> f32 {
        let start = self.pace.at(0.0);
        let end = match self.pace {
            Ramp::Linear { base, cap, .. } | Ramp::Stepwise { base, cap, .. } => cap.max(base),
        };
        if end <= start {
            0.0
        } else {
            ((self.pace.at(x) - start) / (end - start)).clamp(0.0, 1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_stepwise_matches_snake_speedup() {
        // 120ms, 5ms faster every 8 points, floor 60ms
        let curve = DifficultyCurve {
            pace: Ramp::flat(1.0),
            speed_ramp: Ramp::flat(1.0),
            base_interval: 120.0,
            min_interval: 60.0,
            base_speed: 1.0,
            max_speed: 1.0,
        };
        assert_eq!(curve.spawn_interval(100.0), 120.0);

        let step = Ramp::Stepwise {
            base: 0.0,
            step: 8.0,
            increment: 5.0,
            cap: 60.0,
        };
        assert_eq!(step.at(7.0), 0.0);
        assert_eq!(step.at(8.0), 5.0);
        assert_eq!(step.at(1000.0), 60.0);
    }

    #[test]
    fn test_linear_bpm_ramp_caps() {
        let bpm = Ramp::Linear {
            base: 80.0,
            rate: 0.3,
            cap: 200.0,
        };
        assert_eq!(bpm.at(0.0), 80.0);
        assert!((bpm.at(100.0) - 110.0).abs() < 1e-4);
        assert_eq!(bpm.at(10_000.0), 200.0);
    }

    fn ramp() -> impl Strategy<Value = Ramp> {
        prop_oneof![
            (0.1f32..5.0, -1.0f32..1.0, 0.1f32..10.0)
                .prop_map(|(base, rate, cap)| Ramp::Linear { base, rate, cap }),
            (0.1f32..5.0, -5.0f32..50.0, -1.0f32..1.0, 0.1f32..10.0).prop_map(
                |(base, step, increment, cap)| Ramp::Stepwise {
                    base,
                    step,
                    increment,
                    cap
                }
            ),
        ]
    }

    proptest! {
        #[test]
        fn prop_difficulty_monotonic(
            pace in ramp(),
            speed_ramp in ramp(),
            a in 0.0f32..10_000.0,
            b in 0.0f32..10_000.0,
        ) {
            let curve = DifficultyCurve {
                pace,
                speed_ramp,
                base_interval: 1000.0,
                min_interval: 150.0,
                base_speed: 100.0,
                max_speed: 400.0,
            };
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(curve.spawn_interval(hi) <= curve.spawn_interval(lo));
            prop_assert!(curve.speed(hi) >= curve.speed(lo));
            prop_assert!(curve.spawn_interval(hi) >= 150.0);
            prop_assert!(curve.speed(hi) <= 400.0);
        }
    }
}
