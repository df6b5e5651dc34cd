//! Lane hit judgement for rhythm-style input
//!
//! A lane press picks the live entity in that lane closest to the hit line
//! and grades the distance against ordered windows. A press with nothing in
//! range is not a miss; misses come only from [`crossed_unconsumed`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HitQuality {
    Perfect,
    Good,
    Ok,
    Miss,
}

impl HitQuality {
    pub fn label(self) -> &'static str {
        match self {
            HitQuality::Perfect => "PERFECT!",
            HitQuality::Good => "GOOD",
            HitQuality::Ok => "OK",
            HitQuality::Miss => "MISS",
        }
    }
}

/// Inclusive distance thresholds, perfect <= good <= ok
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitWindows {
    pub perfect: f32,
    pub good: f32,
    pub ok: f32,
}

impl HitWindows {
    /// Windows as fractions of the playfield height
    pub fn scaled(height: f32, perfect: f32, good: f32, ok: f32) -> Self {
        Self {
            perfect: height * perfect,
            good: height * good,
            ok: height * ok,
        }
    }

    /// Grade a distance. `None` means out of range.
    pub fn classify(&self, distance: f32) -> Option<HitQuality> {
        let d = distance.abs();
        if d <= self.perfect {
            Some(HitQuality::Perfect)
        } else if d <= self.good {
            Some(HitQuality::Good)
        } else if d <= self.ok {
            Some(HitQuality::Ok)
        } else {
            None
        }
    }
}

/// Closest entity to `hit_line` among those in `lane`.
///
/// Items are `(key, lane, position)`. Ties keep the first one seen.
pub fn nearest_in_lane<K>(
    items: impl IntoIterator<Item = (K, usize, f32)>,
    lane: usize,
    hit_line: f32,
) -> Option<(K, f32)> {
    let mut best: Option<(K, f32)> = None;
    for (key, item_lane, pos) in items {
        if item_lane != lane {
            continue;
        }
        let dist = (pos - hit_line).abs();
        if best.as_ref().is_none_or(|(_, d)| dist < *d) {
            best = Some((key, dist));
        }
    }
    best
}

/// Nearest-in-lane plus grading in one step
pub fn judge<K>(
    items: impl IntoIterator<Item = (K, usize, f32)>,
    lane: usize,
    hit_line: f32,
    windows: &HitWindows,
) -> Option<(K, HitQuality)> {
    let (key, dist) = nearest_in_lane(items, lane, hit_line)?;
    windows.classify(dist).map(|q| (key, q))
}

/// True once an unconsumed entity has passed the line by more than `grace`
pub fn crossed_unconsumed(pos: f32, hit_line: f32, grace: f32) -> bool {
    pos > hit_line + grace
}

#[cfg(test)]
mod tests {
    use super::*;

    fn windows() -> HitWindows {
        HitWindows {
            perfect: 5.0,
            good: 10.0,
            ok: 20.0,
        }
    }

    #[test]
    fn test_classify_smallest_window_wins() {
        let w = windows();
        assert_eq!(w.classify(0.0), Some(HitQuality::Perfect));
        assert_eq!(w.classify(5.0), Some(HitQuality::Perfect));
        assert_eq!(w.classify(-7.0), Some(HitQuality::Good));
        assert_eq!(w.classify(20.0), Some(HitQuality::Ok));
        assert_eq!(w.classify(20.5), None);
    }

    #[test]
    fn test_nearest_ignores_other_lanes() {
        let items = vec![(1, 0, 99.0), (2, 1, 100.0), (3, 0, 130.0)];
        let (key, dist) = nearest_in_lane(items, 0, 100.0).unwrap();
        assert_eq!(key, 1);
        assert_eq!(dist, 1.0);
    }

    #[test]
    fn test_empty_lane_is_no_hit() {
        let items = vec![(1, 2, 100.0)];
        assert!(judge(items, 0, 100.0, &windows()).is_none());
    }

    #[test]
    fn test_out_of_range_is_no_hit() {
        let items = vec![(1, 0, 40.0)];
        assert!(judge(items, 0, 100.0, &windows()).is_none());
    }

    #[test]
    fn test_tie_keeps_first() {
        let items = vec![(1, 0, 95.0), (2, 0, 105.0)];
        assert_eq!(judge(items, 0, 100.0, &windows()), Some((1, HitQuality::Perfect)));
    }

    #[test]
    fn test_crossed_unconsumed() {
        assert!(!crossed_unconsumed(110.0, 100.0, 15.0));
        assert!(crossed_unconsumed(116.0, 100.0, 15.0));
    }
}
