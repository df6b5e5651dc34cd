//! Spawn timing and lane selection

use serde::{Deserialize, Serialize};

/// Accumulating spawn timer
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Spawner {
    timer: f32,
}

impl Spawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate `dt`; when it passes `interval`, reset and return true.
    ///
    /// At most one spawn per call. A missed spawn is not queued.
    pub fn try_spawn(&mut self, dt: f32, interval: f32) -> bool {
        self.timer += dt;
        if self.timer >= interval {
            self.timer = 0.0;
            true
        } else {
            false
        }
    }

    pub fn elapsed(&self) -> f32 {
        self.timer
    }

    pub fn reset(&mut self) {
        self.timer = 0.0;
    }
}

/// Round-robin lane choice starting at `start`.
///
/// Each lane is tried once; returns `None` when every lane is congested.
pub fn pick_lane(start: usize, lanes: usize, congested: impl Fn(usize) -> bool) -> Option<usize> {
    if lanes == 0 {
        return None;
    }
    (0..lanes)
        .map(|offset| (start + offset) % lanes)
        .find(|&lane| !congested(lane))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_spawn_resets_timer() {
        let mut spawner = Spawner::new();
        assert!(!spawner.try_spawn(0.3, 1.0));
        assert!(!spawner.try_spawn(0.3, 1.0));
        assert!(!spawner.try_spawn(0.3, 1.0));
        assert!(spawner.try_spawn(0.3, 1.0));
        assert_eq!(spawner.elapsed(), 0.0);
    }

    #[test]
    fn test_no_backlog_after_long_gap() {
        let mut spawner = Spawner::new();
        assert!(spawner.try_spawn(10.0, 1.0));
        assert!(!spawner.try_spawn(0.1, 1.0));
    }

    #[test]
    fn test_pick_lane_skips_congested() {
        assert_eq!(pick_lane(1, 4, |lane| lane == 1), Some(2));
        assert_eq!(pick_lane(3, 4, |lane| lane == 3), Some(0));
        assert_eq!(pick_lane(2, 4, |_| false), Some(2));
    }

    #[test]
    fn test_pick_lane_gives_up_after_one_round() {
        use std::cell::Cell;
        let tries = Cell::new(0);
        let lane = pick_lane(0, 4, |_| {
            tries.set(tries.get() + 1);
            true
        });
        assert_eq!(lane, None);
        assert_eq!(tries.get(), 4);
        assert_eq!(pick_lane(0, 0, |_| false), None);
    }
}
