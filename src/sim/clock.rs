//! Fixed-timestep clock
//!
//! Turns the host's per-frame timestamps (milliseconds) into a whole number
//! of simulation ticks. The first frame after construction or [`FixedClock::reset`]
//! only records a baseline. A frame gap above the runaway ceiling (tab in the
//! background, debugger break) is replaced by a single tick interval instead
//! of being replayed.
//!
//! The interval may change between ticks: [`FixedClock::next_tick`] takes the
//! interval at subtraction time, so a difficulty ramp that shortens it applies
//! from the very next tick.

use crate::consts::{RUNAWAY_CEILING_MS, TICK_MS};

#[derive(Debug, Clone)]
pub struct FixedClock {
    tick_interval_ms: f64,
    runaway_ceiling_ms: f64,
    accumulated_ms: f64,
    last_timestamp: Option<f64>,
    total_ticks: u64,
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::new(TICK_MS)
    }
}

impl FixedClock {
    pub fn new(tick_interval_ms: f64) -> Self {
        Self {
            tick_interval_ms,
            runaway_ceiling_ms: RUNAWAY_CEILING_MS.max(tick_interval_ms),
            accumulated_ms: 0.0,
            last_timestamp: None,
            total_ticks: 0,
        }
    }

    /// Override the runaway ceiling (never below one tick interval)
    pub fn with_ceiling(mut self, ceiling_ms: f64) -> Self {
        self.runaway_ceiling_ms = ceiling_ms.max(self.tick_interval_ms);
        self
    }

    pub fn tick_interval_ms(&self) -> f64 {
        self.tick_interval_ms
    }

    /// Change the default interval used by [`FixedClock::advance`]
    pub fn set_tick_interval_ms(&mut self, interval_ms: f64) {
        self.tick_interval_ms = interval_ms;
        self.runaway_ceiling_ms = self.runaway_ceiling_ms.max(interval_ms);
    }

    pub fn accumulated_ms(&self) -> f64 {
        self.accumulated_ms
    }

    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Feed one frame timestamp. Returns the (clamped) delta added.
    pub fn begin_frame(&mut self, now_ms: f64) -> f64 {
        let Some(last) = self.last_timestamp.replace(now_ms) else {
            return 0.0;
        };

        let mut delta = now_ms - last;
        if !delta.is_finite() || delta < 0.0 {
            delta = 0.0;
        }
        if delta > self.runaway_ceiling_ms {
            log::debug!(
                "Frame gap {:.0}ms over {:.0}ms ceiling, simulating one tick",
                delta,
                self.runaway_ceiling_ms
            );
            delta = self.tick_interval_ms;
        }

        self.accumulated_ms += delta;
        delta
    }

    /// Take one tick of `interval_ms` out of the accumulator if available
    pub fn next_tick(&mut self, interval_ms: f64) -> bool {
        if interval_ms > 0.0 && self.accumulated_ms >= interval_ms {
            self.accumulated_ms -= interval_ms;
            self.total_ticks += 1;
            true
        } else {
            false
        }
    }

    /// Feed a timestamp and extract every whole tick at the current interval
    pub fn advance(&mut self, now_ms: f64) -> u32 {
        self.begin_frame(now_ms);
        let mut ticks = 0;
        while self.next_tick(self.tick_interval_ms) {
            ticks += 1;
        }
        ticks
    }

    /// Drop accumulated time and the baseline (on resume or restart)
    pub fn reset(&mut self) {
        self.accumulated_ms = 0.0;
        self.last_timestamp = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_frame_is_baseline() {
        let mut clock = FixedClock::new(16.67);
        assert_eq!(clock.advance(5000.0), 0);
        assert_eq!(clock.accumulated_ms(), 0.0);
    }

    #[test]
    fn test_runaway_gap_clamped_to_one_tick() {
        let mut clock = FixedClock::new(16.67);
        assert_eq!(clock.advance(0.0), 0);
        assert_eq!(clock.advance(16.0), 0);
        let ticks = clock.advance(1200.0);
        assert!(ticks <= 1, "got {ticks} ticks after a stall");
        assert!(clock.accumulated_ms() < 16.67);
    }

    #[test]
    fn test_steady_frames() {
        let mut clock = FixedClock::new(10.0);
        clock.advance(0.0);
        let total: u32 = (1..=10).map(|i| clock.advance(i as f64 * 25.0)).sum();
        assert_eq!(total, 25);
        assert!(clock.accumulated_ms() < 10.0);
    }

    #[test]
    fn test_reset_drops_backlog() {
        let mut clock = FixedClock::new(10.0);
        clock.advance(0.0);
        clock.begin_frame(9.0);
        clock.reset();
        // New baseline, nothing queued from before the reset
        assert_eq!(clock.advance(500.0), 0);
        assert_eq!(clock.advance(510.0), 1);
    }

    #[test]
    fn test_interval_read_at_subtraction_time() {
        let mut clock = FixedClock::new(100.0);
        clock.advance(0.0);
        clock.begin_frame(100.0);
        // Interval shrinks after the first tick
        assert!(clock.next_tick(60.0));
        assert!(clock.next_tick(30.0));
        assert!(!clock.next_tick(30.0));
        assert!((clock.accumulated_ms() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_backwards_timestamp_ignored() {
        let mut clock = FixedClock::new(10.0);
        clock.advance(100.0);
        assert_eq!(clock.advance(50.0), 0);
        assert_eq!(clock.accumulated_ms(), 0.0);
    }

    proptest! {
        #[test]
        fn prop_simulated_time_bounded_by_wall_clock(
            interval in 1.0f64..50.0,
            gaps in prop::collection::vec(0.0f64..3000.0, 1..100),
        ) {
            let mut clock = FixedClock::new(interval);
            let mut now = 0.0;
            clock.advance(now);
            let mut simulated = 0.0;
            for gap in gaps {
                now += gap;
                let ticks = clock.advance(now);
                let frame_sim = ticks as f64 * interval;
                // One frame never simulates more than the ceiling, or one
                // interval plus carry-over for a clamped stall
                prop_assert!(frame_sim <= RUNAWAY_CEILING_MS.max(interval) + interval);
                if gap > RUNAWAY_CEILING_MS.max(interval) {
                    prop_assert!(ticks <= 2);
                }
                simulated += frame_sim;
                prop_assert!(simulated <= now + interval);
                prop_assert!(clock.accumulated_ms() >= 0.0);
                prop_assert!(clock.accumulated_ms() < interval);
            }
        }
    }
}
