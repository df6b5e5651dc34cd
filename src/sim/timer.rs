//! Time-based countdowns and absolute deadlines
//!
//! [`Countdown`] is decremented by `dt` each tick and reports the single tick
//! on which it crosses zero. [`Deadline`] is an absolute host timestamp; the
//! session shifts every registered deadline forward by the paused duration on
//! resume so it keeps the time it had left.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Seconds remaining on a one-shot timer
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Countdown {
    remaining: f32,
}

impl Countdown {
    pub fn new(secs: f32) -> Self {
        Self {
            remaining: secs.max(0.0),
        }
    }

    /// A countdown that is not running
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn restart(&mut self, secs: f32) {
        self.remaining = secs.max(0.0);
    }

    /// Add time to a running (or idle) countdown
    pub fn extend(&mut self, secs: f32) {
        self.remaining = (self.remaining + secs).max(0.0);
    }

    pub fn cancel(&mut self) {
        self.remaining = 0.0;
    }

    pub fn is_running(&self) -> bool {
        self.remaining > 0.0
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    /// Remaining fraction of `total`, for fades
    pub fn fraction_of(&self, total: f32) -> f32 {
        if total <= 0.0 {
            0.0
        } else {
            (self.remaining / total).clamp(0.0, 1.0)
        }
    }

    /// Advance by `dt`. True only on the tick the countdown reaches zero.
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.remaining <= 0.0 {
            return false;
        }
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            self.remaining = 0.0;
            true
        } else {
            false
        }
    }
}

/// Absolute host time (ms) at which something is due
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Deadline {
    pub at_ms: f64,
}

impl Deadline {
    pub fn after(now_ms: f64, delay_ms: f64) -> Self {
        Self {
            at_ms: now_ms + delay_ms,
        }
    }

    pub fn remaining_ms(&self, now_ms: f64) -> f64 {
        self.at_ms - now_ms
    }

    pub fn is_due(&self, now_ms: f64) -> bool {
        now_ms >= self.at_ms
    }

    pub fn shift(&mut self, by_ms: f64) {
        self.at_ms += by_ms;
    }
}

/// Named deadlines owned by a session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Deadlines {
    entries: BTreeMap<String, Deadline>,
}

impl Deadlines {
    pub fn set(&mut self, name: &str, deadline: Deadline) {
        self.entries.insert(name.to_string(), deadline);
    }

    pub fn get(&self, name: &str) -> Option<Deadline> {
        self.entries.get(name).copied()
    }

    pub fn remove(&mut self, name: &str) -> Option<Deadline> {
        self.entries.remove(name)
    }

    /// True if `name` exists and is due at `now_ms`
    pub fn is_due(&self, name: &str, now_ms: f64) -> bool {
        self.get(name).is_some_and(|d| d.is_due(now_ms))
    }

    /// Shift every deadline forward (pause compensation)
    pub fn shift_all(&mut self, by_ms: f64) {
        for deadline in self.entries.values_mut() {
            deadline.shift(by_ms);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Deadline)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_countdown_fires_once() {
        let mut timer = Countdown::new(0.05);
        let fired: Vec<bool> = (0..5).map(|_| timer.tick(0.02)).collect();
        assert_eq!(fired, vec![false, false, true, false, false]);
        assert!(!timer.is_running());
    }

    #[test]
    fn test_idle_countdown_never_fires() {
        let mut timer = Countdown::idle();
        assert!(!timer.tick(1.0));
        timer.restart(0.5);
        assert!(timer.is_running());
        timer.cancel();
        assert!(!timer.tick(1.0));
    }

    #[test]
    fn test_deadline_shift() {
        let mut deadlines = Deadlines::default();
        deadlines.set("beat", Deadline::after(1000.0, 500.0));
        assert!(!deadlines.is_due("beat", 1400.0));
        deadlines.shift_all(3000.0);
        assert!(!deadlines.is_due("beat", 4400.0));
        assert!(deadlines.is_due("beat", 4500.0));
        assert!(!deadlines.is_due("missing", 1e12));
    }
}
