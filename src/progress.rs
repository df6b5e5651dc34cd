//! Player progress record
//!
//! Persisted through [`crate::persistence::ProgressStore`]. Every field has a
//! default so an older or partial record still loads.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Long-lived progress for one game
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressRecord {
    /// Highest score ever reached (never decreases)
    pub best_score: u64,
    /// Unlocked achievement ids
    pub achievements: BTreeSet<String>,
    /// Consecutive days played
    pub streak_days: u32,
    /// Last day played, ISO `YYYY-MM-DD`
    pub last_played: Option<String>,
    pub total_plays: u32,
    pub total_score: u64,
    pub best_combo: u32,
    pub best_level: u32,
    /// Collected item ids (rhythm glyphs)
    pub collected: BTreeSet<String>,
}

impl ProgressRecord {
    /// Raise the best score. Returns true on a new best.
    pub fn record_best(&mut self, score: u64) -> bool {
        if score > self.best_score {
            self.best_score = score;
            true
        } else {
            false
        }
    }

    /// Fold a finished run into the totals. Returns true on a new best.
    pub fn record_run(&mut self, score: u64, max_combo: u32, level: u32) -> bool {
        self.total_plays = self.total_plays.saturating_add(1);
        self.total_score = self.total_score.saturating_add(score);
        self.best_combo = self.best_combo.max(max_combo);
        self.best_level = self.best_level.max(level);
        self.record_best(score)
    }

    pub fn is_unlocked(&self, id: &str) -> bool {
        self.achievements.contains(id)
    }

    pub fn unlock(&mut self, id: &str) -> bool {
        self.achievements.insert(id.to_string())
    }

    pub fn collect(&mut self, id: &str) -> bool {
        self.collected.insert(id.to_string())
    }

    /// Update the daily streak for a play on `today` (ISO date).
    ///
    /// Same day: unchanged. Day after `last_played`: +1. Anything else
    /// (first play, gap, unparseable date): reset to 1. Returns true if the
    /// record changed.
    pub fn touch_streak(&mut self, today: &str) -> bool {
        let Some(today_days) = days_from_iso(today) else {
            log::warn!("Ignoring unparseable date '{}'", today);
            return false;
        };
        let last = self.last_played.as_deref().and_then(days_from_iso);
        match last {
            Some(last) if last == today_days => return false,
            Some(last) if today_days - last == 1 => self.streak_days += 1,
            _ => self.streak_days = 1,
        }
        self.last_played = Some(today.to_string());
        true
    }
}

/// Days since 1970-01-01 for an ISO `YYYY-MM-DD` date
pub fn days_from_iso(date: &str) -> Option<i64> {
    let mut parts = date.trim().splitn(3, '-');
    let y: i64 = parts.next()?.parse().ok()?;
    let m: i64 = parts.next()?.parse().ok()?;
    let d: i64 = parts.next()?.parse().ok()?;
    if !(1..=12).contains(&m) || d < 1 || d > days_in_month(y, m) {
        return None;
    }
    // Civil-from-days inverse, eras of 400 years starting in March
    let y = if m <= 2 { y - 1 } else { y };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let mp = (m + 9) % 12;
    let doy = (153 * mp + 2) / 5 + d - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    Some(era * 146_097 + doe - 719_468)
}

/// ISO `YYYY-MM-DD` for a day count since 1970-01-01
pub fn iso_from_days(days: i64) -> String {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = yoe + era * 400 + i64::from(m <= 2);
    format!("{:04}-{:02}-{:02}", y, m, d)
}

fn days_in_month(y: i64, m: i64) -> i64 {
    match m {
        2 if (y % 4 == 0 && y % 100 != 0) || y % 400 == 0 => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}
