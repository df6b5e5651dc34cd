//! Achievement evaluation
//!
//! Each game supplies a static, ordered table of [`Achievement`]s. Evaluation
//! is pure: it reads the progress record and a snapshot of session stats and
//! returns the entries that unlock now. Already-unlocked ids are skipped
//! without running their predicate. Recording the unlocks (and saving them)
//! is up to the caller.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::progress::ProgressRecord;

/// Stats visible to achievement predicates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub score: u64,
    pub max_combo: u32,
    pub level: u32,
    /// Simulated seconds of play
    pub elapsed: f32,
    pub game_over: bool,
    /// Game-specific tallies (hits by quality, bricks broken, ...)
    pub counters: BTreeMap<String, u64>,
}

impl SessionStats {
    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }
}

pub type Predicate = fn(&ProgressRecord, &SessionStats) -> bool;

#[derive(Clone, Copy)]
pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    pub desc: &'static str,
    pub check: Predicate,
}

impl std::fmt::Debug for Achievement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Achievement").field("id", &self.id).finish()
    }
}

/// Entries of `table` that are not yet unlocked and whose predicate passes, in table order
pub fn evaluate(
    table: &'static [Achievement],
    progress: &ProgressRecord,
    stats: &SessionStats,
) -> Vec<&'static Achievement> {
    table
        .iter()
        .filter(|a| !progress.is_unlocked(a.id))
        .filter(|a| (a.check)(progress, stats))
        .collect()
}

/// Look up an entry by id
pub fn find(table: &'static [Achievement], id: &str) -> Option<&'static Achievement> {
    table.iter().find(|a| a.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    static TABLE: &[Achievement] = &[
        Achievement {
            id: "score_100",
            name: "Hundred",
            desc: "Score 100 in one run",
            check: |_, s| s.score >= 100,
        },
        Achievement {
            id: "combo_10",
            name: "Flow",
            desc: "Reach a 10 combo",
            check: |_, s| s.max_combo >= 10,
        },
        Achievement {
            id: "veteran",
            name: "Veteran",
            desc: "Play 5 runs",
            check: |p, _| p.total_plays >= 5,
        },
        Achievement {
            id: "clean",
            name: "Clean",
            desc: "Finish a run without missing",
            check: |_, s| s.game_over && s.counter("miss") == 0,
        },
    ];

    #[test]
    fn test_evaluate_table_order() {
        let stats = SessionStats {
            score: 150,
            max_combo: 12,
            ..Default::default()
        };
        let ids: Vec<&str> = evaluate(TABLE, &ProgressRecord::default(), &stats)
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec!["score_100", "combo_10"]);
    }

    #[test]
    fn test_unlocked_are_skipped() {
        let mut progress = ProgressRecord::default();
        progress.unlock("score_100");
        let stats = SessionStats {
            score: 1000,
            ..Default::default()
        };
        assert!(evaluate(TABLE, &progress, &stats).is_empty());
    }

    #[test]
    fn test_counter_default_zero() {
        let stats = SessionStats {
            game_over: true,
            ..Default::default()
        };
        let unlocked = evaluate(TABLE, &ProgressRecord::default(), &stats);
        assert_eq!(unlocked.len(), 1);
        assert_eq!(unlocked[0].id, "clean");
        assert_eq!(find(TABLE, "clean").map(|a| a.name), Some("Clean"));
    }

    proptest! {
        #[test]
        fn prop_second_evaluation_unlocks_nothing(
            score in 0u64..500,
            max_combo in 0u32..30,
            plays in 0u32..10,
            game_over: bool,
            misses in 0u64..3,
        ) {
            let mut progress = ProgressRecord { total_plays: plays, ..Default::default() };
            let mut stats = SessionStats { score, max_combo, game_over, ..Default::default() };
            stats.counters.insert("miss".to_string(), misses);

            let first = evaluate(TABLE, &progress, &stats);
            for a in &first {
                prop_assert!(progress.unlock(a.id));
            }
            let second = evaluate(TABLE, &progress, &stats);
            prop_assert!(second.is_empty());
        }
    }
}
