//! Session state and the phase machine
//!
//! A [`Session`] holds everything about one run that is independent of the
//! game's content: phase, score, health, combo, difficulty, timers. Every
//! input goes through [`Session::handle`], which is total over
//! (phase, action) and reports what happened as a [`Transition`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::timer::{Countdown, Deadlines};
use crate::achievements::SessionStats;

/// Current phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GamePhase {
    /// Idle, waiting for start input
    #[default]
    Menu,
    /// Short countdown before play (input blocked)
    Ready,
    /// Active gameplay
    Playing,
    /// Simulation frozen
    Paused,
    /// Level finished, countdown to the next one (input blocked)
    LevelClear,
    /// Run ended
    GameOver,
}

impl GamePhase {
    /// Phases in which simulation ticks run
    pub fn is_ticking(self) -> bool {
        matches!(self, GamePhase::Ready | GamePhase::Playing | GamePhase::LevelClear)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GamePhase::Menu => "menu",
            GamePhase::Ready => "ready",
            GamePhase::Playing => "playing",
            GamePhase::Paused => "paused",
            GamePhase::LevelClear => "level_clear",
            GamePhase::GameOver => "game_over",
        }
    }
}

/// Discrete player intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    MoveLeft,
    MoveRight,
    Fire,
    Pause,
    Confirm,
    Quit,
    /// Press on lane N
    Lane(u8),
}

/// Outcome of feeding an action (or a phase timer) to the session
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    /// No effect in this phase
    Ignored,
    /// Gameplay input for the rules
    Forward(Action),
    /// A new run was started (session already reset)
    Started,
    Paused,
    /// Play resumed; deadlines were shifted by `paused_ms`
    Resumed { paused_ms: f64 },
    /// Ready countdown ended
    Go,
    /// Level finished, entering LevelClear
    LevelCleared(u32),
    /// LevelClear countdown ended, now on this level
    NextLevel(u32),
    /// Run ended (health or quit)
    Finished,
    /// Back to the menu, run discarded
    Menu,
}

/// Per-game session parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub max_health: i32,
    /// Health at the start of a run
    pub start_health: i32,
    /// Ready countdown before each level (0 = straight to Playing)
    pub ready_secs: f32,
    pub level_clear_secs: f32,
    /// Quit ends the run as GameOver instead of returning to the menu
    pub quit_ends_run: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_health: 100,
            start_health: 100,
            ready_secs: 0.0,
            level_clear_secs: 2.0,
            quit_ends_run: false,
        }
    }
}

/// One run's generic state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub config: SessionConfig,
    pub phase: GamePhase,
    pub score: u64,
    /// Health or lives; 0 ends the run
    pub health: i32,
    /// Current level (1-based once a run starts)
    pub level: u32,
    /// Simulated seconds spent Playing
    pub elapsed: f32,
    /// Never decreases during a run
    pub difficulty: f32,
    pub combo: u32,
    pub max_combo: u32,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Host time at which Paused was entered
    pub pause_started_at: Option<f64>,
    /// Phase to return to on resume
    paused_from: Option<GamePhase>,
    /// Ready / LevelClear countdown
    pub phase_timer: Countdown,
    /// Absolute deadlines shifted on resume
    pub deadlines: Deadlines,
    /// Game-specific tallies for achievements
    pub counters: BTreeMap<String, u64>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            phase: GamePhase::Menu,
            score: 0,
            health: config.start_health,
            level: 0,
            elapsed: 0.0,
            difficulty: 0.0,
            combo: 0,
            max_combo: 0,
            time_ticks: 0,
            pause_started_at: None,
            paused_from: None,
            phase_timer: Countdown::idle(),
            deadlines: Deadlines::default(),
            counters: BTreeMap::new(),
        }
    }

    /// Discard the run and start level 1
    pub fn restart(&mut self) {
        *self = Self::new(self.config);
        self.level = 1;
        self.enter_ready();
    }

    fn enter_ready(&mut self) {
        if self.config.ready_secs > 0.0 {
            self.phase = GamePhase::Ready;
            self.phase_timer.restart(self.config.ready_secs);
        } else {
            self.phase = GamePhase::Playing;
            self.phase_timer.cancel();
        }
    }

    /// Apply one input action at host time `now_ms`
    pub fn handle(&mut self, action: Action, now_ms: f64) -> Transition {
        use GamePhase as P;

        match (self.phase, action) {
            (P::Menu | P::GameOver, Action::Confirm | Action::Fire) => {
                self.restart();
                Transition::Started
            }
            (P::GameOver, Action::Quit) => {
                self.phase = P::Menu;
                Transition::Menu
            }
            (P::Menu | P::GameOver, _) => Transition::Ignored,

            (P::Playing | P::Ready, Action::Pause) => {
                self.paused_from = Some(self.phase);
                self.pause_started_at = Some(now_ms);
                self.phase = P::Paused;
                Transition::Paused
            }
            (P::Paused, Action::Pause | Action::Confirm) => self.resume(now_ms),

            (P::Playing | P::Ready | P::Paused, Action::Quit) => {
                self.pause_started_at = None;
                self.paused_from = None;
                if self.config.quit_ends_run {
                    self.phase = P::GameOver;
                    Transition::Finished
                } else {
                    self.phase = P::Menu;
                    Transition::Menu
                }
            }

            (P::Playing, action) => Transition::Forward(action),
            (P::Ready | P::Paused | P::LevelClear, _) => Transition::Ignored,
        }
    }

    fn resume(&mut self, now_ms: f64) -> Transition {
        let paused_ms = self
            .pause_started_at
            .take()
            .map(|t| (now_ms - t).max(0.0))
            .unwrap_or(0.0);
        self.deadlines.shift_all(paused_ms);
        self.phase = self.paused_from.take().unwrap_or(GamePhase::Playing);
        Transition::Resumed { paused_ms }
    }

    /// Advance tick counters and phase countdowns by `dt` seconds
    pub fn advance(&mut self, dt: f32) -> Option<Transition> {
        self.time_ticks += 1;
        match self.phase {
            GamePhase::Playing => {
                self.elapsed += dt;
                None
            }
            GamePhase::Ready if self.phase_timer.tick(dt) => {
                self.phase = GamePhase::Playing;
                Some(Transition::Go)
            }
            GamePhase::LevelClear if self.phase_timer.tick(dt) => {
                self.level += 1;
                self.enter_ready();
                Some(Transition::NextLevel(self.level))
            }
            _ => None,
        }
    }

    /// Playing -> LevelClear. No-op in any other phase.
    pub fn clear_level(&mut self) -> bool {
        if self.phase != GamePhase::Playing {
            return false;
        }
        self.phase = GamePhase::LevelClear;
        self.phase_timer.restart(self.config.level_clear_secs);
        true
    }

    /// Lose health. Returns true if this ended the run.
    pub fn damage(&mut self, amount: i32) -> bool {
        self.health = (self.health - amount.max(0)).max(0);
        if self.health == 0 && self.phase == GamePhase::Playing {
            self.phase = GamePhase::GameOver;
            true
        } else {
            false
        }
    }

    pub fn heal(&mut self, amount: i32) {
        self.health = (self.health + amount.max(0)).min(self.config.max_health);
    }

    pub fn add_score(&mut self, points: u64) {
        self.score = self.score.saturating_add(points);
    }

    /// Count a successful hit; returns the new combo
    pub fn extend_combo(&mut self) -> u32 {
        self.combo += 1;
        self.max_combo = self.max_combo.max(self.combo);
        self.combo
    }

    pub fn break_combo(&mut self) {
        self.combo = 0;
    }

    /// Raise difficulty (never lowers it)
    pub fn raise_difficulty(&mut self, value: f32) {
        if value > self.difficulty {
            self.difficulty = value;
        }
    }

    pub fn bump(&mut self, counter: &str, by: u64) {
        *self.counters.entry(counter.to_string()).or_insert(0) += by;
    }

    pub fn counter(&self, counter: &str) -> u64 {
        self.counters.get(counter).copied().unwrap_or(0)
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            score: self.score,
            max_combo: self.max_combo,
            level: self.level,
            elapsed: self.elapsed,
            game_over: self.phase == GamePhase::GameOver,
            counters: self.counters.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::timer::Deadline;
    use proptest::prelude::*;

    fn playing() -> Session {
        let mut session = Session::new(SessionConfig::default());
        assert_eq!(session.handle(Action::Confirm, 0.0), Transition::Started);
        assert_eq!(session.phase, GamePhase::Playing);
        session
    }

    #[test]
    fn test_menu_ignores_gameplay_input() {
        let mut session = Session::new(SessionConfig::default());
        for action in [Action::MoveLeft, Action::Pause, Action::Lane(1), Action::Quit] {
            assert_eq!(session.handle(action, 0.0), Transition::Ignored);
            assert_eq!(session.phase, GamePhase::Menu);
        }
    }

    #[test]
    fn test_pause_blocks_movement() {
        let mut session = playing();
        assert_eq!(session.handle(Action::Pause, 100.0), Transition::Paused);
        assert_eq!(session.handle(Action::MoveLeft, 150.0), Transition::Ignored);
        assert_eq!(session.handle(Action::Fire, 150.0), Transition::Ignored);
        assert_eq!(session.phase, GamePhase::Paused);
        assert_eq!(
            session.handle(Action::Pause, 600.0),
            Transition::Resumed { paused_ms: 500.0 }
        );
        assert_eq!(session.phase, GamePhase::Playing);
        assert_eq!(session.handle(Action::MoveLeft, 650.0), Transition::Forward(Action::MoveLeft));
    }

    #[test]
    fn test_resume_while_playing_is_noop() {
        let mut session = playing();
        // Confirm while playing goes to the rules, not a phase change
        assert_eq!(session.handle(Action::Confirm, 0.0), Transition::Forward(Action::Confirm));
        assert_eq!(session.phase, GamePhase::Playing);
    }

    #[test]
    fn test_pause_from_ready_resumes_to_ready() {
        let mut session = Session::new(SessionConfig {
            ready_secs: 1.0,
            ..Default::default()
        });
        session.handle(Action::Fire, 0.0);
        assert_eq!(session.phase, GamePhase::Ready);
        assert_eq!(session.handle(Action::Fire, 0.0), Transition::Ignored);
        session.handle(Action::Pause, 10.0);
        session.handle(Action::Confirm, 20.0);
        assert_eq!(session.phase, GamePhase::Ready);
        assert_eq!(session.advance(0.5), None);
        assert_eq!(session.advance(0.5), Some(Transition::Go));
        assert_eq!(session.phase, GamePhase::Playing);
    }

    #[test]
    fn test_damage_to_zero_ends_run() {
        let mut session = playing();
        assert!(!session.damage(60));
        assert!(session.damage(60));
        assert_eq!(session.health, 0);
        assert_eq!(session.phase, GamePhase::GameOver);
        // Already over
        assert!(!session.damage(10));
    }

    #[test]
    fn test_heal_caps_at_max() {
        let mut session = playing();
        session.damage(10);
        session.heal(50);
        assert_eq!(session.health, 100);
    }

    #[test]
    fn test_quit_semantics() {
        let mut session = playing();
        assert_eq!(session.handle(Action::Quit, 0.0), Transition::Menu);
        assert_eq!(session.phase, GamePhase::Menu);

        let mut session = Session::new(SessionConfig {
            quit_ends_run: true,
            ..Default::default()
        });
        session.handle(Action::Confirm, 0.0);
        session.handle(Action::Pause, 0.0);
        assert_eq!(session.handle(Action::Quit, 0.0), Transition::Finished);
        assert_eq!(session.phase, GamePhase::GameOver);
        assert_eq!(session.handle(Action::Quit, 0.0), Transition::Menu);
    }

    #[test]
    fn test_level_clear_cycle() {
        let mut session = Session::new(SessionConfig {
            ready_secs: 0.5,
            level_clear_secs: 1.0,
            ..Default::default()
        });
        session.handle(Action::Confirm, 0.0);
        session.advance(0.5);
        assert_eq!(session.phase, GamePhase::Playing);

        assert!(session.clear_level());
        assert!(!session.clear_level());
        assert_eq!(session.handle(Action::Pause, 0.0), Transition::Ignored);
        assert_eq!(session.advance(0.6), None);
        assert_eq!(session.advance(0.6), Some(Transition::NextLevel(2)));
        assert_eq!(session.phase, GamePhase::Ready);
    }

    #[test]
    fn test_restart_discards_run() {
        let mut session = playing();
        session.add_score(500);
        session.extend_combo();
        session.bump("miss", 2);
        session.damage(100);
        assert_eq!(session.handle(Action::Confirm, 0.0), Transition::Started);
        assert_eq!(session.score, 0);
        assert_eq!(session.combo, 0);
        assert_eq!(session.counter("miss"), 0);
        assert_eq!(session.health, 100);
        assert_eq!(session.level, 1);
    }

    #[test]
    fn test_difficulty_never_lowers() {
        let mut session = playing();
        session.raise_difficulty(0.5);
        session.raise_difficulty(0.2);
        assert_eq!(session.difficulty, 0.5);
    }

    proptest! {
        #[test]
        fn prop_pause_preserves_remaining_time(
            delay in 1.0f64..5000.0,
            pause_at in 0.0f64..4000.0,
            paused_for in 0.0f64..100_000.0,
        ) {
            let mut session = playing();
            session.deadlines.set("beat", Deadline::after(0.0, delay));
            let before = session.deadlines.get("beat").unwrap().remaining_ms(pause_at);

            session.handle(Action::Pause, pause_at);
            let resume_at = pause_at + paused_for;
            session.handle(Action::Pause, resume_at);

            let after = session.deadlines.get("beat").unwrap().remaining_ms(resume_at);
            prop_assert!((before - after).abs() < 1e-6);
        }
    }
}
