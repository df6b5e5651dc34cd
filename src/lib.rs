//! Zen Arcade - shared engine for small canvas arcade games
//!
//! Core modules:
//! - `sim`: Fixed-timestep simulation (pools, clock, collision, session state machine)
//! - `games`: Rule sets built on the engine (breakout, rhythm)
//! - `progress` / `achievements`: Player progress and unlock evaluation
//! - `persistence`: Storage boundary (LocalStorage on web)
//! - `platform`: Input queue, key mapping, host date
//! - `audio`: Named sound cues
//! - `settings`: Player preferences and engine tuning

pub mod achievements;
pub mod audio;
pub mod games;
pub mod persistence;
pub mod platform;
pub mod progress;
pub mod settings;
pub mod sim;

pub use progress::ProgressRecord;
pub use settings::{QualityPreset, Settings};
pub use sim::{Engine, GamePhase, GameRules, Session};

/// Engine configuration constants
pub mod consts {
    /// Default simulation rate (ticks per second)
    pub const TICK_HZ: f64 = 60.0;
    /// Accepted range for a stored tick rate
    pub const MIN_TICK_HZ: f64 = 30.0;
    pub const MAX_TICK_HZ: f64 = 240.0;
    /// Fixed tick interval in milliseconds
    pub const TICK_MS: f64 = 1000.0 / TICK_HZ;
    /// Frame gaps longer than this are treated as a stall and replaced by one tick
    pub const RUNAWAY_CEILING_MS: f64 = 1000.0;
    /// Pending edge-triggered input events kept between ticks
    pub const INPUT_QUEUE_CAPACITY: usize = 32;
    /// Default effect pool size (Medium quality)
    pub const MAX_EFFECTS: usize = 200;
}

/// Milliseconds to simulation seconds
#[inline]
pub fn ms_to_secs(ms: f64) -> f32 {
    (ms / 1000.0) as f32
}

