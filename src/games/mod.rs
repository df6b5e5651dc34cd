//! Reference rule sets built on the engine
//!
//! - [`breakout`]: paddle, balls, bricks, power-ups and levels
//! - [`rhythm`]: four falling-note lanes, BPM ramp and hit judgement

pub mod breakout;
pub mod rhythm;

pub use breakout::Breakout;
pub use rhythm::Rhythm;

/// Soft gold used for celebrations and banners
pub(crate) const GOLD: u32 = 0xffd700;
pub(crate) const WHITE: u32 = 0xffffff;
