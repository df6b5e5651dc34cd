//! Deterministic simulation module
//!
//! Everything that advances game state lives here:
//! - Fixed timestep only, driven by [`FixedClock`]
//! - Seeded RNG only (owned by each rule set)
//! - Fixed-capacity pools, stable iteration order
//! - No rendering or platform dependencies; side effects leave through [`Outbox`]

pub mod clock;
pub mod collision;
pub mod difficulty;
pub mod effects;
pub mod lane;
pub mod pool;
pub mod snapshot;
pub mod spawner;
pub mod state;
pub mod tick;
pub mod timer;

pub use clock::FixedClock;
pub use collision::{Circle, Contact, Rect, circle_rect_contact, circles_overlap, overlaps, resolve_circle_rect};
pub use difficulty::{DifficultyCurve, Ramp};
pub use effects::{Burst, Effects, ParticleKind};
pub use lane::{HitQuality, HitWindows};
pub use pool::{SlotId, SlotPool, SwapPool};
pub use snapshot::{Snapshot, Sprite};
pub use spawner::{Spawner, pick_lane};
pub use state::{Action, GamePhase, Session, SessionConfig, Transition};
pub use tick::{Engine, GameEvent, GameRules, Outbox, TickContext};
pub use timer::{Countdown, Deadline, Deadlines};
