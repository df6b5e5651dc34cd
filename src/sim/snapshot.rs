//! Read-only per-frame view for renderers

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::effects::{Effects, Particle, Ripple};
use super::state::{GamePhase, Session};

/// Drawable primitive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Rect,
    Circle,
    /// Single character centered on `pos`
    Glyph(char),
    /// Horizontal line across `half.x * 2`
    Line,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub shape: Shape,
    /// Center
    pub pos: Vec2,
    pub half: Vec2,
    /// 0xRRGGBB
    pub tint: u32,
    pub alpha: f32,
}

impl Sprite {
    pub fn rect(pos: Vec2, half: Vec2, tint: u32) -> Self {
        Self {
            shape: Shape::Rect,
            pos,
            half,
            tint,
            alpha: 1.0,
        }
    }

    pub fn circle(pos: Vec2, radius: f32, tint: u32) -> Self {
        Self {
            shape: Shape::Circle,
            pos,
            half: Vec2::splat(radius),
            tint,
            alpha: 1.0,
        }
    }

    pub fn glyph(ch: char, pos: Vec2, size: f32, tint: u32) -> Self {
        Self {
            shape: Shape::Glyph(ch),
            pos,
            half: Vec2::splat(size * 0.5),
            tint,
            alpha: 1.0,
        }
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha.clamp(0.0, 1.0);
        self
    }
}

/// HUD-facing session fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub phase: GamePhase,
    pub score: u64,
    pub best_score: u64,
    pub health: i32,
    pub max_health: i32,
    pub level: u32,
    pub combo: u32,
    pub elapsed: f32,
    pub difficulty: f32,
    /// Seconds left on a Ready/LevelClear countdown
    pub countdown: f32,
}

impl SessionView {
    pub fn from_session(session: &Session, best_score: u64) -> Self {
        Self {
            phase: session.phase,
            score: session.score,
            best_score: best_score.max(session.score),
            health: session.health,
            max_health: session.config.max_health,
            level: session.level,
            combo: session.combo,
            elapsed: session.elapsed,
            difficulty: session.difficulty,
            countdown: session.phase_timer.remaining(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextView {
    pub text: String,
    pub pos: Vec2,
    pub tint: u32,
    pub alpha: f32,
}

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub session: SessionView,
    /// Game-specific background tier (rhythm scenes)
    pub scene: u8,
    pub sprites: Vec<Sprite>,
    pub particles: Vec<Particle>,
    pub ripples: Vec<Ripple>,
    pub feedback: Option<TextView>,
    pub banner: Option<TextView>,
    pub shake: f32,
}

impl Snapshot {
    pub fn capture(session: &Session, best_score: u64, scene: u8, sprites: Vec<Sprite>, fx: &Effects) -> Self {
        let text = |f: &super::effects::Feedback| TextView {
            text: f.text.clone(),
            pos: f.pos,
            tint: f.tint,
            alpha: f.alpha(),
        };
        Self {
            session: SessionView::from_session(session, best_score),
            scene,
            sprites,
            particles: fx.particles().to_vec(),
            ripples: fx.ripples().to_vec(),
            feedback: fx.feedback.as_ref().map(text),
            banner: fx.banner.as_ref().map(text),
            shake: fx.shake(),
        }
    }

    /// JSON for a JS-side renderer
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::SessionConfig;

    #[test]
    fn test_capture_reflects_session() {
        let mut session = Session::new(SessionConfig::default());
        session.restart();
        session.add_score(40);
        let mut fx = Effects::new(8, true);
        fx.show_banner("Flow", 0xffd700, 1.0);
        let snap = Snapshot::capture(&session, 10, 2, vec![Sprite::circle(Vec2::ONE, 4.0, 0)], &fx);
        assert_eq!(snap.session.phase, GamePhase::Playing);
        assert_eq!(snap.session.best_score, 40);
        assert_eq!(snap.scene, 2);
        assert_eq!(snap.banner.as_ref().map(|b| b.text.as_str()), Some("Flow"));
        assert!(snap.to_json().contains("\"score\":40"));
    }
}
