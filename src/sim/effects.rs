//! Visual effects
//!
//! Particles, ripples, floating feedback text and screen shake. Nothing here
//! affects gameplay. All lifetimes are in seconds and decay with `dt`.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::pool::SwapPool;
use super::timer::Countdown;

/// Shake intensity halves roughly every 0.1 s
const SHAKE_DECAY_PER_SEC: f32 = 6.3;
/// Velocity damping per second
const PARTICLE_DRAG_PER_SEC: f32 = 1.5;
/// Downward acceleration on falling particles (px/s^2)
const PARTICLE_GRAVITY: f32 = 300.0;
/// Ripples kept at once
const MAX_RIPPLES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum ParticleKind {
    /// Small dot that falls
    #[default]
    Spark,
    /// Floating petal, no gravity
    Petal,
    /// Expanding outline
    Ring,
    /// Rising character
    Glyph(char),
}

impl ParticleKind {
    fn gravity(self) -> f32 {
        match self {
            ParticleKind::Spark => PARTICLE_GRAVITY,
            ParticleKind::Petal | ParticleKind::Ring => 0.0,
            ParticleKind::Glyph(_) => -40.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Particle {
    pub kind: ParticleKind,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Seconds left
    pub life: f32,
    pub max_life: f32,
    pub size: f32,
    /// 0xRRGGBB
    pub tint: u32,
}

impl Particle {
    /// 1 at spawn, 0 at death
    pub fn alpha(&self) -> f32 {
        if self.max_life <= 0.0 {
            0.0
        } else {
            (self.life / self.max_life).clamp(0.0, 1.0)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Ripple {
    pub pos: Vec2,
    pub radius: f32,
    pub max_radius: f32,
    pub life: f32,
    pub max_life: f32,
}

/// Floating text (hit grade, milestone title, achievement name)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub text: String,
    pub pos: Vec2,
    pub tint: u32,
    pub timer: Countdown,
    pub duration: f32,
}

impl Feedback {
    pub fn alpha(&self) -> f32 {
        self.timer.fraction_of(self.duration)
    }
}

/// Burst parameters
#[derive(Debug, Clone, Copy)]
pub struct Burst {
    pub kind: ParticleKind,
    pub count: usize,
    pub speed: (f32, f32),
    pub life: f32,
    pub size: f32,
    pub tint: u32,
}

impl Burst {
    pub fn sparks(count: usize, tint: u32) -> Self {
        Self {
            kind: ParticleKind::Spark,
            count,
            speed: (60.0, 180.0),
            life: 0.6,
            size: 3.0,
            tint,
        }
    }
}

pub struct Effects {
    particles: SwapPool<Particle>,
    ripples: SwapPool<Ripple>,
    /// Short-lived grade text near the action
    pub feedback: Option<Feedback>,
    /// Centered title (milestones, achievements)
    pub banner: Option<Feedback>,
    shake: f32,
    shake_enabled: bool,
}

impl Effects {
    pub fn new(capacity: usize, shake_enabled: bool) -> Self {
        Self {
            particles: SwapPool::new(capacity),
            ripples: SwapPool::new(MAX_RIPPLES),
            feedback: None,
            banner: None,
            shake: 0.0,
            shake_enabled,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        self.particles.as_slice()
    }

    pub fn ripples(&self) -> &[Ripple] {
        self.ripples.as_slice()
    }

    pub fn capacity(&self) -> usize {
        self.particles.capacity()
    }

    pub fn shake(&self) -> f32 {
        self.shake
    }

    /// Spawn up to `burst.count` particles around `pos`; stops when the pool is full
    pub fn burst(&mut self, rng: &mut impl Rng, pos: Vec2, burst: Burst) -> usize {
        let mut spawned = 0;
        for _ in 0..burst.count {
            let angle = rng.random_range(0.0..std::f32::consts::TAU);
            let speed = rng.random_range(burst.speed.0..=burst.speed.1);
            let Some(p) = self.particles.acquire() else {
                break;
            };
            *p = Particle {
                kind: burst.kind,
                pos,
                vel: Vec2::from_angle(angle) * speed,
                life: burst.life,
                max_life: burst.life,
                size: burst.size,
                tint: burst.tint,
            };
            spawned += 1;
        }
        spawned
    }

    pub fn ripple(&mut self, pos: Vec2, max_radius: f32, life: f32) {
        self.ripples.spawn(Ripple {
            pos,
            radius: 0.0,
            max_radius,
            life,
            max_life: life,
        });
    }

    pub fn show_feedback(&mut self, text: impl Into<String>, pos: Vec2, tint: u32, secs: f32) {
        self.feedback = Some(Feedback {
            text: text.into(),
            pos,
            tint,
            timer: Countdown::new(secs),
            duration: secs,
        });
    }

    pub fn show_banner(&mut self, text: impl Into<String>, tint: u32, secs: f32) {
        self.banner = Some(Feedback {
            text: text.into(),
            pos: Vec2::ZERO,
            tint,
            timer: Countdown::new(secs),
            duration: secs,
        });
    }

    /// Add screen shake (ignored with reduced motion)
    pub fn add_shake(&mut self, amount: f32) {
        if self.shake_enabled {
            self.shake = (self.shake + amount).min(1.0);
        }
    }

    /// Advance every effect by `dt` seconds and drop the expired ones
    pub fn decay(&mut self, dt: f32) {
        let drag = (-PARTICLE_DRAG_PER_SEC * dt).exp();
        self.particles.retain(|p| {
            p.life -= dt;
            p.vel.y += p.kind.gravity() * dt;
            p.vel *= drag;
            p.pos += p.vel * dt;
            p.life > 0.0
        });

        self.ripples.retain(|r| {
            r.life -= dt;
            let t = 1.0 - (r.life / r.max_life).clamp(0.0, 1.0);
            r.radius = r.max_radius * t;
            r.life > 0.0
        });

        for slot in [&mut self.feedback, &mut self.banner] {
            if let Some(f) = slot {
                f.pos.y -= 20.0 * dt;
                if f.timer.tick(dt) {
                    *slot = None;
                }
            }
        }

        self.shake *= (-SHAKE_DECAY_PER_SEC * dt).exp();
        if self.shake < 0.01 {
            self.shake = 0.0;
        }
    }

    pub fn clear(&mut self) {
        self.particles.clear();
        self.ripples.clear();
        self.feedback = None;
        self.banner = None;
        self.shake = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_burst_respects_capacity() {
        let mut fx = Effects::new(10, true);
        let mut rng = Pcg32::seed_from_u64(1);
        assert_eq!(fx.burst(&mut rng, Vec2::ZERO, Burst::sparks(8, 0xffffff)), 8);
        assert_eq!(fx.burst(&mut rng, Vec2::ZERO, Burst::sparks(8, 0xffffff)), 2);
        assert_eq!(fx.particles().len(), 10);
    }

    #[test]
    fn test_particles_expire_by_time() {
        let mut fx = Effects::new(10, true);
        let mut rng = Pcg32::seed_from_u64(1);
        fx.burst(&mut rng, Vec2::ZERO, Burst::sparks(5, 0));
        // 0.6 s life at 60 Hz
        for _ in 0..30 {
            fx.decay(1.0 / 60.0);
        }
        assert_eq!(fx.particles().len(), 5);
        for _ in 0..10 {
            fx.decay(1.0 / 60.0);
        }
        assert!(fx.particles().is_empty());
    }

    #[test]
    fn test_feedback_and_ripple_expire() {
        let mut fx = Effects::new(4, true);
        fx.show_feedback("GOOD", Vec2::new(10.0, 10.0), 0x88ccff, 0.5);
        fx.ripple(Vec2::ZERO, 60.0, 0.5);
        fx.decay(0.25);
        assert!(fx.feedback.is_some());
        assert!((fx.ripples()[0].radius - 30.0).abs() < 1e-3);
        fx.decay(0.3);
        assert!(fx.feedback.is_none());
        assert!(fx.ripples().is_empty());
    }

    #[test]
    fn test_shake_decays_and_respects_reduced_motion() {
        let mut fx = Effects::new(4, true);
        fx.add_shake(0.8);
        fx.decay(0.1);
        assert!(fx.shake() < 0.8 && fx.shake() > 0.0);
        fx.decay(2.0);
        assert_eq!(fx.shake(), 0.0);

        let mut calm = Effects::new(4, false);
        calm.add_shake(0.8);
        assert_eq!(calm.shake(), 0.0);
    }
}
