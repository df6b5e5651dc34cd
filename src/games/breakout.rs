//! Brick breaker rule set
//!
//! A paddle along the bottom edge, balls in a [`SwapPool`] and bricks in a
//! [`SlotPool`] laid out from five cycling patterns. Breaking a brick may
//! drop a power-up that falls toward the paddle. Losing every ball costs a
//! life; breaking every brick clears the level.

use std::f32::consts::PI;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::{GOLD, WHITE};
use crate::achievements::Achievement;
use crate::audio::Cue;
use crate::sim::collision::{Circle, Rect, bounce_in_bounds, circle_rect_contact, resolve_circle_rect};
use crate::sim::effects::{Burst, ParticleKind};
use crate::sim::pool::{SlotPool, SwapPool};
use crate::sim::snapshot::Sprite;
use crate::sim::state::{Action, Session, SessionConfig};
use crate::sim::tick::{GameEvent, GameRules, TickContext};
use crate::sim::timer::Countdown;

// Playfield
pub const FIELD_W: f32 = 480.0;
pub const FIELD_H: f32 = 640.0;

// Paddle
pub const PADDLE_W: f32 = 80.0;
pub const PADDLE_WIDE_W: f32 = 128.0;
pub const PADDLE_H: f32 = 14.0;
/// Top edge of the paddle
pub const PADDLE_Y: f32 = FIELD_H - 50.0;
/// Pixels per second at full input
pub const PADDLE_SPEED: f32 = 420.0;

// Ball
pub const BALL_RADIUS: f32 = 7.0;
pub const BALL_BASE_SPEED: f32 = 320.0;
pub const BALL_SPEED_PER_LEVEL: f32 = 20.0;
pub const BALL_MAX_SPEED: f32 = 500.0;
pub const MAX_BALLS: usize = 8;
/// Angle between a split ball and its parent (radians)
const SPLIT_ANGLE: f32 = 0.4;
/// Random spread around straight up on launch (radians)
const LAUNCH_SPREAD: f32 = 0.5;

// Bricks
pub const BRICK_ROWS: usize = 7;
pub const BRICK_COLS: usize = 9;
pub const BRICK_W: f32 = 48.0;
pub const BRICK_H: f32 = 22.0;
pub const BRICK_PAD: f32 = 4.0;
pub const BRICK_OFFSET_X: f32 = 12.0;
pub const BRICK_OFFSET_Y: f32 = 70.0;
pub const BRICK_SCORE: u64 = 10;
pub const HARD_BRICK_SCORE: u64 = 30;
const LAYOUT_COUNT: usize = 5;

// Power-ups
pub const DROP_CHANCE: f64 = 0.18;
pub const MAX_POWER_UPS: usize = 8;
const POWER_UP_FALL_SPEED: f32 = 120.0;
const POWER_UP_HALF: Vec2 = Vec2::new(14.0, 8.0);
pub const WIDE_SECS: f32 = 10.0;
pub const SLOW_SECS: f32 = 8.0;
pub const PIERCE_SECS: f32 = 6.0;
pub const SLOW_FACTOR: f32 = 0.6;

pub const START_LIVES: i32 = 3;
pub const MAX_LIVES: i32 = 5;

const HARD_TINT: u32 = 0x94a3b8;
const PADDLE_TINT: u32 = 0xe2e8f0;
const PIERCE_TINT: u32 = 0xf97316;

/// Per-level color and brick characters
struct Theme {
    tint: u32,
    chars: [char; 8],
}

static THEMES: [Theme; LAYOUT_COUNT] = [
    Theme {
        tint: 0xef4444,
        chars: ['\u{8CAA}', '\u{6B32}', '\u{6C42}', '\u{53D6}', '\u{5F97}', '\u{60F3}', '\u{5148}', '\u{6301}'],
    },
    Theme {
        tint: 0xf97316,
        chars: ['\u{55D4}', '\u{6012}', '\u{6068}', '\u{60F1}', '\u{706B}', '\u{71D2}', '\u{7206}', '\u{5FFF}'],
    },
    Theme {
        tint: 0xa855f7,
        chars: ['\u{7661}', '\u{8FF7}', '\u{60D1}', '\u{6627}', '\u{76F2}', '\u{6697}', '\u{611F}', '\u{5C18}'],
    },
    Theme {
        tint: 0xfbbf24,
        chars: ['\u{6162}', '\u{50B2}', '\u{8A87}', '\u{72C2}', '\u{81EA}', '\u{89B2}', '\u{8CA2}', '\u{8CBE}'],
    },
    Theme {
        tint: 0x22c55e,
        chars: ['\u{7591}', '\u{60D1}', '\u{7336}', '\u{8C6B}', '\u{6190}', '\u{756E}', '\u{61C2}', '\u{60B6}'],
    },
];

fn theme(level_index: usize) -> &'static Theme {
    &THEMES[level_index % LAYOUT_COUNT]
}

static ACHIEVEMENTS: &[Achievement] = &[
    Achievement {
        id: "first_clear",
        name: "Letting Go",
        desc: "Clear the first level",
        check: |_, s| s.level >= 2,
    },
    Achievement {
        id: "chain_10",
        name: "Unbroken",
        desc: "Break 10 bricks without losing a ball",
        check: |_, s| s.max_combo >= 10,
    },
    Achievement {
        id: "score_1000",
        name: "Thousand Petals",
        desc: "Score 1000 in one run",
        check: |_, s| s.score >= 1000,
    },
    Achievement {
        id: "power_5",
        name: "Open Hands",
        desc: "Catch 5 power-ups in one run",
        check: |_, s| s.counter("power_ups") >= 5,
    },
    Achievement {
        id: "all_five",
        name: "Five Poisons",
        desc: "Reach level 6",
        check: |_, s| s.level >= 6,
    },
];

/// Launch angle for a paddle hit at `t` (0 = left edge, 1 = right edge)
pub fn paddle_angle(t: f32) -> f32 {
    -PI * (0.15 + t.clamp(0.0, 1.0) * 0.7)
}

/// Cell grid for a level: 0 empty, 1 normal, 2 hard
pub fn layout(level_index: usize, rng: &mut impl Rng) -> [[u8; BRICK_COLS]; BRICK_ROWS] {
    let mut grid = [[0u8; BRICK_COLS]; BRICK_ROWS];
    let cx = (BRICK_COLS / 2) as i32;
    let cy = (BRICK_ROWS / 2) as i32;
    for (r, row) in grid.iter_mut().enumerate() {
        for (c, cell) in row.iter_mut().enumerate() {
            *cell = match level_index % LAYOUT_COUNT {
                // Pyramid
                0 => {
                    let margin = r / 2;
                    u8::from(c >= margin && c < BRICK_COLS - margin)
                }
                // Checkerboard with a hard middle row
                1 => match ((r + c) % 2, r) {
                    (0, 3) => 2,
                    (0, _) => 1,
                    _ => 0,
                },
                // Stripes with a hard center
                2 if r % 2 == 0 => {
                    if r == 2 && (3..=5).contains(&c) {
                        2
                    } else {
                        1
                    }
                }
                2 => 0,
                // Diamond
                3 => match (r as i32 - cy).abs() + (c as i32 - cx).abs() {
                    0..=1 => 2,
                    2..=4 => 1,
                    _ => 0,
                },
                // Full wall, a quarter hard
                _ => {
                    if rng.random_bool(0.25) {
                        2
                    } else {
                        1
                    }
                }
            };
        }
    }
    grid
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BallState {
    /// Riding the paddle, waiting for launch
    #[default]
    Attached,
    Free,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Ball {
    pub pos: Vec2,
    pub vel: Vec2,
    pub state: BallState,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Brick {
    pub rect: Rect,
    pub hp: u8,
    pub max_hp: u8,
    pub glyph: char,
}

impl Brick {
    pub fn is_hard(&self) -> bool {
        self.max_hp > 1
    }

    pub fn points(&self) -> u64 {
        if self.is_hard() {
            HARD_BRICK_SCORE
        } else {
            BRICK_SCORE
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerUpKind {
    /// Every ball splits in three
    #[default]
    Multi,
    Wide,
    Slow,
    /// Balls pass through bricks
    Pierce,
    Life,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 5] = [
        PowerUpKind::Multi,
        PowerUpKind::Wide,
        PowerUpKind::Slow,
        PowerUpKind::Pierce,
        PowerUpKind::Life,
    ];

    pub fn tint(self) -> u32 {
        match self {
            PowerUpKind::Multi => 0x38bdf8,
            PowerUpKind::Wide => 0x22c55e,
            PowerUpKind::Slow => 0xa855f7,
            PowerUpKind::Pierce => 0xf97316,
            PowerUpKind::Life => 0xef4444,
        }
    }

    pub fn glyph(self) -> char {
        match self {
            PowerUpKind::Multi => '3',
            PowerUpKind::Wide => '\u{2194}',
            PowerUpKind::Slow => '\u{231B}',
            PowerUpKind::Pierce => '\u{2191}',
            PowerUpKind::Life => '\u{2764}',
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PowerUp {
    pub kind: PowerUpKind,
    /// Center
    pub pos: Vec2,
}

impl PowerUp {
    pub fn bounds(&self) -> Rect {
        Rect::from_center(self.pos, POWER_UP_HALF)
    }
}

/// Timed power-up effects
#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveEffects {
    pub wide: Countdown,
    pub slow: Countdown,
    pub pierce: Countdown,
}

#[derive(Debug, Clone, Copy)]
pub struct Paddle {
    /// Left edge
    pub x: f32,
    pub w: f32,
}

impl Default for Paddle {
    fn default() -> Self {
        Self {
            x: (FIELD_W - PADDLE_W) / 2.0,
            w: PADDLE_W,
        }
    }
}

impl Paddle {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, PADDLE_Y, self.w, PADDLE_H)
    }

    /// Where an attached ball sits
    pub fn serve_point(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, PADDLE_Y - BALL_RADIUS - 1.0)
    }

    pub fn move_by(&mut self, dx: f32) {
        self.x = (self.x + dx).clamp(0.0, FIELD_W - self.w);
    }

    /// Change width around the current center
    pub fn set_width(&mut self, w: f32) {
        let center = self.x + self.w / 2.0;
        self.w = w;
        self.x = (center - w / 2.0).clamp(0.0, FIELD_W - w);
    }
}

pub struct Breakout {
    rng: Pcg32,
    paddle: Paddle,
    balls: SwapPool<Ball>,
    bricks: SlotPool<Brick>,
    power_ups: SlotPool<PowerUp>,
    /// Broken-brick positions rolled for drops in the next spawn step
    pending_drops: Vec<Vec2>,
    effects: ActiveEffects,
    level_index: usize,
}

impl Default for Breakout {
    fn default() -> Self {
        Self::new()
    }
}

impl Breakout {
    pub fn new() -> Self {
        Self {
            rng: Pcg32::seed_from_u64(0),
            paddle: Paddle::default(),
            balls: SwapPool::new(MAX_BALLS),
            bricks: SlotPool::new(BRICK_ROWS * BRICK_COLS),
            power_ups: SlotPool::new(MAX_POWER_UPS),
            pending_drops: Vec::new(),
            effects: ActiveEffects::default(),
            level_index: 0,
        }
    }

    pub fn paddle(&self) -> &Paddle {
        &self.paddle
    }

    pub fn balls(&self) -> &[Ball] {
        self.balls.as_slice()
    }

    pub fn bricks(&self) -> &SlotPool<Brick> {
        &self.bricks
    }

    pub fn power_ups(&self) -> &SlotPool<PowerUp> {
        &self.power_ups
    }

    pub fn active_effects(&self) -> &ActiveEffects {
        &self.effects
    }

    /// True while a ball waits on the paddle
    pub fn serving(&self) -> bool {
        self.balls.iter().any(|b| b.state == BallState::Attached)
    }

    /// Ball speed for a 1-based level, including the slow effect
    pub fn ball_speed(&self, level: u32) -> f32 {
        let mut speed = BALL_BASE_SPEED + BALL_SPEED_PER_LEVEL * level.saturating_sub(1) as f32;
        if self.effects.slow.is_running() {
            speed *= SLOW_FACTOR;
        }
        speed.min(BALL_MAX_SPEED)
    }

    /// Drop a power-up at `pos`. Returns false when the pool is full.
    pub fn drop_power_up(&mut self, kind: PowerUpKind, pos: Vec2) -> bool {
        self.power_ups.spawn(PowerUp { kind, pos }).is_some()
    }

    fn build_level(&mut self, level: u32) {
        self.level_index = level.saturating_sub(1) as usize;
        let grid = layout(self.level_index, &mut self.rng);
        let theme = theme(self.level_index);
        self.bricks.clear();
        for (r, row) in grid.iter().enumerate() {
            for (c, &cell) in row.iter().enumerate() {
                if cell == 0 {
                    continue;
                }
                let hp = if cell == 2 { 2 } else { 1 };
                self.bricks.spawn(Brick {
                    rect: Rect::new(
                        BRICK_OFFSET_X + c as f32 * (BRICK_W + BRICK_PAD),
                        BRICK_OFFSET_Y + r as f32 * (BRICK_H + BRICK_PAD),
                        BRICK_W,
                        BRICK_H,
                    ),
                    hp,
                    max_hp: hp,
                    glyph: theme.chars[(r * BRICK_COLS + c) % theme.chars.len()],
                });
            }
        }
        log::debug!("Level {} layout: {} bricks", level, self.bricks.len());
    }

    /// Fresh paddle and power-up state for a level
    fn reset_field(&mut self, level: u32) {
        self.paddle = Paddle::default();
        self.power_ups.clear();
        self.pending_drops.clear();
        self.effects = ActiveEffects::default();
        self.build_level(level);
        self.reset_ball();
    }

    /// One ball back on the paddle; slow and pierce end with it
    fn reset_ball(&mut self) {
        self.balls.clear();
        self.balls.spawn(Ball {
            pos: self.paddle.serve_point(),
            vel: Vec2::ZERO,
            state: BallState::Attached,
        });
        self.effects.slow.cancel();
        self.effects.pierce.cancel();
    }

    /// Release attached balls. Returns true if any left the paddle.
    fn launch(&mut self, level: u32) -> bool {
        let speed = self.ball_speed(level);
        let mut launched = false;
        for ball in self.balls.iter_mut() {
            if ball.state == BallState::Attached {
                let angle = -PI / 2.0 + (self.rng.random::<f32>() - 0.5) * LAUNCH_SPREAD;
                ball.vel = Vec2::from_angle(angle) * speed;
                ball.state = BallState::Free;
                launched = true;
            }
        }
        launched
    }

    fn split_balls(&mut self, level: u32) {
        self.launch(level);
        let parents: Vec<Ball> = self.balls.iter().copied().collect();
        for parent in parents {
            for angle in [-SPLIT_ANGLE, SPLIT_ANGLE] {
                let child = Ball {
                    vel: Vec2::from_angle(angle).rotate(parent.vel),
                    ..parent
                };
                if !self.balls.spawn(child) {
                    return;
                }
            }
        }
    }

    fn apply_power_up(&mut self, kind: PowerUpKind, ctx: &mut TickContext<'_>) {
        log::debug!("Power-up {:?}", kind);
        ctx.out.play(Cue::PowerUp);
        ctx.session.bump("power_ups", 1);
        match kind {
            PowerUpKind::Multi => self.split_balls(ctx.session.level),
            PowerUpKind::Wide => {
                self.paddle.set_width(PADDLE_WIDE_W);
                self.effects.wide.restart(WIDE_SECS);
            }
            PowerUpKind::Slow => {
                if !self.effects.slow.is_running() {
                    for ball in self.balls.iter_mut() {
                        ball.vel *= SLOW_FACTOR;
                    }
                }
                self.effects.slow.restart(SLOW_SECS);
            }
            PowerUpKind::Pierce => self.effects.pierce.restart(PIERCE_SECS),
            PowerUpKind::Life => ctx.session.heal(1),
        }
    }

    fn roll_power_up(&mut self, at_max_lives: bool) -> PowerUpKind {
        let choices = if at_max_lives {
            &PowerUpKind::ALL[..4]
        } else {
            &PowerUpKind::ALL[..]
        };
        choices[self.rng.random_range(0..choices.len())]
    }

    fn lose_ball(&mut self, ctx: &mut TickContext<'_>) {
        ctx.session.break_combo();
        if ctx.session.damage(1) {
            ctx.fx.add_shake(1.0);
            return;
        }
        log::debug!("Ball lost, {} lives left", ctx.session.health);
        ctx.out.play(Cue::LoseLife);
        ctx.out.emit(GameEvent::LifeLost);
        ctx.fx.add_shake(0.4);
        self.reset_ball();
    }
}

impl GameRules for Breakout {
    fn name(&self) -> &'static str {
        "breakout"
    }

    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            max_health: MAX_LIVES,
            start_health: START_LIVES,
            ready_secs: 1.0,
            level_clear_secs: 2.0,
            quit_ends_run: false,
        }
    }

    fn new_run(&mut self, seed: u64, session: &mut Session, _now_ms: f64) {
        self.rng = Pcg32::seed_from_u64(seed);
        self.reset_field(session.level);
    }

    fn start_level(&mut self, session: &mut Session, _now_ms: f64) {
        self.reset_field(session.level);
    }

    fn on_action(&mut self, action: Action, ctx: &mut TickContext<'_>) {
        if matches!(action, Action::Fire | Action::Confirm) && self.launch(ctx.session.level) {
            ctx.out.play(Cue::Bounce);
        }
    }

    fn spawn(&mut self, ctx: &mut TickContext<'_>) {
        let at_max = ctx.session.health >= ctx.session.config.max_health;
        for pos in std::mem::take(&mut self.pending_drops) {
            if !self.rng.random_bool(DROP_CHANCE) {
                continue;
            }
            let kind = self.roll_power_up(at_max);
            if !self.drop_power_up(kind, pos) {
                log::debug!("Power-up pool full, drop skipped");
            }
        }
    }

    fn integrate(&mut self, ctx: &mut TickContext<'_>) {
        let dt = ctx.dt;
        self.paddle.move_by(ctx.held.axis() * PADDLE_SPEED * dt);
        let serve = self.paddle.serve_point();
        for ball in self.balls.iter_mut() {
            match ball.state {
                BallState::Attached => ball.pos = serve,
                BallState::Free => ball.pos += ball.vel * dt,
            }
        }
        for (_, power_up) in self.power_ups.iter_mut() {
            power_up.pos.y += POWER_UP_FALL_SPEED * dt;
        }
    }

    fn collide(&mut self, ctx: &mut TickContext<'_>) {
        let field = Rect::new(0.0, 0.0, FIELD_W, FIELD_H);
        let paddle = self.paddle.rect();
        let piercing = self.effects.pierce.is_running();
        let tint = theme(self.level_index).tint;

        for ball in self.balls.iter_mut() {
            if ball.state != BallState::Free {
                continue;
            }
            if bounce_in_bounds(&mut ball.pos, &mut ball.vel, BALL_RADIUS, &field) {
                ctx.out.play(Cue::Bounce);
            }
            if ball.pos.y > FIELD_H + BALL_RADIUS {
                continue;
            }

            if ball.vel.y > 0.0 && circle_rect_contact(Circle::new(ball.pos, BALL_RADIUS), &paddle).is_some() {
                let t = (ball.pos.x - paddle.x) / paddle.w;
                let speed = ball.vel.length();
                ball.vel = Vec2::from_angle(paddle_angle(t)) * speed;
                ball.pos.y = PADDLE_Y - BALL_RADIUS;
                ctx.out.play(Cue::Bounce);
            }

            // At most one brick per ball per tick
            let circle = Circle::new(ball.pos, BALL_RADIUS);
            let Some(id) = self
                .bricks
                .iter()
                .find(|(_, b)| circle_rect_contact(circle, &b.rect).is_some())
                .map(|(id, _)| id)
            else {
                continue;
            };
            let Some(brick) = self.bricks.get_mut(id) else {
                continue;
            };
            if !piercing {
                resolve_circle_rect(&mut ball.pos, &mut ball.vel, BALL_RADIUS, &brick.rect);
            }
            brick.hp = brick.hp.saturating_sub(1);
            let brick = *brick;
            let center = brick.rect.center();

            if brick.hp == 0 {
                self.bricks.release(id);
                ctx.session.add_score(brick.points());
                let combo = ctx.session.extend_combo();
                ctx.session.bump("bricks", 1);
                // Chained breaks rise in pitch
                if combo > 1 {
                    ctx.out.play(Cue::Collect { combo });
                } else {
                    ctx.out.play(Cue::BrickBreak);
                }
                ctx.fx.burst(
                    &mut self.rng,
                    center,
                    Burst {
                        kind: ParticleKind::Petal,
                        count: 8,
                        speed: (40.0, 120.0),
                        life: 0.8,
                        size: 4.0,
                        tint,
                    },
                );
                ctx.fx.burst(&mut self.rng, center, Burst::sparks(4, GOLD));
                self.pending_drops.push(Vec2::new(center.x, brick.rect.bottom()));
            } else {
                ctx.out.play(Cue::BrickHit);
                ctx.fx.burst(&mut self.rng, center, Burst::sparks(3, WHITE));
            }
            ctx.fx.add_shake(0.1);
        }

        let had_balls = !self.balls.is_empty();
        self.balls.retain(|b| b.pos.y <= FIELD_H + BALL_RADIUS);
        if had_balls && self.balls.is_empty() {
            self.lose_ball(ctx);
        }

        let mut caught = Vec::new();
        let paddle = self.paddle.rect();
        self.power_ups.retain(|p| {
            if p.bounds().overlaps(&paddle) {
                caught.push(p.kind);
                false
            } else {
                p.pos.y <= FIELD_H + 20.0
            }
        });
        for kind in caught {
            self.apply_power_up(kind, ctx);
        }

        if self.bricks.is_empty() && ctx.session.clear_level() {
            for i in 0..5 {
                let pos = Vec2::new(FIELD_W * (0.1 + 0.2 * i as f32), 120.0);
                ctx.fx.burst(
                    &mut self.rng,
                    pos,
                    Burst {
                        kind: ParticleKind::Petal,
                        count: 12,
                        speed: (30.0, 140.0),
                        life: 1.2,
                        size: 5.0,
                        tint: GOLD,
                    },
                );
            }
        }
    }

    fn decay(&mut self, ctx: &mut TickContext<'_>) {
        // Timers hold while serving
        if self.serving() {
            return;
        }
        let dt = ctx.dt;
        if self.effects.wide.tick(dt) {
            self.paddle.set_width(PADDLE_W);
        }
        self.effects.pierce.tick(dt);
        if self.effects.slow.tick(dt) {
            let target = self.ball_speed(ctx.session.level);
            for ball in self.balls.iter_mut() {
                let speed = ball.vel.length();
                if speed > 0.0 {
                    ball.vel *= target / speed;
                }
            }
        }
    }

    fn achievements(&self) -> &'static [Achievement] {
        ACHIEVEMENTS
    }

    fn sprites(&self, out: &mut Vec<Sprite>) {
        let tint = theme(self.level_index).tint;
        for (_, brick) in self.bricks.iter() {
            let center = brick.rect.center();
            let (fill, alpha) = match (brick.is_hard(), brick.hp < brick.max_hp) {
                (true, true) => (HARD_TINT, 0.55),
                (true, false) => (HARD_TINT, 1.0),
                _ => (tint, 1.0),
            };
            out.push(Sprite::rect(center, brick.rect.half_extents(), fill).with_alpha(alpha));
            out.push(Sprite::glyph(brick.glyph, center, BRICK_H * 0.7, WHITE));
        }
        for (_, power_up) in self.power_ups.iter() {
            out.push(Sprite::rect(power_up.pos, POWER_UP_HALF, power_up.kind.tint()));
            out.push(Sprite::glyph(power_up.kind.glyph(), power_up.pos, 12.0, WHITE));
        }
        let paddle = self.paddle.rect();
        let paddle_tint = if self.effects.wide.is_running() {
            PowerUpKind::Wide.tint()
        } else {
            PADDLE_TINT
        };
        out.push(Sprite::rect(paddle.center(), paddle.half_extents(), paddle_tint));
        let ball_tint = if self.effects.pierce.is_running() {
            PIERCE_TINT
        } else {
            WHITE
        };
        for ball in self.balls.iter() {
            out.push(Sprite::circle(ball.pos, BALL_RADIUS, ball_tint));
        }
    }

    fn scene(&self, _session: &Session) -> u8 {
        (self.level_index % LAYOUT_COUNT) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::HeldInput;
    use crate::sim::effects::Effects;
    use crate::sim::state::GamePhase;
    use crate::sim::tick::Outbox;

    const DT: f32 = 1.0 / 60.0;

    struct Harness {
        rules: Breakout,
        session: Session,
        held: HeldInput,
        fx: Effects,
        out: Outbox,
    }

    impl Harness {
        fn new() -> Self {
            let mut rules = Breakout::new();
            let mut session = Session::new(rules.session_config());
            session.restart();
            session.phase = GamePhase::Playing;
            rules.new_run(9, &mut session, 0.0);
            Self {
                rules,
                session,
                held: HeldInput::default(),
                fx: Effects::new(64, true),
                out: Outbox::default(),
            }
        }

        fn with_ctx(&mut self, dt: f32, f: impl FnOnce(&mut Breakout, &mut TickContext<'_>)) {
            let mut ctx = TickContext {
                session: &mut self.session,
                held: &self.held,
                dt,
                now_ms: 0.0,
                fx: &mut self.fx,
                out: &mut self.out,
            };
            f(&mut self.rules, &mut ctx);
        }

        fn tick(&mut self) {
            self.with_ctx(DT, |rules, ctx| {
                rules.spawn(ctx);
                rules.integrate(ctx);
                rules.collide(ctx);
                rules.decay(ctx);
            });
        }

        fn act(&mut self, action: Action) {
            self.with_ctx(0.0, |rules, ctx| rules.on_action(action, ctx));
        }

        fn place_ball(&mut self, pos: Vec2, vel: Vec2) {
            let ball = &mut self.rules.balls.as_mut_slice()[0];
            ball.pos = pos;
            ball.vel = vel;
            ball.state = BallState::Free;
        }
    }

    fn count(grid: &[[u8; BRICK_COLS]; BRICK_ROWS], value: u8) -> usize {
        grid.iter().flatten().filter(|&&c| c == value).count()
    }

    #[test]
    fn test_layouts() {
        let mut rng = Pcg32::seed_from_u64(1);
        let pyramid = layout(0, &mut rng);
        assert_eq!(count(&pyramid, 1), 45);
        assert_eq!(count(&pyramid, 2), 0);

        let checker = layout(1, &mut rng);
        assert_eq!(count(&checker, 1) + count(&checker, 2), 32);
        assert_eq!(count(&checker, 2), 4);

        let stripes = layout(2, &mut rng);
        assert_eq!(count(&stripes, 1) + count(&stripes, 2), 36);
        assert_eq!(count(&stripes, 2), 3);

        let diamond = layout(3, &mut rng);
        assert_eq!(count(&diamond, 2), 5);

        let wall = layout(4, &mut rng);
        assert_eq!(count(&wall, 0), 0);

        // Level 6 repeats level 1
        assert_eq!(layout(5, &mut rng), pyramid);
    }

    #[test]
    fn test_new_run_serves_one_ball() {
        let h = Harness::new();
        assert_eq!(h.rules.bricks().len(), 45);
        assert_eq!(h.rules.balls().len(), 1);
        assert!(h.rules.serving());
        assert_eq!(h.session.health, START_LIVES);
    }

    #[test]
    fn test_ball_speed_by_level() {
        let mut rules = Breakout::new();
        assert_eq!(rules.ball_speed(1), 320.0);
        assert_eq!(rules.ball_speed(3), 360.0);
        assert_eq!(rules.ball_speed(30), BALL_MAX_SPEED);
        rules.effects.slow.restart(SLOW_SECS);
        assert!((rules.ball_speed(1) - 192.0).abs() < 1e-3);
    }

    #[test]
    fn test_paddle_angle_range() {
        assert!((paddle_angle(0.5) + PI / 2.0).abs() < 1e-6);
        assert!((paddle_angle(0.0) + 0.15 * PI).abs() < 1e-6);
        assert!((paddle_angle(1.0) + 0.85 * PI).abs() < 1e-6);
        assert_eq!(paddle_angle(-3.0), paddle_angle(0.0));
    }

    #[test]
    fn test_attached_ball_follows_paddle() {
        let mut h = Harness::new();
        h.held.right = true;
        for _ in 0..30 {
            h.tick();
        }
        // 210 px of travel runs into the right wall
        let paddle = *h.rules.paddle();
        assert_eq!(paddle.x, FIELD_W - PADDLE_W);
        assert_eq!(h.rules.balls()[0].pos, paddle.serve_point());
    }

    #[test]
    fn test_launch_moves_ball_up() {
        let mut h = Harness::new();
        h.act(Action::Fire);
        assert!(!h.rules.serving());
        let ball = h.rules.balls()[0];
        assert!(ball.vel.y < 0.0);
        assert!((ball.vel.length() - 320.0).abs() < 1e-2);
        // A second press does nothing
        h.out.cues.clear();
        h.act(Action::Fire);
        assert!(h.out.cues.is_empty());
    }

    #[test]
    fn test_paddle_center_hit_goes_straight_up() {
        let mut h = Harness::new();
        h.place_ball(Vec2::new(240.0, PADDLE_Y - 3.0), Vec2::new(0.0, 300.0));
        h.tick();
        let ball = h.rules.balls()[0];
        assert!(ball.vel.y < 0.0);
        assert!(ball.vel.x.abs() < 1e-2);
        assert!((ball.vel.length() - 300.0).abs() < 1e-2);
        assert_eq!(ball.pos.y, PADDLE_Y - BALL_RADIUS);
    }

    #[test]
    fn test_brick_break_scores_and_bounces() {
        let mut h = Harness::new();
        // Bottom row of the pyramid, column 4: bottom edge at y = 248
        h.place_ball(Vec2::new(244.0, 260.0), Vec2::new(0.0, -600.0));
        h.tick();
        assert_eq!(h.rules.bricks().len(), 44);
        assert_eq!(h.session.score, BRICK_SCORE);
        assert_eq!(h.session.combo, 1);
        assert!(h.rules.balls()[0].vel.y > 0.0);
        assert_eq!(h.rules.pending_drops.len(), 1);
        assert!(h.out.cues.contains(&Cue::BrickBreak));
    }

    #[test]
    fn test_chained_break_plays_rising_cue() {
        let mut h = Harness::new();
        for _ in 0..3 {
            h.session.extend_combo();
        }
        h.place_ball(Vec2::new(244.0, 260.0), Vec2::new(0.0, -600.0));
        h.tick();
        assert_eq!(h.session.combo, 4);
        assert!(h.out.cues.contains(&Cue::Collect { combo: 4 }));
        assert!(!h.out.cues.contains(&Cue::BrickBreak));
    }

    #[test]
    fn test_pierce_passes_through() {
        let mut h = Harness::new();
        h.rules.effects.pierce.restart(PIERCE_SECS);
        h.place_ball(Vec2::new(244.0, 260.0), Vec2::new(0.0, -600.0));
        h.tick();
        assert_eq!(h.rules.bricks().len(), 44);
        assert!(h.rules.balls()[0].vel.y < 0.0);
    }

    #[test]
    fn test_hard_brick_takes_two_hits() {
        let mut h = Harness::new();
        let (id, rect) = {
            let (id, brick) = h.rules.bricks.iter().last().unwrap();
            (id, brick.rect)
        };
        if let Some(brick) = h.rules.bricks.get_mut(id) {
            brick.hp = 2;
            brick.max_hp = 2;
        }
        let below = Vec2::new(rect.center().x, rect.bottom() + 12.0);
        h.place_ball(below, Vec2::new(0.0, -600.0));
        h.tick();
        assert_eq!(h.rules.bricks.get(id).map(|b| b.hp), Some(1));
        assert!(h.out.cues.contains(&Cue::BrickHit));
        h.place_ball(below, Vec2::new(0.0, -600.0));
        h.tick();
        assert!(!h.rules.bricks.is_active(id));
        assert_eq!(h.session.score, HARD_BRICK_SCORE);
    }

    #[test]
    fn test_losing_last_ball_costs_a_life() {
        let mut h = Harness::new();
        h.session.extend_combo();
        h.place_ball(Vec2::new(240.0, 700.0), Vec2::new(0.0, 300.0));
        h.tick();
        assert_eq!(h.session.health, START_LIVES - 1);
        assert_eq!(h.session.combo, 0);
        assert!(h.rules.serving());
        assert!(h.out.events.contains(&GameEvent::LifeLost));
        assert!(h.out.cues.contains(&Cue::LoseLife));
    }

    #[test]
    fn test_last_life_ends_run() {
        let mut h = Harness::new();
        h.session.health = 1;
        h.place_ball(Vec2::new(240.0, 700.0), Vec2::new(0.0, 300.0));
        h.tick();
        assert_eq!(h.session.phase, GamePhase::GameOver);
        assert!(!h.out.events.contains(&GameEvent::LifeLost));
    }

    #[test]
    fn test_multi_split_caps_ball_count() {
        let mut h = Harness::new();
        h.with_ctx(0.0, |rules, ctx| rules.apply_power_up(PowerUpKind::Multi, ctx));
        assert_eq!(h.rules.balls().len(), 3);
        assert!(!h.rules.serving());
        h.with_ctx(0.0, |rules, ctx| rules.apply_power_up(PowerUpKind::Multi, ctx));
        assert_eq!(h.rules.balls().len(), MAX_BALLS);
        let speed = h.rules.balls()[0].vel.length();
        assert!(h.rules.balls().iter().all(|b| (b.vel.length() - speed).abs() < 1e-2));
        assert_eq!(h.session.counter("power_ups"), 2);
    }

    #[test]
    fn test_wide_expires_after_ten_seconds() {
        let mut h = Harness::new();
        h.act(Action::Fire);
        h.with_ctx(0.0, |rules, ctx| rules.apply_power_up(PowerUpKind::Wide, ctx));
        assert_eq!(h.rules.paddle().w, PADDLE_WIDE_W);
        h.with_ctx(9.9, |rules, ctx| rules.decay(ctx));
        assert_eq!(h.rules.paddle().w, PADDLE_WIDE_W);
        h.with_ctx(0.2, |rules, ctx| rules.decay(ctx));
        assert_eq!(h.rules.paddle().w, PADDLE_W);
    }

    #[test]
    fn test_slow_scales_and_restores_speed() {
        let mut h = Harness::new();
        h.act(Action::Fire);
        h.with_ctx(0.0, |rules, ctx| rules.apply_power_up(PowerUpKind::Slow, ctx));
        assert!((h.rules.balls()[0].vel.length() - 192.0).abs() < 1e-2);
        // A second slow extends instead of stacking
        h.with_ctx(0.0, |rules, ctx| rules.apply_power_up(PowerUpKind::Slow, ctx));
        assert!((h.rules.balls()[0].vel.length() - 192.0).abs() < 1e-2);
        h.with_ctx(SLOW_SECS + 0.1, |rules, ctx| rules.decay(ctx));
        assert!((h.rules.balls()[0].vel.length() - 320.0).abs() < 1e-2);
    }

    #[test]
    fn test_timers_hold_while_serving() {
        let mut h = Harness::new();
        h.rules.effects.wide.restart(WIDE_SECS);
        h.with_ctx(20.0, |rules, ctx| rules.decay(ctx));
        assert!(h.rules.active_effects().wide.is_running());
    }

    #[test]
    fn test_life_power_up_caps_at_max() {
        let mut h = Harness::new();
        for _ in 0..4 {
            h.with_ctx(0.0, |rules, ctx| rules.apply_power_up(PowerUpKind::Life, ctx));
        }
        assert_eq!(h.session.health, MAX_LIVES);
    }

    #[test]
    fn test_caught_power_up_applies() {
        let mut h = Harness::new();
        let paddle = h.rules.paddle().rect();
        assert!(h.rules.drop_power_up(PowerUpKind::Pierce, Vec2::new(paddle.center().x, PADDLE_Y - 5.0)));
        h.tick();
        assert!(h.rules.power_ups().is_empty());
        assert!(h.rules.active_effects().pierce.is_running());
        assert!(h.out.cues.contains(&Cue::PowerUp));
    }

    #[test]
    fn test_missed_power_up_falls_away() {
        let mut h = Harness::new();
        h.rules.drop_power_up(PowerUpKind::Life, Vec2::new(10.0, FIELD_H + 25.0));
        h.tick();
        assert!(h.rules.power_ups().is_empty());
        assert_eq!(h.session.health, START_LIVES);
    }

    #[test]
    fn test_last_brick_clears_level() {
        let mut h = Harness::new();
        let ids: Vec<_> = h.rules.bricks.iter().map(|(id, _)| id).collect();
        let (keep, rest) = ids.split_last().unwrap();
        for id in rest {
            h.rules.bricks.release(*id);
        }
        let rect = h.rules.bricks.get(*keep).unwrap().rect;
        h.place_ball(Vec2::new(rect.center().x, rect.bottom() + 12.0), Vec2::new(0.0, -600.0));
        h.tick();
        assert!(h.rules.bricks().is_empty());
        assert_eq!(h.session.phase, GamePhase::LevelClear);

        h.session.level = 2;
        h.rules.start_level(&mut h.session, 0.0);
        assert_eq!(h.rules.bricks().len(), 32);
        assert!(h.rules.serving());
        assert_eq!(h.rules.scene(&h.session), 1);
    }

    #[test]
    fn test_roll_skips_life_at_max() {
        let mut rules = Breakout::new();
        for _ in 0..200 {
            assert_ne!(rules.roll_power_up(true), PowerUpKind::Life);
        }
    }

    #[test]
    fn test_sprites_cover_entities() {
        let h = Harness::new();
        let mut sprites = Vec::new();
        h.rules.sprites(&mut sprites);
        // Rect + glyph per brick, paddle, ball
        assert_eq!(sprites.len(), 45 * 2 + 2);
    }
}
