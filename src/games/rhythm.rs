//! Four-lane rhythm rule set
//!
//! Characters fall down four lanes, one per beat. The tempo climbs with
//! play time and notes fall faster. Above 120 and 160 BPM, extra notes
//! stream in on their own [`Spawner`] timers at a fraction of the beat
//! rate, so they thicken as the tempo climbs. A lane press grades the
//! nearest note against the hit line; a note that falls past the line
//! unhit is a miss and costs health.
//!
//! The beat is an absolute [`Deadline`] in the session, so a pause keeps
//! the time left until the next beat.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::{GOLD, WHITE};
use crate::achievements::Achievement;
use crate::audio::{Cue, PENTA_FREQS};
use crate::sim::difficulty::{DifficultyCurve, Ramp};
use crate::sim::effects::{Burst, ParticleKind};
use crate::sim::lane::{self, HitQuality, HitWindows};
use crate::sim::pool::SlotPool;
use crate::sim::snapshot::{Shape, Sprite};
use crate::sim::spawner::{Spawner, pick_lane};
use crate::sim::state::{Action, Session, SessionConfig};
use crate::sim::tick::{GameEvent, GameRules, TickContext};
use crate::sim::timer::{Countdown, Deadline};

pub const FIELD_W: f32 = 400.0;
pub const FIELD_H: f32 = 640.0;
pub const LANES: usize = 4;
pub const LANE_W: f32 = FIELD_W / LANES as f32;
pub const HIT_LINE: f32 = FIELD_H * 0.82;
/// Past the hit line by this much, an unhit note is missed
pub const MISS_GRACE: f32 = FIELD_H * (0.10 + 0.05);
/// A lane with a note above this line is congested
pub const MIN_GAP: f32 = FIELD_H * 0.15;
pub const SPAWN_Y: f32 = -40.0;
pub const MAX_NOTES: usize = 64;
/// Pixels per second
const MIN_NOTE_SPEED: f32 = 90.0;
/// A fresh note reaches the hit line in about this many beats
const BEATS_TO_LINE: f32 = 1.2;

pub const MISS_DAMAGE: i32 = 8;
pub const PERFECT_HEAL: i32 = 3;
pub const HIT_HEAL: i32 = 1;

/// Deadline key for the next beat
pub const BEAT: &str = "beat";

/// Extra note streams: (BPM threshold, share of the beat rate)
const EXTRA_STREAMS: [(f32, f32); 2] = [(120.0, 0.3), (160.0, 0.4)];

/// Tempo climbs 0.3 BPM per second from 80 to 200; speed doubles over three minutes
pub const CURVE: DifficultyCurve = DifficultyCurve {
    pace: Ramp::Linear {
        base: 80.0,
        rate: 0.3,
        cap: 200.0,
    },
    speed_ramp: Ramp::Linear {
        base: 1.0,
        rate: 1.0 / 180.0,
        cap: 3.0,
    },
    // Seconds per minute over BPM gives the beat interval
    base_interval: 60.0,
    min_interval: 0.3,
    base_speed: 1.0,
    max_speed: 3.0,
};

const GOOD_TINT: u32 = 0x88ccff;
const OK_TINT: u32 = 0xaaaaaa;
const MISS_TINT: u32 = 0xff4444;
const LANE_TINT: u32 = 0x8888aa;

/// Glyphs and their meanings
pub static ZEN_CHARS: [(char, &str); 16] = [
    ('空', "一切皆空，萬法無常"),
    ('定', "心如止水，不動如山"),
    ('慧', "智慧明照，破除無明"),
    ('淨', "清淨本心，無染無著"),
    ('悟', "頓悟自性，本自清淨"),
    ('禪', "禪定功夫，觀照內心"),
    ('念', "正念分明，活在當下"),
    ('覺', "覺察萬物，如實知見"),
    ('捨', "放下執著，自在無礙"),
    ('忍', "忍辱波羅蜜，逆境修心"),
    ('施', "佈施無畏，廣結善緣"),
    ('戒', "持戒清淨，身心安寧"),
    ('觀', "觀自在，照五蘊皆空"),
    ('行', "精進不懈，行菩薩道"),
    ('願', "發大願心，度一切苦"),
    ('心', "三界唯心，萬法唯識"),
];

pub struct Milestone {
    pub threshold: u32,
    pub title: &'static str,
    pub quote: &'static str,
}

pub static MILESTONES: [Milestone; 5] = [
    Milestone { threshold: 10, title: "初入禪境", quote: "靜心觀照" },
    Milestone { threshold: 25, title: "漸入佳境", quote: "定慧雙修" },
    Milestone { threshold: 50, title: "三昧現前", quote: "一心不亂" },
    Milestone { threshold: 75, title: "禪悅法喜", quote: "法喜充滿" },
    Milestone { threshold: 100, title: "圓滿證悟", quote: "頓超直入" },
];

/// Background scenes by combo threshold: (threshold, name, particle tint)
pub static SCENES: [(u32, &str, u32); 4] = [
    (0, "枯山水", 0x8888aa),
    (10, "春芽", 0x66cc88),
    (25, "盛花", 0xff88cc),
    (50, "極樂淨土", 0xffdd66),
];

static ACHIEVEMENTS: &[Achievement] = &[
    Achievement {
        id: "first_perfect",
        name: "初心",
        desc: "First PERFECT",
        check: |_, s| s.counter("perfect") >= 1,
    },
    Achievement {
        id: "combo_10",
        name: "精進",
        desc: "Reach a 10 combo",
        check: |_, s| s.max_combo >= 10,
    },
    Achievement {
        id: "combo_25",
        name: "禪定",
        desc: "Reach a 25 combo",
        check: |_, s| s.max_combo >= 25,
    },
    Achievement {
        id: "combo_50",
        name: "三昧",
        desc: "Reach a 50 combo",
        check: |_, s| s.max_combo >= 50,
    },
    Achievement {
        id: "perfect_10",
        name: "明鏡",
        desc: "10 PERFECT hits in one run",
        check: |_, s| s.counter("perfect") >= 10,
    },
    Achievement {
        id: "perfect_30",
        name: "般若",
        desc: "30 PERFECT hits in one run",
        check: |_, s| s.counter("perfect") >= 30,
    },
    Achievement {
        id: "score_1000",
        name: "功德",
        desc: "Score 1000 in one run",
        check: |_, s| s.score >= 1000,
    },
    Achievement {
        id: "score_5000",
        name: "圓滿",
        desc: "Score 5000 in one run",
        check: |_, s| s.score >= 5000,
    },
    Achievement {
        id: "all_chars",
        name: "法藏",
        desc: "Collect every character",
        check: |p, _| p.collected.len() >= ZEN_CHARS.len(),
    },
    Achievement {
        id: "no_miss",
        name: "不動心",
        desc: "Finish a run of more than 10 hits without a miss",
        check: |_, s| s.game_over && s.counter("miss") == 0 && s.counter("hits") > 10,
    },
];

/// Inclusive grading windows: 3%, 6% and 10% of the field height
pub fn windows() -> HitWindows {
    HitWindows::scaled(FIELD_H, 0.03, 0.06, 0.10)
}

pub fn bpm(elapsed: f32) -> f32 {
    CURVE.pace.at(elapsed)
}

/// Milliseconds between beats
pub fn beat_ms(elapsed: f32) -> f64 {
    f64::from(CURVE.spawn_interval(elapsed)) * 1000.0
}

/// Base fall speed before per-note jitter
pub fn note_speed(elapsed: f32) -> f32 {
    let to_line = CURVE.spawn_interval(elapsed) * BEATS_TO_LINE;
    (FIELD_H / to_line * CURVE.speed(elapsed)).max(MIN_NOTE_SPEED)
}

pub fn lane_center(lane: usize) -> f32 {
    (lane as f32 + 0.5) * LANE_W
}

/// Index into [`SCENES`] for a combo
pub fn scene_for(combo: u32) -> usize {
    SCENES.iter().rposition(|(threshold, _, _)| combo >= *threshold).unwrap_or(0)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Note {
    pub lane: usize,
    pub y: f32,
    /// Pixels per second
    pub speed: f32,
    /// Index into [`ZEN_CHARS`]
    pub glyph: usize,
}

pub struct Rhythm {
    rng: Pcg32,
    notes: SlotPool<Note>,
    /// Highest milestone fired since the last miss
    last_milestone: u32,
    /// Glyph whose meaning is on show after a perfect hit
    meaning: Option<usize>,
    meaning_timer: Countdown,
    beat_pulse: f32,
    line_glow: f32,
    extras: [Spawner; EXTRA_STREAMS.len()],
}

impl Default for Rhythm {
    fn default() -> Self {
        Self::new()
    }
}

impl Rhythm {
    pub fn new() -> Self {
        Self {
            rng: Pcg32::seed_from_u64(0),
            notes: SlotPool::new(MAX_NOTES),
            last_milestone: 0,
            meaning: None,
            meaning_timer: Countdown::idle(),
            beat_pulse: 0.0,
            line_glow: 0.0,
            extras: [Spawner::new(); EXTRA_STREAMS.len()],
        }
    }

    pub fn notes(&self) -> &SlotPool<Note> {
        &self.notes
    }

    pub fn meaning(&self) -> Option<&'static str> {
        self.meaning.map(|i| ZEN_CHARS[i].1)
    }

    /// 1 on a beat, fading toward 0
    pub fn beat_pulse(&self) -> f32 {
        self.beat_pulse
    }

    /// Place a note directly (scripted charts, tests)
    pub fn place_note(&mut self, lane: usize, y: f32, speed: f32) -> bool {
        let glyph = self.rng.random_range(0..ZEN_CHARS.len());
        self.notes
            .spawn(Note {
                lane: lane % LANES,
                y,
                speed,
                glyph,
            })
            .is_some()
    }

    /// Spawn one note in an uncongested lane. False if every lane is busy or the pool is full.
    fn spawn_note(&mut self, elapsed: f32) -> bool {
        let start = self.rng.random_range(0..LANES);
        let notes = &self.notes;
        let Some(lane) = pick_lane(start, LANES, |lane| {
            notes.iter().any(|(_, n)| n.lane == lane && n.y < MIN_GAP)
        }) else {
            log::debug!("All lanes congested, note skipped");
            return false;
        };
        let glyph = self.rng.random_range(0..ZEN_CHARS.len());
        let speed = note_speed(elapsed) * self.rng.random_range(0.9..1.1);
        self.notes
            .spawn(Note {
                lane,
                y: SPAWN_Y,
                speed,
                glyph,
            })
            .is_some()
    }

    /// Advance the extra streams; a stream below its tempo threshold stays at zero.
    fn spawn_extras(&mut self, elapsed: f32, dt: f32) {
        let tempo = bpm(elapsed);
        let beat = CURVE.spawn_interval(elapsed);
        let mut due = 0;
        for (spawner, (threshold, share)) in self.extras.iter_mut().zip(EXTRA_STREAMS) {
            if tempo <= threshold {
                spawner.reset();
            } else if spawner.try_spawn(dt, beat / share) {
                due += 1;
            }
        }
        for _ in 0..due {
            self.spawn_note(elapsed);
        }
    }

    fn hit(&mut self, note: Note, quality: HitQuality, ctx: &mut TickContext<'_>) {
        let combo = ctx.session.combo as f32;
        let (points, heal, tint, counter, sparks) = match quality {
            HitQuality::Perfect => (100.0 * (1.0 + combo * 0.1), PERFECT_HEAL, GOLD, "perfect", 20),
            HitQuality::Good => (60.0 * (1.0 + combo * 0.05), HIT_HEAL, GOOD_TINT, "good", 12),
            _ => (30.0, HIT_HEAL, OK_TINT, "ok", 6),
        };
        ctx.session.add_score(points as u64);
        let combo = ctx.session.extend_combo();
        ctx.session.heal(heal);
        ctx.session.bump(counter, 1);
        ctx.session.bump("hits", 1);

        let (ch, _) = ZEN_CHARS[note.glyph];
        ctx.out.emit(GameEvent::Collected(ch.to_string()));
        ctx.out.play(Cue::Hit {
            quality,
            pitch: self.rng.random_range(0..PENTA_FREQS.len()) as u8,
        });

        let pos = Vec2::new(lane_center(note.lane), HIT_LINE);
        ctx.fx.show_feedback(quality.label(), pos - Vec2::new(0.0, 30.0), tint, 0.6);
        let spark_tint = if quality == HitQuality::Ok {
            SCENES[scene_for(combo)].2
        } else {
            tint
        };
        ctx.fx.burst(
            &mut self.rng,
            pos,
            Burst {
                kind: ParticleKind::Petal,
                count: sparks,
                speed: (90.0, 270.0),
                life: 0.9,
                size: 3.5,
                tint: spark_tint,
            },
        );
        ctx.fx.burst(
            &mut self.rng,
            pos,
            Burst {
                kind: ParticleKind::Glyph(ch),
                count: 1,
                speed: (0.0, 0.0),
                life: 0.8,
                size: 28.0,
                tint,
            },
        );
        ctx.fx.ripple(pos, 60.0, 0.5);
        self.line_glow = 1.0;

        if quality == HitQuality::Perfect {
            ctx.fx.burst(
                &mut self.rng,
                pos,
                Burst {
                    kind: ParticleKind::Ring,
                    count: 1,
                    speed: (0.0, 0.0),
                    life: 0.5,
                    size: 5.0,
                    tint: GOLD,
                },
            );
            ctx.fx.add_shake(0.3);
            self.meaning = Some(note.glyph);
            self.meaning_timer.restart(1.3);
        }

        self.check_milestone(combo, ctx);
    }

    /// Fire the first milestone crossed since the last one, at most one per hit
    fn check_milestone(&mut self, combo: u32, ctx: &mut TickContext<'_>) {
        let Some(m) = MILESTONES
            .iter()
            .find(|m| combo >= m.threshold && self.last_milestone < m.threshold)
        else {
            return;
        };
        self.last_milestone = m.threshold;
        log::debug!("Combo milestone {}", m.threshold);
        ctx.out.play(Cue::Milestone);
        ctx.out.emit(GameEvent::Milestone {
            threshold: m.threshold,
            title: m.title,
        });
        ctx.fx.show_banner(format!("{} {}", m.title, m.quote), GOLD, 1.7);
        ctx.fx.add_shake(0.8);
        ctx.fx.burst(
            &mut self.rng,
            Vec2::new(FIELD_W / 2.0, FIELD_H / 2.0),
            Burst {
                kind: ParticleKind::Spark,
                count: 30,
                speed: (180.0, 420.0),
                life: 1.2,
                size: 4.0,
                tint: GOLD,
            },
        );
    }

    fn miss(&mut self, note: Note, ctx: &mut TickContext<'_>) {
        ctx.session.bump("miss", 1);
        ctx.session.break_combo();
        self.last_milestone = 0;
        ctx.session.damage(MISS_DAMAGE);
        ctx.out.play(Cue::Miss);
        ctx.fx.add_shake(0.5);
        let pos = Vec2::new(lane_center(note.lane), HIT_LINE);
        ctx.fx.show_feedback(HitQuality::Miss.label(), pos, MISS_TINT, 0.66);
    }
}

impl GameRules for Rhythm {
    fn name(&self) -> &'static str {
        "rhythm"
    }

    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            max_health: 100,
            start_health: 100,
            ready_secs: 0.0,
            level_clear_secs: 0.0,
            quit_ends_run: true,
        }
    }

    fn new_run(&mut self, seed: u64, session: &mut Session, now_ms: f64) {
        self.rng = Pcg32::seed_from_u64(seed);
        self.notes.clear();
        self.last_milestone = 0;
        self.meaning = None;
        self.meaning_timer.cancel();
        self.beat_pulse = 0.0;
        self.line_glow = 0.0;
        self.extras.iter_mut().for_each(Spawner::reset);
        session.deadlines.set(BEAT, Deadline::after(now_ms, beat_ms(0.0)));
    }

    fn on_action(&mut self, action: Action, ctx: &mut TickContext<'_>) {
        let Action::Lane(lane) = action else {
            return;
        };
        let lane = lane as usize;
        if lane >= LANES {
            return;
        }
        let candidates = self.notes.iter().map(|(id, n)| (id, n.lane, n.y));
        // Nothing in range is not a miss
        let Some((id, quality)) = lane::judge(candidates, lane, HIT_LINE, &windows()) else {
            return;
        };
        let Some(note) = self.notes.get(id).copied() else {
            return;
        };
        self.notes.release(id);
        self.hit(note, quality, ctx);
    }

    fn spawn(&mut self, ctx: &mut TickContext<'_>) {
        let elapsed = ctx.session.elapsed;
        ctx.session.raise_difficulty(CURVE.factor(elapsed));
        self.spawn_extras(elapsed, ctx.dt);
        if !ctx.session.deadlines.is_due(BEAT, ctx.now_ms) {
            return;
        }
        ctx.session
            .deadlines
            .set(BEAT, Deadline::after(ctx.now_ms, beat_ms(elapsed)));
        ctx.out.play(Cue::BeatTick);
        self.beat_pulse = 1.0;
        self.spawn_note(elapsed);
    }

    fn integrate(&mut self, ctx: &mut TickContext<'_>) {
        for (_, note) in self.notes.iter_mut() {
            note.y += note.speed * ctx.dt;
        }
    }

    fn collide(&mut self, ctx: &mut TickContext<'_>) {
        let mut missed = Vec::new();
        self.notes.retain(|n| {
            if lane::crossed_unconsumed(n.y, HIT_LINE, MISS_GRACE) {
                missed.push(*n);
                false
            } else {
                true
            }
        });
        for note in missed {
            self.miss(note, ctx);
        }
    }

    fn decay(&mut self, ctx: &mut TickContext<'_>) {
        let fade = (-5.0 * ctx.dt).exp();
        self.beat_pulse *= fade;
        self.line_glow *= fade;
        if self.meaning_timer.tick(ctx.dt) {
            self.meaning = None;
        }
    }

    fn achievements(&self) -> &'static [Achievement] {
        ACHIEVEMENTS
    }

    fn sprites(&self, out: &mut Vec<Sprite>) {
        for i in 1..LANES {
            out.push(
                Sprite::rect(
                    Vec2::new(i as f32 * LANE_W, FIELD_H / 2.0),
                    Vec2::new(0.5, FIELD_H / 2.0),
                    LANE_TINT,
                )
                .with_alpha(0.3),
            );
        }
        out.push(Sprite {
            shape: Shape::Line,
            pos: Vec2::new(FIELD_W / 2.0, HIT_LINE),
            half: Vec2::new(FIELD_W / 2.0, 1.0 + self.line_glow * 2.0),
            tint: GOLD,
            alpha: 0.4 + 0.6 * self.line_glow.max(self.beat_pulse * 0.5),
        });
        for (_, note) in self.notes.iter() {
            let pos = Vec2::new(lane_center(note.lane), note.y);
            out.push(Sprite::circle(pos, 20.0, LANE_TINT).with_alpha(0.25));
            out.push(Sprite::glyph(ZEN_CHARS[note.glyph].0, pos, 32.0, WHITE));
        }
    }

    fn scene(&self, session: &Session) -> u8 {
        scene_for(session.combo) as u8
    }
}
