//! Fixed timestep simulation tick
//!
//! [`Engine`] owns one game's rules, its session and clock, and the input,
//! audio and storage collaborators. The host calls [`Engine::frame`] once per
//! display refresh. Each tick then runs in a fixed order:
//!
//! 1. drain queued input (phase transitions, rule actions)
//! 2. spawn
//! 3. integrate
//! 4. collide
//! 5. decay effects
//!
//! Entities spawned in step 2 are integrated and collided in the same tick.
//! Rules never touch audio or storage directly: they push cues and events to
//! an [`Outbox`] that the engine dispatches after the tick.

use crate::achievements::{self, Achievement};
use crate::audio::{AudioSink, Cue};
use crate::persistence::{ProgressStore, Storage};
use crate::platform::{self, HeldInput, InputQueue};
use crate::progress::ProgressRecord;
use crate::settings::Settings;

use super::clock::FixedClock;
use super::effects::Effects;
use super::snapshot::{Snapshot, Sprite};
use super::state::{Action, GamePhase, Session, SessionConfig, Transition};

/// Something the host may want to show or log
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    RunStarted { seed: u64 },
    /// Item id to add to the persistent collection
    Collected(String),
    Milestone { threshold: u32, title: &'static str },
    LifeLost,
    LevelCleared(u32),
    LevelStarted(u32),
    Unlocked { id: &'static str, name: &'static str },
    NewBest(u64),
    RunEnded { score: u64 },
}

/// Side effects requested during a tick
#[derive(Debug, Default)]
pub struct Outbox {
    pub cues: Vec<Cue>,
    pub events: Vec<GameEvent>,
}

impl Outbox {
    pub fn play(&mut self, cue: Cue) {
        self.cues.push(cue);
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }
}

/// What rules see during one tick
pub struct TickContext<'a> {
    pub session: &'a mut Session,
    pub held: &'a HeldInput,
    /// Seconds
    pub dt: f32,
    /// Host time of the frame (ms)
    pub now_ms: f64,
    pub fx: &'a mut Effects,
    pub out: &'a mut Outbox,
}

/// Game content plugged into the engine
pub trait GameRules {
    /// Storage namespace
    fn name(&self) -> &'static str;

    fn session_config(&self) -> SessionConfig;

    /// Tick interval read before every tick. `base_ms` comes from settings;
    /// rules that speed up with difficulty shorten it.
    fn tick_interval_ms(&self, _session: &Session, base_ms: f64) -> f64 {
        base_ms
    }

    /// Reset content for a fresh run. The session is already at level 1.
    fn new_run(&mut self, seed: u64, session: &mut Session, now_ms: f64);

    /// Build the level the session just advanced to
    fn start_level(&mut self, _session: &mut Session, _now_ms: f64) {}

    /// Gameplay input while Playing
    fn on_action(&mut self, action: Action, ctx: &mut TickContext<'_>);

    fn spawn(&mut self, ctx: &mut TickContext<'_>);
    fn integrate(&mut self, ctx: &mut TickContext<'_>);
    fn collide(&mut self, ctx: &mut TickContext<'_>);

    /// Rule-owned timers (power-ups, feedback)
    fn decay(&mut self, _ctx: &mut TickContext<'_>) {}

    /// Ordered achievement table
    fn achievements(&self) -> &'static [Achievement] {
        &[]
    }

    fn sprites(&self, out: &mut Vec<Sprite>);

    /// Background tier for renderers
    fn scene(&self, _session: &Session) -> u8 {
        0
    }
}

/// Single-session game controller
pub struct Engine<R: GameRules> {
    rules: R,
    session: Session,
    clock: FixedClock,
    input: InputQueue,
    held: HeldInput,
    fx: Effects,
    outbox: Outbox,
    events: Vec<GameEvent>,
    audio: Box<dyn AudioSink>,
    store: ProgressStore,
    progress: ProgressRecord,
    settings: Settings,
    today: Box<dyn FnMut() -> String>,
    seed: u64,
    runs: u64,
    run_active: bool,
}

impl<R: GameRules> Engine<R> {
    /// Build an engine, loading progress and settings from `storage`
    pub fn new(rules: R, storage: Box<dyn Storage>, audio: Box<dyn AudioSink>, seed: u64) -> Self {
        let store = ProgressStore::new(storage, rules.name());
        let settings = Settings::load(&store);
        Self::with_settings(rules, store, audio, settings, seed)
    }

    pub fn with_settings(
        rules: R,
        store: ProgressStore,
        mut audio: Box<dyn AudioSink>,
        settings: Settings,
        seed: u64,
    ) -> Self {
        let settings = settings.sanitized();
        let progress = store.load();
        audio.set_volume(settings.effective_volume());
        let session = Session::new(rules.session_config());
        Self {
            clock: FixedClock::new(settings.tick_ms()).with_ceiling(settings.runaway_ceiling_ms),
            fx: Effects::new(settings.max_effects(), settings.screen_shake()),
            rules,
            session,
            input: InputQueue::default(),
            held: HeldInput::default(),
            outbox: Outbox::default(),
            events: Vec::new(),
            audio,
            store,
            progress,
            settings,
            today: Box::new(platform::today_iso),
            seed,
            runs: 0,
            run_active: false,
        }
    }

    /// Replace the calendar source used for streaks
    pub fn with_date_source(mut self, today: impl FnMut() -> String + 'static) -> Self {
        self.today = Box::new(today);
        self
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut R {
        &mut self.rules
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn phase(&self) -> GamePhase {
        self.session.phase
    }

    pub fn progress(&self) -> &ProgressRecord {
        &self.progress
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn effects(&self) -> &Effects {
        &self.fx
    }

    pub fn clock(&self) -> &FixedClock {
        &self.clock
    }

    /// Queue an edge-triggered action for the next tick
    pub fn push_action(&mut self, action: Action) -> bool {
        self.input.push(action)
    }

    /// Held-key state read by every tick
    pub fn set_held(&mut self, held: HeldInput) {
        self.held = held;
    }

    pub fn held_mut(&mut self) -> &mut HeldInput {
        &mut self.held
    }

    /// Apply new settings and persist them.
    ///
    /// Volume applies at once. New timing restarts the clock, so the next
    /// frame is a baseline. A new effect capacity or shake mode drops the
    /// effects in flight.
    pub fn update_settings(&mut self, settings: Settings) {
        let settings = settings.sanitized();
        if settings.tick_ms() != self.settings.tick_ms()
            || settings.runaway_ceiling_ms != self.settings.runaway_ceiling_ms
        {
            self.clock =
                FixedClock::new(settings.tick_ms()).with_ceiling(settings.runaway_ceiling_ms);
        }
        self.audio.set_volume(settings.effective_volume());
        if settings.max_effects() != self.fx.capacity()
            || settings.screen_shake() != self.settings.screen_shake()
        {
            log::info!(
                "Effects reconfigured: {} slots, shake {}",
                settings.max_effects(),
                settings.screen_shake()
            );
            self.fx = Effects::new(settings.max_effects(), settings.screen_shake());
        }
        settings.save(&mut self.store);
        self.settings = settings;
    }

    /// Host lost visibility/focus: pause a live run
    pub fn suspend(&mut self, now_ms: f64) {
        if matches!(self.session.phase, GamePhase::Playing | GamePhase::Ready) {
            log::info!("Auto-pausing {}", self.rules.name());
            let transition = self.session.handle(Action::Pause, now_ms);
            self.apply(transition, now_ms);
        }
    }

    /// One display refresh. Returns the number of ticks simulated.
    pub fn frame(&mut self, now_ms: f64) -> u32 {
        if !self.session.phase.is_ticking() {
            // Menu, Paused and GameOver only react to input
            self.clock.reset();
            self.drain_input(now_ms);
            self.settle();
            self.flush();
            if !self.session.phase.is_ticking() {
                return 0;
            }
        }

        self.clock.begin_frame(now_ms);
        let mut ticks = 0;
        while self.clock.next_tick(self.tick_interval_ms()) {
            self.step(now_ms);
            ticks += 1;
            if !self.session.phase.is_ticking() {
                // Paused or ended mid-frame: no backlog on the way back
                self.clock.reset();
                break;
            }
        }
        ticks
    }

    fn tick_interval_ms(&self) -> f64 {
        self.rules
            .tick_interval_ms(&self.session, self.clock.tick_interval_ms())
    }

    /// Run exactly one tick, regardless of the clock
    pub fn step(&mut self, now_ms: f64) {
        let dt = crate::ms_to_secs(self.tick_interval_ms());

        let phase_before = self.session.phase;
        let level_before = self.session.level;

        self.drain_input(now_ms);
        if self.session.phase.is_ticking() {
            self.simulate(dt, now_ms);
        }
        if phase_before == GamePhase::Playing && self.session.phase == GamePhase::LevelClear {
            log::info!("Level {} cleared", level_before);
            self.apply(Transition::LevelCleared(level_before), now_ms);
        }
        self.settle();
        self.flush();
    }

    fn drain_input(&mut self, now_ms: f64) {
        while let Some(action) = self.input.pop() {
            let transition = self.session.handle(action, now_ms);
            self.apply(transition, now_ms);
        }
    }

    fn apply(&mut self, transition: Transition, now_ms: f64) {
        match transition {
            Transition::Ignored => {}
            Transition::Forward(action) => {
                let mut ctx = TickContext {
                    session: &mut self.session,
                    held: &self.held,
                    dt: 0.0,
                    now_ms,
                    fx: &mut self.fx,
                    out: &mut self.outbox,
                };
                self.rules.on_action(action, &mut ctx);
            }
            Transition::Started => self.start_run(now_ms),
            Transition::Paused => {
                log::info!("Paused at tick {}", self.session.time_ticks);
            }
            Transition::Resumed { paused_ms } => {
                log::info!("Resumed after {:.0}ms", paused_ms);
                self.clock.reset();
                self.audio.resume();
            }
            Transition::Go => {}
            Transition::LevelCleared(level) => {
                self.outbox.play(Cue::LevelClear);
                self.outbox.emit(GameEvent::LevelCleared(level));
            }
            Transition::NextLevel(level) => {
                log::info!("Level {} starting", level);
                self.rules.start_level(&mut self.session, now_ms);
                self.outbox.emit(GameEvent::LevelStarted(level));
            }
            Transition::Finished => self.finish_run(),
            Transition::Menu => {
                log::info!("Run discarded, back to menu");
                self.run_active = false;
                self.fx.clear();
            }
        }
    }

    fn simulate(&mut self, dt: f32, now_ms: f64) {
        if let Some(transition) = self.session.advance(dt) {
            self.apply(transition, now_ms);
        }

        if self.session.phase == GamePhase::Playing {
            let mut ctx = TickContext {
                session: &mut self.session,
                held: &self.held,
                dt,
                now_ms,
                fx: &mut self.fx,
                out: &mut self.outbox,
            };
            self.rules.spawn(&mut ctx);
            self.rules.integrate(&mut ctx);
            self.rules.collide(&mut ctx);
            self.rules.decay(&mut ctx);
        }
        self.fx.decay(dt);
    }

    /// Unlocks and end-of-run bookkeeping after input or a tick
    fn settle(&mut self) {
        self.fold_collected();
        if !self.run_active {
            return;
        }
        self.check_achievements();
        if self.session.phase == GamePhase::GameOver {
            self.finish_run();
        }
    }

    fn start_run(&mut self, now_ms: f64) {
        let seed = self.seed.wrapping_add(self.runs);
        self.runs += 1;
        self.run_active = true;
        self.fx.clear();
        self.clock.reset();
        self.rules.new_run(seed, &mut self.session, now_ms);

        let today = (self.today)();
        self.progress.touch_streak(&today);
        self.store.save(&self.progress);

        log::info!(
            "{} run started (seed {}, streak {} days)",
            self.rules.name(),
            seed,
            self.progress.streak_days
        );
        self.outbox.play(Cue::Start);
        self.outbox.emit(GameEvent::RunStarted { seed });
    }

    fn finish_run(&mut self) {
        if !self.run_active {
            return;
        }
        self.run_active = false;
        let score = self.session.score;
        self.check_achievements();

        let new_best =
            self.progress
                .record_run(score, self.session.max_combo, self.session.level);
        log::info!(
            "{} run over: score {}, level {}, best {}",
            self.rules.name(),
            score,
            self.session.level,
            self.progress.best_score
        );
        self.outbox.play(Cue::GameOver);
        if new_best {
            log::info!("New best score {}", score);
            self.outbox.play(Cue::NewBest);
            self.outbox.emit(GameEvent::NewBest(score));
        }
        self.outbox.emit(GameEvent::RunEnded { score });
        self.store.save(&self.progress);
    }

    fn check_achievements(&mut self) {
        let stats = self.session.stats();
        let unlocked = achievements::evaluate(self.rules.achievements(), &self.progress, &stats);
        if unlocked.is_empty() {
            return;
        }
        for a in &unlocked {
            log::info!("Achievement unlocked: {}", a.id);
            self.progress.unlock(a.id);
            self.fx.show_banner(a.name, 0xffd700, 2.0);
            self.outbox.play(Cue::Achievement);
            self.outbox.emit(GameEvent::Unlocked {
                id: a.id,
                name: a.name,
            });
        }
        self.store.save(&self.progress);
    }

    /// Dispatch cues and move events to the host-visible list
    fn flush(&mut self) {
        let muted = self.settings.muted;
        for cue in self.outbox.cues.drain(..) {
            if !muted {
                self.audio.play(cue);
            }
        }
        self.events.append(&mut self.outbox.events);
    }

    /// Add this tick's collected ids to progress before achievements run
    fn fold_collected(&mut self) {
        let mut collected = false;
        for event in &self.outbox.events {
            if let GameEvent::Collected(id) = event {
                collected |= self.progress.collect(id);
            }
        }
        if collected && !self.run_active {
            self.store.save(&self.progress);
        }
    }

    /// Events since the last call
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> Snapshot {
        let mut sprites = Vec::new();
        if self.session.phase != GamePhase::Menu {
            self.rules.sprites(&mut sprites);
        }
        Snapshot::capture(
            &self.session,
            self.progress.best_score,
            self.rules.scene(&self.session),
            sprites,
            &self.fx,
        )
    }
}
