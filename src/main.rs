//! Zen Arcade entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;

    use zen_arcade::audio::WebAudio;
    use zen_arcade::games::{Breakout, Rhythm};
    use zen_arcade::persistence;
    use zen_arcade::platform::{KeyMap, now_ms};
    use zen_arcade::sim::{Action, Engine, GameEvent, GamePhase, GameRules};

    // Hands each frame's snapshot to the page's canvas renderer
    #[wasm_bindgen(inline_js = "
        export function present_frame(json) {
            window.dispatchEvent(new CustomEvent('zen-frame', { detail: json }));
        }
    ")]
    extern "C" {
        fn present_frame(json: &str);
    }

    /// Game instance holding the engine and host-side bookkeeping
    struct Game<R: GameRules> {
        engine: Engine<R>,
        keys: KeyMap,
        // FPS tracking
        frame_times: [f64; 60],
        frame_index: usize,
        fps: u32,
        last_time: f64,
    }

    impl<R: GameRules> Game<R> {
        fn new(engine: Engine<R>, keys: KeyMap) -> Self {
            Self {
                engine,
                keys,
                frame_times: [0.0; 60],
                frame_index: 0,
                fps: 0,
                last_time: 0.0,
            }
        }

        fn update(&mut self, time: f64) {
            if self.last_time > 0.0 {
                self.frame_times[self.frame_index] = time - self.last_time;
                self.frame_index = (self.frame_index + 1) % self.frame_times.len();
                let avg = self.frame_times.iter().sum::<f64>() / self.frame_times.len() as f64;
                if avg > 0.0 {
                    self.fps = (1000.0 / avg).round() as u32;
                }
            }
            self.last_time = time;

            self.engine.frame(time);
            for event in self.engine.take_events() {
                log_event(&event);
            }
        }

        fn render(&self) {
            present_frame(&self.engine.snapshot().to_json());
        }

        fn update_hud(&self) {
            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                return;
            };
            let session = self.engine.session();
            let best = self.engine.progress().best_score.max(session.score);
            let set = |id: &str, text: String| {
                if let Some(el) = document.get_element_by_id(id) {
                    el.set_text_content(Some(&text));
                }
            };
            set("score", session.score.to_string());
            set("best", best.to_string());
            set("health", session.health.to_string());
            set("level", session.level.to_string());
            set("combo", session.combo.to_string());
            set("streak", self.engine.progress().streak_days.to_string());
            set("fps", self.fps.to_string());

            for (id, phase) in [
                ("menu", GamePhase::Menu),
                ("paused", GamePhase::Paused),
                ("game-over", GamePhase::GameOver),
            ] {
                if let Some(el) = document.get_element_by_id(id) {
                    let class = if session.phase == phase { "" } else { "hidden" };
                    let _ = el.set_attribute("class", class);
                }
            }
        }

        fn key(&mut self, code: &str, down: bool, repeat: bool) -> bool {
            if code == "KeyM" {
                if down && !repeat {
                    self.toggle_mute();
                }
                return true;
            }
            let Some(action) = self.keys.action_for(code) else {
                return false;
            };
            let held = self.engine.held_mut().apply(action, down);
            // Fire is both held (autofire) and an edge (launch)
            if down && !repeat && (!held || action == Action::Fire) {
                self.engine.push_action(action);
            }
            true
        }

        fn toggle_mute(&mut self) {
            let mut settings = self.engine.settings().clone();
            settings.muted = !settings.muted;
            log::info!("Sound {}", if settings.muted { "off" } else { "on" });
            self.engine.update_settings(settings);
        }
    }

    fn log_event(event: &GameEvent) {
        match event {
            GameEvent::Unlocked { name, .. } => log::info!("Unlocked: {}", name),
            GameEvent::Milestone { threshold, title } => {
                log::info!("Milestone {}: {}", threshold, title)
            }
            GameEvent::NewBest(score) => log::info!("New best: {}", score),
            other => log::debug!("{:?}", other),
        }
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            return;
        }

        log::info!("Zen Arcade starting...");

        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };

        // Hide loading indicator
        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let search = window.location().search().unwrap_or_default();
        let seed = js_sys::Date::now() as u64;
        log::info!("Seed: {}", seed);

        if search.contains("game=rhythm") {
            start(Rhythm::new(), KeyMap::lanes(), seed);
        } else {
            start(Breakout::new(), KeyMap::arcade(), seed);
        }
    }

    fn start<R: GameRules + 'static>(rules: R, keys: KeyMap, seed: u64) {
        let name = rules.name();
        let engine = Engine::new(
            rules,
            persistence::default_storage(),
            Box::new(WebAudio::new()),
            seed,
        );
        let game = Rc::new(RefCell::new(Game::new(engine, keys)));

        setup_input_handlers(game.clone());
        setup_auto_pause(game.clone());
        request_animation_frame(game);

        log::info!("{} running!", name);
    }

    fn setup_input_handlers<R: GameRules + 'static>(game: Rc<RefCell<Game<R>>>) {
        let Some(window) = web_sys::window() else {
            return;
        };

        // Keyboard down
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::KeyboardEvent| {
                let mut g = game.borrow_mut();
                if g.key(&event.code(), true, event.repeat()) {
                    event.prevent_default();
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Keyboard up
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::KeyboardEvent| {
                game.borrow_mut().key(&event.code(), false, false);
            });
            let _ = window
                .add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame<R: GameRules + 'static>(game: Rc<RefCell<Game<R>>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop<R: GameRules + 'static>(game: Rc<RefCell<Game<R>>>, time: f64) {
        {
            let mut g = game.borrow_mut();
            g.update(time);
            g.render();
            g.update_hud();
        }

        request_animation_frame(game);
    }

    fn setup_auto_pause<R: GameRules + 'static>(game: Rc<RefCell<Game<R>>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };

        // Visibility change (tab switch, minimize)
        {
            let game = game.clone();
            let document_clone = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                    let mut g = game.borrow_mut();
                    if g.engine.settings().pause_on_blur {
                        g.engine.suspend(now_ms());
                        // Held keys never see their keyup while hidden
                        g.engine.set_held(Default::default());
                    }
                }
            });
            let _ = document.add_event_listener_with_callback(
                "visibilitychange",
                closure.as_ref().unchecked_ref(),
            );
            closure.forget();
        }

        // Window blur (click outside)
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                let mut g = game.borrow_mut();
                if g.engine.settings().pause_on_blur {
                    g.engine.suspend(now_ms());
                    g.engine.set_held(Default::default());
                }
            });
            let _ = window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Zen Arcade (native) starting...");
    log::info!("Native mode runs a headless demo - run with `trunk serve` for the web version");

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(42);

    demo::breakout(seed);
    demo::rhythm(seed);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Scripted autoplay of both reference games at 60 fps simulated time
#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use zen_arcade::audio::RecordingAudio;
    use zen_arcade::games::rhythm::HIT_LINE;
    use zen_arcade::games::{Breakout, Rhythm};
    use zen_arcade::persistence::MemoryStorage;
    use zen_arcade::sim::{Action, Engine, GameEvent, GamePhase, GameRules};

    const FRAME_MS: f64 = 1000.0 / 60.0;
    /// Simulated seconds before the demo gives up on a run
    const MAX_SECS: f64 = 180.0;

    fn engine<R: GameRules>(rules: R, seed: u64) -> Engine<R> {
        Engine::new(
            rules,
            Box::new(MemoryStorage::new()),
            Box::new(RecordingAudio::new()),
            seed,
        )
    }

    /// Drive frames until the run ends, calling `pilot` before each one
    fn play<R: GameRules>(engine: &mut Engine<R>, mut pilot: impl FnMut(&mut Engine<R>, f64)) {
        let mut now = 0.0;
        engine.push_action(Action::Confirm);
        while now < MAX_SECS * 1000.0 {
            pilot(engine, now);
            engine.frame(now);
            for event in engine.take_events() {
                match event {
                    GameEvent::Collected(_) => {}
                    other => log::info!("[{:>7.0}ms] {:?}", now, other),
                }
            }
            if engine.phase() == GamePhase::GameOver {
                break;
            }
            now += FRAME_MS;
        }
        if engine.phase() != GamePhase::GameOver {
            engine.push_action(Action::Quit);
            engine.frame(now);
        }
    }

    pub fn breakout(seed: u64) {
        let mut engine = engine(Breakout::new(), seed);
        play(&mut engine, |engine, _| {
            // Track the lowest falling ball
            let rules = engine.rules();
            let target = rules
                .balls()
                .iter()
                .max_by(|a, b| a.pos.y.total_cmp(&b.pos.y))
                .map(|b| b.pos.x);
            let center = rules.paddle().rect().center().x;
            let held = engine.held_mut();
            held.left = false;
            held.right = false;
            if let Some(x) = target {
                held.left = x < center - 8.0;
                held.right = x > center + 8.0;
            }
            if rules_serving(engine) {
                engine.push_action(Action::Fire);
            }
        });
        report(&engine);
    }

    fn rules_serving(engine: &Engine<Breakout>) -> bool {
        engine.phase() == GamePhase::Playing && engine.rules().serving()
    }

    pub fn rhythm(seed: u64) {
        let mut engine = engine(Rhythm::new(), seed);
        play(&mut engine, |engine, _| {
            // Play perfectly for a minute, then let every note through
            if engine.session().elapsed > 60.0 {
                return;
            }
            let due: Vec<u8> = engine
                .rules()
                .notes()
                .iter()
                .filter(|(_, n)| (n.y - HIT_LINE).abs() < 12.0)
                .map(|(_, n)| n.lane as u8)
                .collect();
            for lane in due {
                engine.push_action(Action::Lane(lane));
            }
        });
        report(&engine);
    }

    fn report<R: GameRules>(engine: &Engine<R>) {
        let session = engine.session();
        let progress = engine.progress();
        log::info!(
            "{}: score {} level {} max combo {} ({} ticks)",
            engine.rules().name(),
            session.score,
            session.level,
            session.max_combo,
            session.time_ticks
        );
        log::info!(
            "{}: best {}, {} achievements, {} collected",
            engine.rules().name(),
            progress.best_score,
            progress.achievements.len(),
            progress.collected.len()
        );
    }
}
