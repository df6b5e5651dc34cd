//! Audio collaborator
//!
//! The simulation emits named [`Cue`]s; an [`AudioSink`] turns them into
//! sound. Each cue expands to a short list of [`Tone`]s with start offsets,
//! so multi-note jingles are scheduled on the audio clock in one call
//! instead of through timer callbacks. Playback failures never reach the
//! simulation.

use crate::sim::lane::HitQuality;

/// Pentatonic scale used for hit and collect notes
pub const PENTA_FREQS: [f32; 8] = [293.66, 349.23, 392.0, 440.0, 523.25, 587.33, 698.46, 783.99];

/// Named sound cue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    /// Run started
    Start,
    /// Ball off paddle or wall
    Bounce,
    BrickBreak,
    /// Hard brick hit without breaking
    BrickHit,
    PowerUp,
    LoseLife,
    GameOver,
    LevelClear,
    /// Soft metronome click on each beat
    BeatTick,
    /// Lane hit; `pitch` indexes [`PENTA_FREQS`]
    Hit { quality: HitQuality, pitch: u8 },
    Miss,
    Milestone,
    Achievement,
    NewBest,
    /// Chained break, rising with combo
    Collect { combo: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wave {
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

/// One oscillator note with an exponential decay envelope
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub freq: f32,
    /// Seconds
    pub duration: f32,
    pub wave: Wave,
    pub volume: f32,
    /// Seconds after the cue fires
    pub delay: f32,
}

const fn tone(freq: f32, duration: f32, wave: Wave, volume: f32, delay: f32) -> Tone {
    Tone {
        freq,
        duration,
        wave,
        volume,
        delay,
    }
}

impl Cue {
    /// Notes that make up this cue
    pub fn tones(self) -> Vec<Tone> {
        use Wave::*;
        match self {
            Cue::Start => vec![
                tone(440.0, 0.06, Sine, 0.15, 0.0),
                tone(554.0, 0.06, Sine, 0.15, 0.05),
                tone(659.0, 0.1, Sine, 0.15, 0.1),
            ],
            Cue::Bounce => vec![tone(440.0, 0.05, Sine, 0.15, 0.0)],
            Cue::BrickBreak => vec![
                tone(660.0, 0.08, Sine, 0.2, 0.0),
                tone(880.0, 0.06, Sine, 0.15, 0.03),
            ],
            Cue::BrickHit => vec![tone(330.0, 0.1, Triangle, 0.25, 0.0)],
            Cue::PowerUp => vec![
                tone(784.0, 0.06, Sine, 0.15, 0.0),
                tone(988.0, 0.06, Sine, 0.15, 0.04),
                tone(1175.0, 0.1, Sine, 0.12, 0.08),
            ],
            Cue::LoseLife => vec![
                tone(247.0, 0.2, Sawtooth, 0.25, 0.0),
                tone(196.0, 0.3, Sawtooth, 0.2, 0.15),
            ],
            Cue::GameOver => vec![
                tone(196.0, 0.3, Sawtooth, 0.3, 0.0),
                tone(165.0, 0.4, Sawtooth, 0.25, 0.2),
                tone(131.0, 0.5, Sawtooth, 0.2, 0.4),
            ],
            Cue::LevelClear => vec![
                tone(523.0, 0.08, Sine, 0.2, 0.0),
                tone(659.0, 0.08, Sine, 0.2, 0.06),
                tone(784.0, 0.08, Sine, 0.2, 0.12),
                tone(1047.0, 0.15, Sine, 0.2, 0.18),
            ],
            Cue::BeatTick => vec![tone(880.0, 0.05, Sine, 0.03, 0.0)],
            Cue::Hit { quality, pitch } => {
                let idx = pitch as usize % PENTA_FREQS.len();
                let freq = PENTA_FREQS[idx];
                match quality {
                    HitQuality::Perfect => vec![
                        tone(freq, 0.8, Sine, 0.5, 0.0),
                        // Harmony a third up the scale
                        tone(PENTA_FREQS[(idx + 2) % PENTA_FREQS.len()], 0.6, Sine, 0.2, 0.0),
                    ],
                    HitQuality::Good => vec![tone(freq, 0.5, Sine, 0.35, 0.0)],
                    HitQuality::Ok => vec![tone(freq, 0.3, Sine, 0.2, 0.0)],
                    HitQuality::Miss => Cue::Miss.tones(),
                }
            }
            Cue::Miss => vec![tone(120.0, 0.2, Triangle, 0.1, 0.0)],
            Cue::Milestone => [261.63, 329.63, 392.0, 523.25]
                .into_iter()
                .map(|f| tone(f, 1.5, Sine, 0.12, 0.0))
                .collect(),
            Cue::Achievement => [523.25, 659.25, 783.99, 1046.5]
                .into_iter()
                .enumerate()
                .map(|(i, f)| tone(f, 0.4, Sine, 0.12, i as f32 * 0.1))
                .collect(),
            Cue::NewBest => vec![
                tone(659.0, 0.1, Sine, 0.2, 0.0),
                tone(784.0, 0.1, Sine, 0.2, 0.1),
                tone(1047.0, 0.3, Sine, 0.2, 0.2),
            ],
            Cue::Collect { combo } => {
                let base = 440.0 + combo.min(15) as f32 * 30.0;
                vec![
                    tone(base, 0.15, Sine, 0.12, 0.0),
                    tone(base * 1.25, 0.12, Sine, 0.08, 0.06),
                ]
            }
        }
    }
}

/// Fire-and-forget cue playback
pub trait AudioSink {
    fn play(&mut self, cue: Cue);

    /// Effective volume in `0..=1` (master * sfx, 0 when muted)
    fn set_volume(&mut self, _volume: f32) {}

    /// Unlock playback after a user gesture
    fn resume(&mut self) {}
}

/// Discards every cue
#[derive(Debug, Default)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play(&mut self, _cue: Cue) {}
}

/// Keeps every cue it receives. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingAudio {
    log: std::rc::Rc<std::cell::RefCell<Vec<Cue>>>,
}

impl RecordingAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cues(&self) -> Vec<Cue> {
        self.log.borrow().clone()
    }

    pub fn count(&self, cue: Cue) -> usize {
        self.log.borrow().iter().filter(|c| **c == cue).count()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }
}

impl AudioSink for RecordingAudio {
    fn play(&mut self, cue: Cue) {
        self.log.borrow_mut().push(cue);
    }
}

/// Web Audio synthesizer (wasm only)
#[cfg(target_arch = "wasm32")]
pub struct WebAudio {
    ctx: Option<web_sys::AudioContext>,
    volume: f32,
}

#[cfg(target_arch = "wasm32")]
impl Default for WebAudio {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_arch = "wasm32")]
impl WebAudio {
    pub fn new() -> Self {
        // May fail outside a secure context
        let ctx = web_sys::AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - audio disabled");
        }
        Self { ctx, volume: 0.8 }
    }

    /// Create an oscillator routed through a gain node to the output
    fn create_osc(
        ctx: &web_sys::AudioContext,
        freq: f32,
        wave: Wave,
    ) -> Option<(web_sys::OscillatorNode, web_sys::GainNode)> {
        use web_sys::OscillatorType;

        let osc = ctx.create_oscillator().ok()?;
        let gain = ctx.create_gain().ok()?;

        osc.set_type(match wave {
            Wave::Sine => OscillatorType::Sine,
            Wave::Square => OscillatorType::Square,
            Wave::Triangle => OscillatorType::Triangle,
            Wave::Sawtooth => OscillatorType::Sawtooth,
        });
        osc.frequency().set_value(freq);
        osc.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&ctx.destination()).ok()?;

        Some((osc, gain))
    }

    fn schedule(ctx: &web_sys::AudioContext, tone: &Tone, vol: f32) {
        let Some((osc, gain)) = Self::create_osc(ctx, tone.freq, tone.wave) else {
            return;
        };
        let t = ctx.current_time() + tone.delay as f64;
        let end = t + tone.duration as f64;

        gain.gain().set_value_at_time(tone.volume * vol, t).ok();
        gain.gain().exponential_ramp_to_value_at_time(0.001, end).ok();

        osc.start_with_when(t).ok();
        osc.stop_with_when(end).ok();
    }
}

#[cfg(target_arch = "wasm32")]
impl AudioSink for WebAudio {
    fn play(&mut self, cue: Cue) {
        let vol = self.volume;
        if vol <= 0.0 {
            return;
        }
        let Some(ctx) = &self.ctx else { return };

        // Browsers start the context suspended until a user gesture
        if ctx.state() == web_sys::AudioContextState::Suspended {
            let _ = ctx.resume();
        }

        for tone in cue.tones() {
            Self::schedule(ctx, &tone, vol);
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn resume(&mut self) {
        if let Some(ctx) = &self.ctx {
            let _ = ctx.resume();
        }
    }
}
