//! Player settings and engine tuning
//!
//! Persisted separately from progress, under the game's storage namespace.

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_TICK_HZ, MIN_TICK_HZ, RUNAWAY_CEILING_MS, TICK_HZ};
use crate::persistence::ProgressStore;

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Effect pool capacity for this preset
    pub fn max_effects(&self) -> usize {
        match self {
            QualityPreset::Low => 64,
            QualityPreset::Medium => 200,
            QualityPreset::High => 400,
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Effect quality preset
    pub quality: QualityPreset,
    /// Simulation rate (ticks per second)
    pub tick_hz: f64,
    /// Frame gaps above this many ms are simulated as one tick
    pub runaway_ceiling_ms: f64,

    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    pub muted: bool,
    /// Pause when the tab is hidden or loses focus
    pub pause_on_blur: bool,

    // === Accessibility ===
    /// Reduced motion (no screen shake)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,
            tick_hz: TICK_HZ,
            runaway_ceiling_ms: RUNAWAY_CEILING_MS,

            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
            pause_on_blur: true,

            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Storage suffix under the game namespace
    const STORAGE_KEY: &'static str = "settings";

    pub fn from_preset(preset: QualityPreset) -> Self {
        Self {
            quality: preset,
            ..Self::default()
        }
    }

    /// Fixed tick interval in ms (falls back to the default rate if out of range)
    pub fn tick_ms(&self) -> f64 {
        if tick_hz_in_range(self.tick_hz) {
            1000.0 / self.tick_hz
        } else {
            1000.0 / TICK_HZ
        }
    }

    /// Replace out-of-range timing values with the defaults.
    ///
    /// The runaway ceiling must lie in `[tick_ms, RUNAWAY_CEILING_MS]`.
    pub fn sanitized(mut self) -> Self {
        if !tick_hz_in_range(self.tick_hz) {
            log::warn!("Tick rate {} Hz out of range, using {} Hz", self.tick_hz, TICK_HZ);
            self.tick_hz = TICK_HZ;
        }
        let ceiling = self.runaway_ceiling_ms;
        if !(ceiling.is_finite() && (self.tick_ms()..=RUNAWAY_CEILING_MS).contains(&ceiling)) {
            log::warn!("Runaway ceiling {}ms out of range, using {}ms", ceiling, RUNAWAY_CEILING_MS);
            self.runaway_ceiling_ms = RUNAWAY_CEILING_MS;
        }
        self
    }

    /// Effective volume
    pub fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            (self.master_volume * self.sfx_volume).clamp(0.0, 1.0)
        }
    }

    /// Effective screen shake (respects reduced_motion)
    pub fn screen_shake(&self) -> bool {
        !self.reduced_motion
    }

    pub fn max_effects(&self) -> usize {
        self.quality.max_effects()
    }

    pub fn load(store: &ProgressStore) -> Self {
        let settings = store.load_record::<Settings>(Self::STORAGE_KEY).sanitized();
        log::info!("Settings: quality {}, {} Hz", settings.quality.as_str(), settings.tick_hz);
        settings
    }

    pub fn save(&self, store: &mut ProgressStore) -> bool {
        store.save_record(Self::STORAGE_KEY, self)
    }
}

fn tick_hz_in_range(hz: f64) -> bool {
    hz.is_finite() && (MIN_TICK_HZ..=MAX_TICK_HZ).contains(&hz)
}
