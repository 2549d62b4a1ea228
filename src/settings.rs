//! Engine settings and preferences
//!
//! Loaded from JSON by the host; every field falls back to its default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{EDGE_INSET, HUD_BAND_HEIGHT};
use crate::error::EngineError;

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

    /// Maximum live debris particles for this preset
    pub fn max_debris(&self) -> usize {
        match self {
            QualityPreset::Low => 60,
            QualityPreset::Medium => 240,
            QualityPreset::High => 600,
        }
    }

    /// Number of parallax background layers at full quality
    pub fn background_layers(&self) -> usize {
        match self {
            QualityPreset::Low => 1,
            QualityPreset::Medium => 2,
            QualityPreset::High => 3,
        }
    }

    /// Segments used when tessellating a full circle
    pub fn circle_segments(&self) -> u32 {
        match self {
            QualityPreset::Low => 16,
            QualityPreset::Medium => 32,
            QualityPreset::High => 48,
        }
    }
}

/// Difficulty/speed tier (1 = calm, 5 = frantic)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Intensity(u8);

impl Intensity {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(level: u8) -> Self {
        Self(level.clamp(Self::MIN, Self::MAX))
    }

    pub fn level(&self) -> u8 {
        self.0
    }

    /// Linear multiplier: 1.0 at level 1, 2.0 at level 5
    pub fn factor(&self) -> f32 {
        1.0 + 0.25 * (self.0 - Self::MIN) as f32
    }
}

impl Default for Intensity {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl From<u8> for Intensity {
    fn from(level: u8) -> Self {
        Self::new(level)
    }
}

impl From<Intensity> for u8 {
    fn from(intensity: Intensity) -> Self {
        intensity.0
    }
}

/// Engine settings/preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Graphics quality preset
    pub quality: QualityPreset,
    /// Difficulty tier driving solver strengths and click thresholds
    pub intensity: Intensity,

    // === Visual Effects ===
    /// Screen shake on detonation
    pub screen_shake: bool,
    /// Debris particles on detonation
    pub particles: bool,
    /// Radius breathing (off where frame timing is unreliable)
    pub breathing: bool,
    /// Draw bubble labels
    pub show_labels: bool,

    // === Layout ===
    /// Inset nodes keep from the canvas edges
    pub edge_inset: f32,
    /// Height of the HUD band; the layout center sits below it
    pub hud_band_height: f32,

    // === Accessibility ===
    /// Reduced motion (no shake, no breathing)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,
            intensity: Intensity::default(),

            screen_shake: true,
            particles: true,
            breathing: true,
            show_labels: true,

            edge_inset: EDGE_INSET,
            hud_band_height: HUD_BAND_HEIGHT,

            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Create settings from a quality preset (applies preset defaults)
    pub fn from_preset(preset: QualityPreset) -> Self {
        let mut settings = Self::default();
        settings.apply_preset(preset);
        settings
    }

    /// Apply a quality preset (updates quality-dependent settings)
    pub fn apply_preset(&mut self, preset: QualityPreset) {
        self.quality = preset;

        // Low preset disables breathing; it stutters on slow frame clocks
        if preset == QualityPreset::Low {
            self.breathing = false;
        }
    }

    /// Effective screen shake (respects reduced_motion)
    pub fn effective_screen_shake(&self) -> bool {
        self.screen_shake && !self.reduced_motion
    }

    /// Effective breathing (respects reduced_motion)
    pub fn effective_breathing(&self) -> bool {
        self.breathing && !self.reduced_motion
    }

    /// Effective debris cap
    pub fn max_debris(&self) -> usize {
        if !self.particles {
            0
        } else {
            self.quality.max_debris()
        }
    }

    /// Parse settings from a JSON document
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let settings = serde_json::from_str(json)?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|error| EngineError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }
}
