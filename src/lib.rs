//! Bubble Field - physics and interaction core for a canvas of poppable bubbles
//!
//! Core modules:
//! - `sim`: Node model, force solver, impulses, interaction rules and effects
//! - `render`: Per-frame draw driver over a host-provided 2D surface
//! - `engine`: The owning instance that wires everything to pointer events
//! - `settings`: Data-driven quality and motion preferences

pub mod engine;
pub mod error;
pub mod render;
pub mod settings;
pub mod sim;

pub use engine::{BubbleEngine, CanvasRect, EngineStats};
pub use error::EngineError;
pub use settings::{Intensity, QualityPreset, Settings};

use glam::Vec2;

/// Engine tuning constants
pub mod consts {
    /// Nominal frame duration in milliseconds (60 Hz display)
    pub const FRAME_MS: f64 = 1000.0 / 60.0;

    /// Height of the fixed HUD band along the top edge
    pub const HUD_BAND_HEIGHT: f32 = 80.0;
    /// Default inset nodes keep from the canvas edges
    pub const EDGE_INSET: f32 = 10.0;

    /// Fraction of the canvas area bubbles try to cover
    pub const TARGET_FILL_RATIO: f32 = 0.35;
    /// No bubble may exceed this radius regardless of canvas size
    pub const ABSOLUTE_MAX_RADIUS: f32 = 120.0;
    /// No bubble is smaller than this
    pub const ABSOLUTE_MIN_RADIUS: f32 = 14.0;

    /// Hovered bubbles grow toward base radius times this
    pub const HOVER_SCALE: f32 = 1.15;
    /// Hard ceiling on current radius relative to base radius
    pub const MAX_HOVER_MULTIPLIER: f32 = 1.3;
    /// Breathing amplitude as a fraction of base radius
    pub const BREATHING_AMPLITUDE: f32 = 0.03;
    /// Breathing angular speed (radians per second)
    pub const BREATHING_SPEED: f32 = 1.6;
    /// Per-frame easing factor from current toward target radius
    pub const RADIUS_EASING: f32 = 0.15;
    /// Radius drift (in px) that triggers a text re-wrap
    pub const REWRAP_THRESHOLD: f32 = 1.0;

    /// Per-frame multiplier applied to residual velocity
    pub const VELOCITY_DAMPING: f32 = 0.92;
    /// Velocities below this are snapped to zero
    pub const VELOCITY_EPSILON: f32 = 0.01;
    /// Magnitude of ambient Brownian drift per frame
    pub const BROWNIAN_DRIFT: f32 = 0.04;

    /// Base velocity ceiling, scaled by kind and level
    pub const BASE_MAX_VELOCITY: f32 = 6.0;

    /// Explosion ring duration (ms)
    pub const EXPLOSION_DURATION_MS: f64 = 600.0;
    /// Debris lifetime range (ms)
    pub const DEBRIS_MIN_DURATION_MS: f64 = 700.0;
    pub const DEBRIS_MAX_DURATION_MS: f64 = 1200.0;
    /// Floating text lifetime (ms)
    pub const FLOATING_TEXT_DURATION_MS: f64 = 1200.0;
    /// Floating text vertical drift over its lifetime (px)
    pub const FLOATING_TEXT_RISE: f32 = 50.0;
    /// Screen shake duration (ms) and peak offset (px)
    pub const SHAKE_DURATION_MS: f64 = 400.0;
    pub const SHAKE_INTENSITY: f32 = 10.0;
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Clamp a vector's magnitude to `max`, keeping its direction
#[inline]
pub fn clamp_length(v: Vec2, max: f32) -> Vec2 {
    let len = v.length();
    if len > max && len > 0.0 {
        v * (max / len)
    } else {
        v
    }
}

/// Reflect velocity off a surface: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_length() {
        let v = clamp_length(Vec2::new(30.0, 40.0), 5.0);
        assert!((v.length() - 5.0).abs() < 1e-4);
        assert!((v.x - 3.0).abs() < 1e-4);

        let short = clamp_length(Vec2::new(1.0, 0.0), 5.0);
        assert_eq!(short, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_reflect_velocity() {
        // Moving right, hitting a wall whose normal points left
        let reflected = reflect_velocity(Vec2::new(100.0, 0.0), Vec2::new(-1.0, 0.0));
        assert!((reflected.x + 100.0).abs() < 0.001);
        assert!(reflected.y.abs() < 0.001);
    }
}
