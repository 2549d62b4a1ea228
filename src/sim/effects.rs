//! Visual effects: explosion rings, debris, floating text, shake and hover glow
//!
//! Everything here is keyed to wall-clock milliseconds (`now - start`), never
//! to frame counts, so effects run at the same speed on any display.

use std::collections::VecDeque;

use glam::Vec2;
use rand::Rng;

use super::node::{BubbleId, BubbleNode};
use crate::consts::*;
use crate::{polar_to_cartesian, reflect_velocity};

/// Downward acceleration on debris (px/s²)
pub const DEBRIS_GRAVITY: f32 = 260.0;
/// Speed kept after a debris particle bounces off a bubble
pub const DEBRIS_BOUNCE_DAMPING: f32 = 0.8;
/// Size kept after a bounce
pub const DEBRIS_BOUNCE_SHRINK: f32 = 0.9;
/// Explosion ring grows to the bubble radius times this
pub const EXPLOSION_GROWTH: f32 = 2.5;
/// Longest step debris integrates in one advance (s)
const MAX_STEP_SECS: f32 = 0.1;

/// Drift direction of a floating text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    /// Rises
    Gain,
    /// Sinks
    Loss,
}

/// Expanding shockwave ring
#[derive(Debug, Clone, PartialEq)]
pub struct Explosion {
    pub pos: Vec2,
    pub radius: f32,
    pub max_radius: f32,
    pub opacity: f32,
    pub start_ms: f64,
}

impl Explosion {
    pub fn new(pos: Vec2, bubble_radius: f32, now_ms: f64) -> Self {
        Self {
            pos,
            radius: bubble_radius,
            max_radius: bubble_radius * EXPLOSION_GROWTH,
            opacity: 1.0,
            start_ms: now_ms,
        }
    }

    /// Recompute from elapsed time. Returns false once fully faded.
    pub fn advance(&mut self, now_ms: f64) -> bool {
        let t = ((now_ms - self.start_ms) / EXPLOSION_DURATION_MS).clamp(0.0, 1.0) as f32;
        // Ease-out: fast burst, slow settle
        let eased = 1.0 - (1.0 - t) * (1.0 - t);
        let start = self.max_radius / EXPLOSION_GROWTH;
        self.radius = start + (self.max_radius - start) * eased;
        self.opacity = 1.0 - t;
        t < 1.0
    }
}

/// A fragment thrown from a detonated bubble's rim
#[derive(Debug, Clone, PartialEq)]
pub struct Debris {
    pub pos: Vec2,
    /// px/s
    pub vel: Vec2,
    pub size: f32,
    pub color: [f32; 4],
    pub opacity: f32,
    pub start_ms: f64,
    pub duration_ms: f64,
}

impl Debris {
    /// Integrate `dt` seconds, bounce off live bubbles, fade. False once expired.
    pub fn advance(&mut self, now_ms: f64, dt: f32, nodes: &[BubbleNode]) -> bool {
        self.vel.y += DEBRIS_GRAVITY * dt;
        self.pos += self.vel * dt;

        for node in nodes.iter().filter(|n| !n.is_popped()) {
            let offset = self.pos - node.pos;
            let dist = offset.length();
            let reach = node.current_radius + self.size;
            if dist >= reach || dist <= 1e-4 {
                continue;
            }
            let normal = offset / dist;
            if self.vel.dot(normal) < 0.0 {
                self.vel = reflect_velocity(self.vel, normal) * DEBRIS_BOUNCE_DAMPING;
                self.size *= DEBRIS_BOUNCE_SHRINK;
            }
            self.pos = node.pos + normal * (node.current_radius + self.size);
        }

        let t = ((now_ms - self.start_ms) / self.duration_ms).clamp(0.0, 1.0) as f32;
        self.opacity = 1.0 - t;
        t < 1.0
    }
}

/// A drifting, fading label such as "+10"
#[derive(Debug, Clone, PartialEq)]
pub struct FloatingText {
    pub origin: Vec2,
    pub pos: Vec2,
    pub text: String,
    pub color: [f32; 4],
    pub kind: TextKind,
    pub opacity: f32,
    pub start_ms: f64,
}

impl FloatingText {
    pub fn advance(&mut self, now_ms: f64) -> bool {
        let t = ((now_ms - self.start_ms) / FLOATING_TEXT_DURATION_MS).clamp(0.0, 1.0) as f32;
        let rise = FLOATING_TEXT_RISE * t;
        self.pos = match self.kind {
            TextKind::Gain => self.origin - Vec2::new(0.0, rise),
            TextKind::Loss => self.origin + Vec2::new(0.0, rise),
        };
        self.opacity = 1.0 - t;
        t < 1.0
    }
}

/// Request for a floating text from outside the engine
#[derive(Debug, Clone, PartialEq)]
pub struct FloatingTextRequest {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub kind: TextKind,
    pub color: [f32; 4],
}

/// Decaying camera shake
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenShake {
    start_ms: Option<f64>,
    pub duration_ms: f64,
    pub intensity: f32,
}

impl Default for ScreenShake {
    fn default() -> Self {
        Self {
            start_ms: None,
            duration_ms: SHAKE_DURATION_MS,
            intensity: SHAKE_INTENSITY,
        }
    }
}

impl ScreenShake {
    pub fn start(&mut self, now_ms: f64) {
        self.start_ms = Some(now_ms);
    }

    pub fn is_active(&self) -> bool {
        self.start_ms.is_some()
    }

    pub fn clear(&mut self) {
        self.start_ms = None;
    }

    /// Random offset scaled by (remaining / duration)²; clears itself once elapsed
    pub fn sample(&mut self, now_ms: f64, rng: &mut impl Rng) -> Vec2 {
        let Some(start) = self.start_ms else {
            return Vec2::ZERO;
        };
        let elapsed = now_ms - start;
        if elapsed >= self.duration_ms {
            self.start_ms = None;
            return Vec2::ZERO;
        }
        let remaining = ((self.duration_ms - elapsed.max(0.0)) / self.duration_ms) as f32;
        let angle = rng.random_range(0.0..std::f32::consts::TAU);
        polar_to_cartesian(self.intensity * remaining * remaining, angle)
    }
}

/// Pulsing halo around the hovered bubble
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HoverGlow {
    target: Option<BubbleId>,
    since_ms: f64,
}

impl HoverGlow {
    pub fn set(&mut self, target: Option<BubbleId>, now_ms: f64) {
        if self.target != target {
            self.target = target;
            self.since_ms = now_ms;
        }
    }

    /// Fades in over 150 ms, then breathes between 0.7 and 1.0
    pub fn intensity(&self, now_ms: f64) -> f32 {
        if self.target.is_none() {
            return 0.0;
        }
        let age = (now_ms - self.since_ms).max(0.0);
        let fade_in = (age / 150.0).min(1.0) as f32;
        let pulse = 0.85 + 0.15 * ((age / 1000.0) as f32 * std::f32::consts::TAU).sin();
        fade_in * pulse
    }
}

/// Owns every live effect
#[derive(Debug, Clone)]
pub struct EffectsEngine {
    pub explosions: Vec<Explosion>,
    /// Oldest first
    pub debris: VecDeque<Debris>,
    pub texts: Vec<FloatingText>,
    pub shake: ScreenShake,
    pub glow: HoverGlow,
    max_debris: usize,
    shake_enabled: bool,
    last_advance_ms: Option<f64>,
}

impl EffectsEngine {
    pub fn new(max_debris: usize, shake_enabled: bool) -> Self {
        Self {
            explosions: Vec::new(),
            debris: VecDeque::new(),
            texts: Vec::new(),
            shake: ScreenShake::default(),
            glow: HoverGlow::default(),
            max_debris,
            shake_enabled,
            last_advance_ms: None,
        }
    }

    /// Detonate a node: one ring, one debris burst, shake.
    ///
    /// Guarded by the node's popped flag; returns false on repeat calls.
    pub fn explode(&mut self, node: &mut BubbleNode, now_ms: f64, rng: &mut impl Rng) -> bool {
        if !node.mark_popped() {
            return false;
        }
        let radius = node.current_radius.max(1.0);
        self.explosions.push(Explosion::new(node.pos, radius, now_ms));

        let count = if self.max_debris == 0 {
            0
        } else {
            ((radius / 3.0) as usize).clamp(6, 40)
        };
        for _ in 0..count {
            let angle = rng.random_range(0.0..std::f32::consts::TAU);
            let outward = Vec2::new(angle.cos(), angle.sin());
            // Mostly outward, a little sideways
            let jitter = Vec2::new(outward.y, -outward.x) * rng.random_range(-0.4..0.4);
            let speed = rng.random_range(80.0..220.0) * (radius / 40.0).sqrt();
            self.debris.push_back(Debris {
                pos: node.pos + outward * radius,
                vel: (outward + jitter) * speed,
                size: rng.random_range(2.0..5.0),
                color: node.color,
                opacity: 1.0,
                start_ms: now_ms,
                duration_ms: rng.random_range(DEBRIS_MIN_DURATION_MS..DEBRIS_MAX_DURATION_MS),
            });
        }
        // Over the cap: the oldest particles go first
        let overflow = self.debris.len().saturating_sub(self.max_debris);
        self.debris.drain(..overflow);

        if self.shake_enabled {
            self.shake.start(now_ms);
        }
        true
    }

    pub fn create_floating_text(&mut self, request: FloatingTextRequest, now_ms: f64) {
        let origin = Vec2::new(request.x, request.y);
        self.texts.push(FloatingText {
            origin,
            pos: origin,
            text: request.text,
            color: request.color,
            kind: request.kind,
            opacity: 1.0,
            start_ms: now_ms,
        });
    }

    /// Advance every effect to `now_ms` and drop the expired ones
    pub fn advance(&mut self, now_ms: f64, nodes: &[BubbleNode]) {
        let dt = match self.last_advance_ms {
            Some(last) => (((now_ms - last) / 1000.0) as f32).clamp(0.0, MAX_STEP_SECS),
            None => 0.0,
        };
        self.last_advance_ms = Some(now_ms);

        self.explosions.retain_mut(|e| e.advance(now_ms));
        self.debris.retain_mut(|d| d.advance(now_ms, dt, nodes));
        self.texts.retain_mut(|t| t.advance(now_ms));
    }

    pub fn is_idle(&self) -> bool {
        self.explosions.is_empty()
            && self.debris.is_empty()
            && self.texts.is_empty()
            && !self.shake.is_active()
    }

    /// Drop every effect (engine teardown)
    pub fn clear(&mut self) {
        self.explosions.clear();
        self.debris.clear();
        self.texts.clear();
        self.shake.clear();
        self.glow = HoverGlow::default();
        self.last_advance_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::node::SourceBubble;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn node(id: u32, x: f32, y: f32, r: f32) -> BubbleNode {
        BubbleNode::new(&SourceBubble::new(id, "n"), Vec2::new(x, y), r, 0.0)
    }

    #[test]
    fn test_explode_is_idempotent() {
        let mut fx = EffectsEngine::new(500, true);
        let mut rng = Pcg32::seed_from_u64(1);
        let mut n = node(1, 100.0, 100.0, 30.0);
        assert!(fx.explode(&mut n, 0.0, &mut rng));
        let debris = fx.debris.len();
        assert!(!fx.explode(&mut n, 5.0, &mut rng));
        assert_eq!(fx.explosions.len(), 1);
        assert_eq!(fx.debris.len(), debris);
        assert!(n.is_popped());
    }

    #[test]
    fn test_debris_spawns_on_rim() {
        let mut fx = EffectsEngine::new(500, false);
        let mut rng = Pcg32::seed_from_u64(2);
        let mut n = node(1, 100.0, 100.0, 30.0);
        fx.explode(&mut n, 0.0, &mut rng);
        assert_eq!(fx.debris.len(), 10);
        for d in &fx.debris {
            assert!((d.pos.distance(n.pos) - 30.0).abs() < 1e-3);
            // Outward-biased
            assert!(d.vel.dot(d.pos - n.pos) > 0.0);
        }
        assert!(!fx.shake.is_active());
    }

    #[test]
    fn test_debris_count_scales_with_radius() {
        let mut fx = EffectsEngine::new(500, false);
        let mut rng = Pcg32::seed_from_u64(2);
        let mut small = node(1, 0.0, 0.0, 10.0);
        let mut big = node(2, 0.0, 0.0, 90.0);
        fx.explode(&mut small, 0.0, &mut rng);
        let small_count = fx.debris.len();
        fx.explode(&mut big, 0.0, &mut rng);
        assert!(fx.debris.len() - small_count > small_count);
    }

    #[test]
    fn test_debris_cap() {
        let mut fx = EffectsEngine::new(8, false);
        let mut rng = Pcg32::seed_from_u64(2);
        let mut n = node(1, 0.0, 0.0, 60.0);
        fx.explode(&mut n, 0.0, &mut rng);
        assert_eq!(fx.debris.len(), 8);

        let mut none = EffectsEngine::new(0, false);
        let mut n = node(2, 0.0, 0.0, 60.0);
        none.explode(&mut n, 0.0, &mut rng);
        assert!(none.debris.is_empty());
        assert_eq!(none.explosions.len(), 1);
    }

    #[test]
    fn test_debris_cap_drops_oldest() {
        let mut fx = EffectsEngine::new(30, false);
        let mut rng = Pcg32::seed_from_u64(5);
        let mut first = node(1, 0.0, 0.0, 60.0);
        let mut second = node(2, 200.0, 0.0, 60.0);
        fx.explode(&mut first, 0.0, &mut rng);
        assert_eq!(fx.debris.len(), 20);
        fx.explode(&mut second, 10.0, &mut rng);

        assert_eq!(fx.debris.len(), 30);
        let survivors = fx.debris.iter().filter(|d| d.start_ms == 0.0).count();
        assert_eq!(survivors, 10);
        // The newest burst is kept whole, at the back
        assert!(fx.debris.iter().skip(10).all(|d| d.start_ms == 10.0));
    }

    #[test]
    fn test_effects_expire_by_time_not_frames() {
        let mut fx = EffectsEngine::new(500, true);
        let mut rng = Pcg32::seed_from_u64(3);
        let mut n = node(1, 100.0, 100.0, 30.0);
        fx.explode(&mut n, 1000.0, &mut rng);
        fx.create_floating_text(
            FloatingTextRequest {
                x: 0.0,
                y: 0.0,
                text: "+1".into(),
                kind: TextKind::Gain,
                color: [1.0; 4],
            },
            1000.0,
        );

        // Many tiny frames inside the window keep everything alive
        for i in 0..20 {
            fx.advance(1000.0 + i as f64, &[]);
        }
        assert_eq!(fx.explosions.len(), 1);
        assert_eq!(fx.texts.len(), 1);

        // One frame past every duration clears them
        fx.advance(1000.0 + DEBRIS_MAX_DURATION_MS + FLOATING_TEXT_DURATION_MS, &[]);
        assert!(fx.explosions.is_empty());
        assert!(fx.debris.is_empty());
        assert!(fx.texts.is_empty());
    }

    #[test]
    fn test_explosion_grows_and_fades() {
        let mut e = Explosion::new(Vec2::ZERO, 20.0, 0.0);
        assert!(e.advance(EXPLOSION_DURATION_MS / 2.0));
        assert!(e.radius > 20.0 && e.radius < 50.0);
        assert!((e.opacity - 0.5).abs() < 1e-3);
        assert!(!e.advance(EXPLOSION_DURATION_MS));
    }

    #[test]
    fn test_floating_text_direction() {
        let mut gain = FloatingText {
            origin: Vec2::new(0.0, 100.0),
            pos: Vec2::new(0.0, 100.0),
            text: "+5".into(),
            color: [1.0; 4],
            kind: TextKind::Gain,
            opacity: 1.0,
            start_ms: 0.0,
        };
        let mut loss = gain.clone();
        loss.kind = TextKind::Loss;
        gain.advance(600.0);
        loss.advance(600.0);
        assert!(gain.pos.y < 100.0);
        assert!(loss.pos.y > 100.0);
        assert!((gain.opacity - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_debris_bounces_off_bubble() {
        let n = node(1, 100.0, 100.0, 30.0);
        let mut d = Debris {
            pos: Vec2::new(100.0, 68.0),
            vel: Vec2::new(0.0, 200.0),
            size: 4.0,
            color: [1.0; 4],
            opacity: 1.0,
            start_ms: 0.0,
            duration_ms: 1000.0,
        };
        assert!(d.advance(16.0, 0.016, &[n.clone()]));
        assert!(d.vel.y < 0.0, "should bounce upward, got {:?}", d.vel);
        assert!(d.size < 4.0);
        assert!(d.pos.distance(n.pos) >= 30.0 + d.size - 1e-3);
    }

    #[test]
    fn test_shake_decays_and_clears() {
        let mut shake = ScreenShake::default();
        let mut rng = Pcg32::seed_from_u64(4);
        assert_eq!(shake.sample(0.0, &mut rng), Vec2::ZERO);
        shake.start(100.0);
        let early = shake.sample(110.0, &mut rng).length();
        let late = shake.sample(100.0 + SHAKE_DURATION_MS * 0.9, &mut rng).length();
        assert!(early > 0.0);
        assert!(late < early);
        assert_eq!(shake.sample(100.0 + SHAKE_DURATION_MS, &mut rng), Vec2::ZERO);
        assert!(!shake.is_active());
    }

    #[test]
    fn test_hover_glow() {
        let mut glow = HoverGlow::default();
        assert_eq!(glow.intensity(0.0), 0.0);
        glow.set(Some(3), 100.0);
        assert_eq!(glow.intensity(100.0), 0.0);
        assert!(glow.intensity(400.0) > 0.5);
        glow.set(None, 500.0);
        assert_eq!(glow.intensity(600.0), 0.0);
    }

    #[test]
    fn test_clear() {
        let mut fx = EffectsEngine::new(500, true);
        let mut rng = Pcg32::seed_from_u64(1);
        let mut n = node(1, 100.0, 100.0, 30.0);
        fx.explode(&mut n, 0.0, &mut rng);
        fx.clear();
        assert!(fx.is_idle());
    }
}
