//! Per-frame render driver
//!
//! Draws onto any host [`Surface`] in a fixed order: clear, background
//! parallax, bubbles (hovered last), effects, floating text. Background density
//! steps down when the measured frame rate sags and back up when it recovers.

pub mod shapes;
pub mod vertex;

pub use shapes::{MeshSurface, TextRun};
pub use vertex::Vertex;

use glam::Vec2;
use rand::Rng;

use crate::polar_to_cartesian;
use crate::settings::Settings;
use crate::sim::effects::EffectsEngine;
use crate::sim::node::{BubbleId, BubbleKind, BubbleNode, label_font_size};
use vertex::{colors, with_alpha};

/// Below this FPS the background sheds a density step
pub const DEGRADE_FPS: f32 = 45.0;
/// Above this FPS a density step is restored
pub const RESTORE_FPS: f32 = 55.0;
/// Coarsest background tier; each tier halves point density
pub const MAX_QUALITY_TIER: u8 = 3;
/// How often the adaptive tier is re-evaluated
pub const QUALITY_EVAL_INTERVAL_MS: f64 = 1000.0;
/// Orbiting points per background layer at full density
pub const POINTS_PER_LAYER: usize = 48;
/// Font size for floating text
pub const FLOATING_TEXT_SIZE: f32 = 18.0;

const FPS_WINDOW: usize = 60;

/// A host-provided 2D raster target
pub trait Surface {
    /// Wipe the frame
    fn clear(&mut self, color: [f32; 4]);
    /// Translate everything drawn after this call
    fn set_offset(&mut self, offset: Vec2);
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: [f32; 4]);
    fn stroke_circle(&mut self, center: Vec2, radius: f32, width: f32, color: [f32; 4]);
    /// Draw `text` centered on `pos`
    fn text(&mut self, pos: Vec2, text: &str, size: f32, color: [f32; 4]);
}

/// Step the background tier from a measured frame rate.
///
/// Tier 0 is full density. Drops one tier below [`DEGRADE_FPS`], recovers
/// one above [`RESTORE_FPS`], holds in between.
pub fn next_tier(current: u8, fps: f32) -> u8 {
    if fps < DEGRADE_FPS {
        (current + 1).min(MAX_QUALITY_TIER)
    } else if fps > RESTORE_FPS {
        current.saturating_sub(1)
    } else {
        current.min(MAX_QUALITY_TIER)
    }
}

/// Rolling frame-rate estimate over the last 60 frame timestamps
#[derive(Debug, Clone)]
pub struct FpsMeter {
    frame_times: [f64; FPS_WINDOW],
    frame_index: usize,
    samples: usize,
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self {
            frame_times: [0.0; FPS_WINDOW],
            frame_index: 0,
            samples: 0,
        }
    }
}

impl FpsMeter {
    pub fn record(&mut self, time_ms: f64) {
        self.frame_times[self.frame_index] = time_ms;
        self.frame_index = (self.frame_index + 1) % FPS_WINDOW;
        self.samples = (self.samples + 1).min(FPS_WINDOW);
    }

    /// Frames per second from oldest to newest sample
    pub fn fps(&self) -> Option<f32> {
        if self.samples < 2 {
            return None;
        }
        let newest = self.frame_times[(self.frame_index + FPS_WINDOW - 1) % FPS_WINDOW];
        let oldest = if self.samples == FPS_WINDOW {
            self.frame_times[self.frame_index]
        } else {
            self.frame_times[0]
        };
        let elapsed = newest - oldest;
        if elapsed <= 0.0 {
            return None;
        }
        Some(((self.samples - 1) as f64 * 1000.0 / elapsed) as f32)
    }
}

/// Background tier, re-evaluated at most once per second
#[derive(Debug, Clone, Default)]
pub struct AdaptiveQuality {
    tier: u8,
    last_eval_ms: Option<f64>,
}

impl AdaptiveQuality {
    pub fn tier(&self) -> u8 {
        self.tier
    }

    /// Returns the new tier when it changed
    pub fn update(&mut self, now_ms: f64, fps: Option<f32>) -> Option<u8> {
        let Some(last) = self.last_eval_ms else {
            self.last_eval_ms = Some(now_ms);
            return None;
        };
        if now_ms - last < QUALITY_EVAL_INTERVAL_MS {
            return None;
        }
        self.last_eval_ms = Some(now_ms);

        let fps = fps?;
        let next = next_tier(self.tier, fps);
        if next == self.tier {
            return None;
        }
        log::info!(
            "Background quality tier {} -> {} ({:.0} fps)",
            self.tier,
            next,
            fps
        );
        self.tier = next;
        Some(next)
    }
}

#[derive(Debug, Clone)]
struct OrbitPoint {
    orbit_radius: f32,
    angle: f32,
    speed: f32,
    size: f32,
    pos: Vec2,
}

#[derive(Debug, Clone)]
struct ParallaxLayer {
    points: Vec<OrbitPoint>,
    /// 0..1, nearer layers orbit faster and draw brighter
    depth: f32,
}

/// Layers of slowly orbiting points behind the bubbles
#[derive(Debug, Clone)]
pub struct Background {
    layers: Vec<ParallaxLayer>,
    center: Vec2,
}

impl Background {
    pub fn new(layer_count: usize, width: f32, height: f32, rng: &mut impl Rng) -> Self {
        let center = Vec2::new(width, height) * 0.5;
        let reach = Vec2::new(width, height).length() * 0.5;
        let layers = (0..layer_count)
            .map(|i| {
                let depth = (i + 1) as f32 / layer_count as f32;
                let points = (0..POINTS_PER_LAYER)
                    .map(|_| {
                        let orbit_radius = rng.random_range(0.05..1.0) * reach;
                        let angle = rng.random_range(0.0..std::f32::consts::TAU);
                        OrbitPoint {
                            orbit_radius,
                            angle,
                            speed: rng.random_range(0.0005..0.002),
                            size: rng.random_range(0.6..1.4) * (0.5 + depth),
                            pos: center + polar_to_cartesian(orbit_radius, angle),
                        }
                    })
                    .collect();
                ParallaxLayer { points, depth }
            })
            .collect();
        Self { layers, center }
    }

    /// Points drawn per layer at a tier
    pub fn visible_points(&self, tier: u8) -> usize {
        POINTS_PER_LAYER >> tier.min(MAX_QUALITY_TIER)
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.center = Vec2::new(width, height) * 0.5;
        for point in self.layers.iter_mut().flat_map(|l| l.points.iter_mut()) {
            point.pos = self.center + polar_to_cartesian(point.orbit_radius, point.angle);
        }
    }

    /// Step every orbit by its angular speed
    pub fn advance(&mut self) {
        for layer in &mut self.layers {
            for point in &mut layer.points {
                point.angle = (point.angle + point.speed * (0.5 + layer.depth))
                    % std::f32::consts::TAU;
                point.pos = self.center + polar_to_cartesian(point.orbit_radius, point.angle);
            }
        }
    }

    pub fn draw(&self, surface: &mut dyn Surface, tier: u8) {
        let visible = self.visible_points(tier);
        for layer in &self.layers {
            let color = with_alpha(colors::STAR, 0.2 + 0.5 * layer.depth);
            for point in layer.points.iter().take(visible) {
                surface.fill_circle(point.pos, point.size, color);
            }
        }
    }
}

/// Everything the renderer reads for one frame
#[derive(Debug, Clone, Copy)]
pub struct Scene<'a> {
    pub nodes: &'a [BubbleNode],
    pub effects: &'a EffectsEngine,
    pub hovered: Option<BubbleId>,
    pub shake: Vec2,
    pub glow: f32,
}

/// The per-frame driver: frame scheduling, quality tracking and the draw pass
#[derive(Debug, Clone)]
pub struct RenderLoop {
    fps: FpsMeter,
    quality: AdaptiveQuality,
    background: Background,
    show_labels: bool,
    animate_background: bool,
    frame_pending: bool,
    frames_drawn: u64,
    frames_skipped: u64,
}

impl RenderLoop {
    pub fn new(settings: &Settings, width: f32, height: f32, rng: &mut impl Rng) -> Self {
        Self {
            fps: FpsMeter::default(),
            quality: AdaptiveQuality::default(),
            background: Background::new(settings.quality.background_layers(), width, height, rng),
            show_labels: settings.show_labels,
            animate_background: !settings.reduced_motion,
            frame_pending: false,
            frames_drawn: 0,
            frames_skipped: 0,
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.background.resize(width, height);
    }

    /// Ask the host for another frame. Returns false if one is already pending.
    pub fn request_frame(&mut self) -> bool {
        !std::mem::replace(&mut self.frame_pending, true)
    }

    /// Consume the pending request as the host delivers the frame
    pub fn take_frame(&mut self) -> bool {
        std::mem::replace(&mut self.frame_pending, false)
    }

    pub fn cancel_frame(&mut self) {
        self.frame_pending = false;
    }

    pub fn is_frame_pending(&self) -> bool {
        self.frame_pending
    }

    /// Feed a frame timestamp into the FPS meter and adaptive tier
    pub fn record_frame(&mut self, now_ms: f64) -> Option<u8> {
        self.fps.record(now_ms);
        self.quality.update(now_ms, self.fps.fps())
    }

    pub fn quality_tier(&self) -> u8 {
        self.quality.tier()
    }

    pub fn fps(&self) -> Option<f32> {
        self.fps.fps()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }

    /// Note a frame that had no surface to draw on
    pub fn skip_frame(&mut self) {
        self.frames_skipped += 1;
        log::trace!("No drawing surface, frame skipped");
    }

    pub fn draw(&mut self, surface: &mut dyn Surface, scene: &Scene<'_>) {
        surface.clear(colors::BACKGROUND);
        surface.set_offset(scene.shake);

        if self.animate_background {
            self.background.advance();
        }
        self.background.draw(surface, self.quality.tier());

        let hovered = scene
            .hovered
            .and_then(|id| scene.nodes.iter().find(|n| n.id() == id && !n.is_popped()));
        let hovered_id = hovered.map(|n| n.id());

        for node in scene
            .nodes
            .iter()
            .filter(|n| !n.is_popped() && Some(n.id()) != hovered_id)
        {
            draw_bubble(surface, node, self.show_labels);
        }
        if let Some(node) = hovered {
            if scene.glow > 0.0 {
                surface.stroke_circle(
                    node.pos,
                    node.current_radius + 4.0 + 4.0 * scene.glow,
                    6.0 * scene.glow,
                    with_alpha(colors::HOVER_GLOW, 0.35 * scene.glow),
                );
            }
            draw_bubble(surface, node, self.show_labels);
        }

        for debris in &scene.effects.debris {
            surface.fill_circle(
                debris.pos,
                debris.size,
                with_alpha(debris.color, debris.color[3] * debris.opacity),
            );
        }
        for explosion in &scene.effects.explosions {
            surface.stroke_circle(
                explosion.pos,
                explosion.radius,
                3.0,
                with_alpha(colors::SHOCKWAVE, explosion.opacity),
            );
        }

        for text in &scene.effects.texts {
            surface.text(
                text.pos,
                &text.text,
                FLOATING_TEXT_SIZE,
                with_alpha(text.color, text.color[3] * text.opacity),
            );
        }

        surface.set_offset(Vec2::ZERO);
        self.frames_drawn += 1;
    }
}

fn draw_bubble(surface: &mut dyn Surface, node: &BubbleNode, show_labels: bool) {
    let radius = node.current_radius;
    match node.kind {
        // Barely there, no label to give it away
        BubbleKind::Hidden => {
            surface.fill_circle(node.pos, radius, with_alpha(node.color, colors::HIDDEN_ALPHA));
            return;
        }
        BubbleKind::Regular => surface.fill_circle(node.pos, radius, node.color),
        BubbleKind::Tough => {
            surface.fill_circle(node.pos, radius, node.color);
            surface.stroke_circle(node.pos, radius, 3.0, colors::TOUGH_OUTLINE);
        }
        BubbleKind::Question => {
            surface.fill_circle(node.pos, radius, node.color);
            surface.stroke_circle(node.pos, radius, 2.0, colors::QUESTION_OUTLINE);
        }
    }

    if !show_labels || node.text.lines.is_empty() {
        return;
    }
    let size = label_font_size(radius);
    let line_height = size * 1.1;
    let top = node.pos.y - line_height * (node.text.lines.len() as f32 - 1.0) * 0.5;
    for (i, line) in node.text.lines.iter().enumerate() {
        surface.text(
            Vec2::new(node.pos.x, top + line_height * i as f32),
            line,
            size,
            colors::LABEL,
        );
    }
}
