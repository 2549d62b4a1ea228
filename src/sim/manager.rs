//! Bubble lifecycle: creation, sizing, per-frame state and hit testing
//!
//! The manager owns the saved-position registry that keeps the scene stable
//! across bulk data swaps. It never owns the node array itself.

use std::collections::{HashMap, HashSet};

use glam::Vec2;
use rand::Rng;

use super::impulse::Bounds;
use super::node::{BubbleId, BubbleKind, BubbleNode, SourceBubble, Tier};
use crate::consts::*;
use crate::settings::{Intensity, Settings};

/// Minimum gap kept between freshly placed bubbles
pub const PLACEMENT_GAP: f32 = 8.0;
/// Random placement attempts per bubble before settling for the best spot
pub const PLACEMENT_ATTEMPTS: usize = 300;

/// Position and velocity remembered across a node swap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SavedPosition {
    pub pos: Vec2,
    pub vel: Vec2,
}

/// Allowed base-radius range for a node set on a canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusBand {
    pub min: f32,
    pub max: f32,
    /// No bubble may exceed this, kind multiplier included
    pub ceiling: f32,
}

impl RadiusBand {
    /// Base radius for a tier/kind pair
    pub fn radius_for(&self, tier: Tier, kind: BubbleKind) -> f32 {
        let r = self.min + (self.max - self.min) * tier.weight();
        (r * kind.size_multiplier()).min(self.ceiling)
    }
}

/// Owns saved positions and applies per-frame bubble state
#[derive(Debug, Clone)]
pub struct BubbleManager {
    saved: HashMap<BubbleId, SavedPosition>,
    inset: f32,
    hud_band: f32,
    breathing: bool,
}

impl BubbleManager {
    pub fn new(settings: &Settings) -> Self {
        Self {
            saved: HashMap::new(),
            inset: settings.edge_inset.max(0.0),
            hud_band: settings.hud_band_height.max(0.0),
            breathing: settings.effective_breathing(),
        }
    }

    /// Region node discs are clamped into
    pub fn bounds(&self, width: f32, height: f32) -> Bounds {
        Bounds::from_canvas(width, height, self.inset)
    }

    /// Region fresh bubbles are scattered into (below the HUD band when it fits)
    fn placement_bounds(&self, width: f32, height: f32) -> Bounds {
        let mut bounds = self.bounds(width, height);
        let below_hud = self.hud_band + self.inset;
        if bounds.max.y - below_hud > (bounds.max.y - bounds.min.y) * 0.5 {
            bounds.min.y = below_hud;
        }
        bounds
    }

    /// Radius band from a target fill ratio, adjusted for aspect ratio
    pub fn radius_band(&self, count: usize, width: f32, height: f32) -> RadiusBand {
        let usable_w = (width - 2.0 * self.inset).max(1.0);
        let usable_h = (height - self.hud_band - 2.0 * self.inset).max(1.0);
        let count = count.max(1) as f32;

        let avg = (usable_w * usable_h * TARGET_FILL_RATIO / (count * std::f32::consts::PI)).sqrt();
        // Narrow canvases get a tighter band so big bubbles still fit across
        let aspect = usable_w.min(usable_h) / usable_w.max(usable_h);
        let spread = 0.35 * aspect.sqrt().max(0.5);

        let ceiling =
            (usable_w.min(usable_h) / 2.0 / MAX_HOVER_MULTIPLIER).min(ABSOLUTE_MAX_RADIUS);
        let max = (avg * (1.0 + spread)).min(ceiling);
        let min = (avg * (1.0 - spread)).max(ABSOLUTE_MIN_RADIUS).min(max);
        RadiusBand { min, max, ceiling }
    }

    /// Build nodes for a full data set, reusing saved positions by id.
    ///
    /// Duplicate ids keep their first record.
    pub fn create_nodes(
        &self,
        sources: &[SourceBubble],
        width: f32,
        height: f32,
        rng: &mut impl Rng,
    ) -> Vec<BubbleNode> {
        let mut seen = HashSet::new();
        let sources: Vec<&SourceBubble> = sources
            .iter()
            .filter(|s| {
                let fresh = seen.insert(s.id);
                if !fresh {
                    log::warn!("Duplicate bubble id {} dropped", s.id);
                }
                fresh
            })
            .collect();

        let band = self.radius_band(sources.len(), width, height);
        let area = self.placement_bounds(width, height);
        let mut nodes: Vec<BubbleNode> = Vec::with_capacity(sources.len());
        let mut reused = 0;

        // Saved nodes first so fresh ones are placed around them
        let (saved, fresh): (Vec<&SourceBubble>, Vec<&SourceBubble>) =
            sources.iter().copied().partition(|s| self.saved.contains_key(&s.id));

        for source in saved {
            let radius = band.radius_for(Tier::resolve(&source.tier), source.kind());
            let phase = rng.random_range(0.0..std::f32::consts::TAU);
            let mut node = BubbleNode::new(source, Vec2::ZERO, radius, phase);
            if let Some(saved) = self.saved.get(&source.id) {
                node.pos = saved.pos;
                node.vel = saved.vel;
                reused += 1;
            }
            nodes.push(node);
        }
        for source in fresh {
            let radius = band.radius_for(Tier::resolve(&source.tier), source.kind());
            let phase = rng.random_range(0.0..std::f32::consts::TAU);
            let pos = place(&area, radius, &nodes, rng);
            nodes.push(BubbleNode::new(source, pos, radius, phase));
        }

        // Restore source order so draw order follows the data
        let order: HashMap<BubbleId, usize> =
            sources.iter().enumerate().map(|(i, s)| (s.id, i)).collect();
        nodes.sort_by_key(|n| order.get(&n.id()).copied().unwrap_or(usize::MAX));

        log::debug!(
            "Created {} nodes ({} from saved positions), radius band {:.1}..{:.1}",
            nodes.len(),
            reused,
            band.min,
            band.max
        );
        nodes
    }

    /// Per-frame radius, drift, damping and boundary update
    pub fn update_bubble_states(
        &self,
        nodes: &mut [BubbleNode],
        width: f32,
        height: f32,
        intensity: Intensity,
        time_secs: f32,
        rng: &mut impl Rng,
    ) {
        let bounds = self.bounds(width, height);
        let drift = BROWNIAN_DRIFT * intensity.factor();

        for node in nodes.iter_mut() {
            if node.is_popped() {
                continue;
            }

            // Ease toward target, riding the breathing wave when enabled
            let breath = if self.breathing {
                node.base_radius
                    * BREATHING_AMPLITUDE
                    * (time_secs * BREATHING_SPEED + node.oscillation_phase).sin()
            } else {
                0.0
            };
            let goal = node.target_radius + breath;
            let eased = node.current_radius + (goal - node.current_radius) * RADIUS_EASING;
            node.set_current_radius(eased);

            node.pos += Vec2::new(
                rng.random_range(-drift..=drift),
                rng.random_range(-drift..=drift),
            );

            node.pos += node.vel;
            node.vel *= VELOCITY_DAMPING;
            if node.vel.length() < VELOCITY_EPSILON {
                node.vel = Vec2::ZERO;
            }

            node.pos = bounds.clamp_disc(node.pos, node.current_radius);

            if node.needs_relayout() {
                node.relayout_text();
            }
        }
    }

    /// Remember every node's position and velocity for the next swap
    pub fn save_positions(&mut self, nodes: &[BubbleNode]) {
        for node in nodes {
            self.saved.insert(
                node.id(),
                SavedPosition {
                    pos: node.pos,
                    vel: node.vel,
                },
            );
        }
    }

    pub fn saved_position(&self, id: BubbleId) -> Option<SavedPosition> {
        self.saved.get(&id).copied()
    }

    pub fn clear_saved_positions(&mut self) {
        self.saved.clear();
    }

    /// A copy of `nodes` without `id`. Absent ids yield an identical copy.
    pub fn remove_bubble(&self, id: BubbleId, nodes: &[BubbleNode]) -> Vec<BubbleNode> {
        nodes.iter().filter(|n| n.id() != id).cloned().collect()
    }

    /// Topmost live node under a point. Later nodes draw on top, so search back to front.
    pub fn find_under_cursor<'a>(
        &self,
        point: Vec2,
        nodes: &'a [BubbleNode],
    ) -> Option<&'a BubbleNode> {
        nodes
            .iter()
            .rev()
            .find(|n| !n.is_popped() && n.contains(point))
    }
}

/// Rejection-sample a spot that keeps `PLACEMENT_GAP` from placed nodes.
/// Falls back to the least-overlapping candidate.
fn place(area: &Bounds, radius: f32, placed: &[BubbleNode], rng: &mut impl Rng) -> Vec2 {
    let lo = area.min + Vec2::splat(radius);
    let hi = area.max - Vec2::splat(radius);
    let center = area.center();

    let mut best = (f32::MAX, center);
    for _ in 0..PLACEMENT_ATTEMPTS {
        let candidate = Vec2::new(
            axis_sample(rng, lo.x, hi.x, center.x),
            axis_sample(rng, lo.y, hi.y, center.y),
        );
        let worst = placed
            .iter()
            .map(|n| n.current_radius + radius + PLACEMENT_GAP - n.pos.distance(candidate))
            .fold(f32::MIN, f32::max);
        if worst <= 0.0 {
            return candidate;
        }
        if worst < best.0 {
            best = (worst, candidate);
        }
    }
    best.1
}

fn axis_sample(rng: &mut impl Rng, lo: f32, hi: f32, mid: f32) -> f32 {
    if hi > lo {
        rng.random_range(lo..hi)
    } else {
        mid
    }
}
