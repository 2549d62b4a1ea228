//! One-shot impulses
//!
//! Both operators write straight into node velocities (and, for explosions,
//! positions) so the kick shows on the next paint without waiting for the
//! solver. They keep no state between calls; callers pick the cadence and
//! nudge the solver's energy afterward.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::node::{BubbleId, BubbleNode};
use crate::clamp_length;
use crate::settings::Intensity;

/// Fraction of an explosion's velocity kick also applied as displacement
pub const EXPLOSION_DISPLACEMENT: f32 = 0.5;

/// Axis-aligned region nodes must stay inside
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Canvas-sized bounds with an inset on every edge
    pub fn from_canvas(width: f32, height: f32, inset: f32) -> Self {
        Self {
            min: Vec2::splat(inset),
            max: Vec2::new(width - inset, height - inset),
        }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Clamp a disc's center so the whole disc stays inside.
    /// Axes too narrow for the disc collapse to the center line.
    pub fn clamp_disc(&self, pos: Vec2, radius: f32) -> Vec2 {
        let center = self.center();
        let axis = |p: f32, lo: f32, hi: f32, mid: f32| {
            if hi - lo < 2.0 * radius {
                mid
            } else {
                p.clamp(lo + radius, hi - radius)
            }
        };
        Vec2::new(
            axis(pos.x, self.min.x, self.max.x, center.x),
            axis(pos.y, self.min.y, self.max.y, center.y),
        )
    }

    pub fn contains_disc(&self, pos: Vec2, radius: f32) -> bool {
        pos.x - radius >= self.min.x - 1e-3
            && pos.x + radius <= self.max.x + 1e-3
            && pos.y - radius >= self.min.y - 1e-3
            && pos.y + radius <= self.max.y + 1e-3
    }
}

/// Unit vector from `origin` to `pos`, random when they coincide
fn away_from(origin: Vec2, pos: Vec2, rng: &mut impl Rng) -> (Vec2, f32) {
    let d = pos - origin;
    let dist = d.length();
    if dist > 1e-4 {
        (d / dist, dist)
    } else {
        let angle = rng.random_range(0.0..std::f32::consts::TAU);
        (Vec2::new(angle.cos(), angle.sin()), 0.0)
    }
}

/// Add an outward kick of magnitude `force`.
///
/// Any velocity component heading back toward the origin is flipped first,
/// so the node always leaves faster than it came (up to the ceiling).
fn kick(node: &mut BubbleNode, dir: Vec2, force: f32, ceiling: f32) {
    let radial = node.vel.dot(dir);
    let tangential = node.vel - dir * radial;
    let vel = tangential + dir * (radial.abs() + force);
    node.vel = clamp_length(vel, ceiling);
}

/// Linear falloff: full strength at the origin, zero at `radius`
#[inline]
fn falloff(strength: f32, dist: f32, radius: f32) -> f32 {
    strength * (1.0 - dist / radius).max(0.0)
}

/// Push every node within `radius` of the `center` node away from it.
///
/// Returns the number of nodes touched. Nodes at or beyond `radius` are left
/// exactly as they were.
pub fn push_neighbors(
    center: BubbleId,
    radius: f32,
    strength: f32,
    nodes: &mut [BubbleNode],
    intensity: Intensity,
    rng: &mut impl Rng,
) -> usize {
    if radius <= 0.0 {
        return 0;
    }
    let Some(origin) = nodes.iter().find(|n| n.id() == center).map(|n| n.pos) else {
        return 0;
    };
    let strength = strength * intensity.factor();

    let mut touched = 0;
    for node in nodes.iter_mut() {
        if node.id() == center || node.is_popped() {
            continue;
        }
        if node.pos.distance(origin) >= radius {
            continue;
        }
        let (dir, dist) = away_from(origin, node.pos, rng);
        let ceiling = node.max_velocity(intensity);
        kick(node, dir, falloff(strength, dist, radius), ceiling);
        touched += 1;
    }
    touched
}

/// Blast every node within `radius` of `point` outward.
///
/// Unlike [`push_neighbors`] this also displaces positions immediately and
/// re-clamps them into `bounds`. A node sitting exactly on the point gets a
/// random direction.
pub fn explode_from_point(
    point: Vec2,
    radius: f32,
    strength: f32,
    nodes: &mut [BubbleNode],
    bounds: &Bounds,
    intensity: Intensity,
    rng: &mut impl Rng,
) -> usize {
    if radius <= 0.0 {
        return 0;
    }
    let strength = strength * intensity.factor();

    let mut touched = 0;
    for node in nodes.iter_mut() {
        if node.is_popped() {
            continue;
        }
        let dist = node.pos.distance(point);
        if dist >= radius {
            continue;
        }
        let (dir, dist) = away_from(point, node.pos, rng);
        let force = falloff(strength, dist, radius);
        let ceiling = node.max_velocity(intensity);
        kick(node, dir, force, ceiling);
        node.pos += dir * force * EXPLOSION_DISPLACEMENT;
        node.pos = bounds.clamp_disc(node.pos, node.current_radius);
        touched += 1;
    }
    touched
}
