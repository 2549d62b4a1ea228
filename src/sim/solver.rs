//! Continuous force layout
//!
//! A velocity-Verlet style layout in the spirit of classic force-directed
//! graph simulations: forces accumulate into node velocities scaled by the
//! current energy (`alpha`), then velocities decay and integrate into
//! positions. Energy cools toward zero each tick; a reheat timer re-injects
//! energy so the field keeps drifting instead of freezing.

use std::collections::HashMap;

use glam::Vec2;

use super::node::BubbleNode;
use crate::error::EngineError;
use crate::settings::Intensity;

/// Energy on the very first node set (full layout convergence)
pub const INITIAL_ALPHA: f32 = 1.0;
/// Energy on later node swaps (avoids visible snapping)
pub const SWAP_ALPHA: f32 = 0.3;
/// How often the reheat timer checks the energy floor (ms)
pub const REHEAT_INTERVAL_MS: f64 = 3000.0;

/// Force strengths and cooling, derived from the intensity level
#[derive(Debug, Clone, PartialEq)]
pub struct SolverParams {
    /// Pull toward the layout center (per unit distance)
    pub center_strength: f32,
    /// Pairwise charge; negative repels
    pub charge_strength: f32,
    /// How much of an overlap is corrected per tick (0-1)
    pub collide_strength: f32,
    /// Extra spacing added to each node's live radius for collisions
    pub collide_margin: f32,
    /// Long-range containment toward the center
    pub radial_strength: f32,
    /// Fraction of the shorter layout side beyond which containment kicks in
    pub radial_extent: f32,
    /// Energy cooling per tick
    pub alpha_decay: f32,
    /// Below this the solver stops integrating
    pub alpha_min: f32,
    /// Fraction of velocity lost per tick
    pub velocity_decay: f32,
    /// Reheat when energy falls below this
    pub reheat_floor: f32,
    /// Energy restored by a reheat
    pub reheat_alpha: f32,
}

impl SolverParams {
    pub fn for_intensity(intensity: Intensity) -> Self {
        let factor = intensity.factor();
        Self {
            center_strength: 0.012 * factor,
            charge_strength: -25.0 * factor,
            collide_strength: 0.7,
            collide_margin: 3.0,
            radial_strength: 0.04 * factor,
            radial_extent: 0.45,
            alpha_decay: 0.0228 / factor,
            alpha_min: 0.001,
            velocity_decay: (0.4 / factor).max(0.15),
            reheat_floor: 0.05 * factor,
            reheat_alpha: 0.1 * factor,
        }
    }
}

/// Periodic energy check
#[derive(Debug, Clone)]
struct ReheatTimer {
    interval_ms: f64,
    last_check_ms: Option<f64>,
}

/// Force-directed layout over the engine's node array
#[derive(Debug, Clone)]
pub struct ForceSolver {
    width: f32,
    height: f32,
    hud_band: f32,
    params: SolverParams,
    alpha: f32,
    alpha_target: f32,
    has_nodes: bool,
    reheat: Option<ReheatTimer>,
}

impl ForceSolver {
    /// Create a solver for a canvas. Fails on zero-area canvases.
    pub fn new(
        width: f32,
        height: f32,
        intensity: Intensity,
        hud_band: f32,
    ) -> Result<Self, EngineError> {
        EngineError::check_canvas(width, height)?;
        Ok(Self {
            width,
            height,
            hud_band: hud_band.clamp(0.0, height * 0.5),
            params: SolverParams::for_intensity(intensity),
            alpha: 0.0,
            alpha_target: 0.0,
            has_nodes: false,
            reheat: Some(ReheatTimer {
                interval_ms: REHEAT_INTERVAL_MS,
                last_check_ms: None,
            }),
        })
    }

    pub fn params(&self) -> &SolverParams {
        &self.params
    }

    /// Retune forces for a new intensity level
    pub fn set_intensity(&mut self, intensity: Intensity) {
        self.params = SolverParams::for_intensity(intensity);
    }

    pub fn resize(&mut self, width: f32, height: f32) -> Result<(), EngineError> {
        EngineError::check_canvas(width, height)?;
        self.width = width;
        self.height = height;
        self.hud_band = self.hud_band.clamp(0.0, height * 0.5);
        self.nudge(SWAP_ALPHA);
        Ok(())
    }

    /// Layout center, offset below the HUD band
    pub fn center(&self) -> Vec2 {
        Vec2::new(
            self.width / 2.0,
            self.hud_band + (self.height - self.hud_band) / 2.0,
        )
    }

    /// Register a freshly swapped node set and re-energize
    pub fn set_nodes(&mut self, nodes: &[BubbleNode]) {
        let alpha = if self.has_nodes {
            SWAP_ALPHA
        } else {
            INITIAL_ALPHA
        };
        self.has_nodes = true;
        self.alpha = self.alpha.max(alpha);
        log::debug!("Solver took {} nodes at energy {:.2}", nodes.len(), self.alpha);
    }

    pub fn current_energy(&self) -> f32 {
        self.alpha
    }

    /// Whether ticks still integrate motion
    pub fn is_active(&self) -> bool {
        self.alpha >= self.params.alpha_min
    }

    /// Raise energy to at least `alpha`
    pub fn nudge(&mut self, alpha: f32) {
        self.alpha = self.alpha.max(alpha.clamp(0.0, 1.0));
    }

    /// Drive the reheat timer. Returns true if energy was re-injected.
    pub fn maintain(&mut self, now_ms: f64) -> bool {
        let Some(timer) = self.reheat.as_mut() else {
            return false;
        };
        let due = match timer.last_check_ms {
            None => true,
            Some(last) => now_ms - last >= timer.interval_ms,
        };
        if !due {
            return false;
        }
        timer.last_check_ms = Some(now_ms);
        if self.has_nodes && self.alpha < self.params.reheat_floor {
            self.alpha = self.params.reheat_alpha;
            log::trace!("Solver reheated to {:.3}", self.alpha);
            return true;
        }
        false
    }

    /// Tear down: clear the reheat timer and drain energy
    pub fn stop(&mut self) {
        self.reheat = None;
        self.alpha = 0.0;
    }

    pub fn is_stopped(&self) -> bool {
        self.reheat.is_none()
    }

    /// Advance one tick. No-op once energy has cooled below `alpha_min`.
    pub fn tick(&mut self, nodes: &mut [BubbleNode]) {
        if !self.is_active() {
            return;
        }
        self.alpha += (self.alpha_target - self.alpha) * self.params.alpha_decay;

        self.apply_center(nodes);
        self.apply_charge(nodes);
        self.apply_collide(nodes);
        self.apply_radial(nodes);

        let keep = 1.0 - self.params.velocity_decay;
        for node in nodes.iter_mut() {
            node.vel *= keep;
            node.pos += node.vel;
        }
    }

    fn apply_center(&self, nodes: &mut [BubbleNode]) {
        let center = self.center();
        let k = self.params.center_strength * self.alpha;
        for node in nodes.iter_mut() {
            node.vel += (center - node.pos) * k;
        }
    }

    /// All-pairs repulsion, the solver's one O(n²) force
    fn apply_charge(&self, nodes: &mut [BubbleNode]) {
        let k = self.params.charge_strength * self.alpha;
        let positions: Vec<Vec2> = nodes.iter().map(|n| n.pos).collect();
        for (i, node) in nodes.iter_mut().enumerate() {
            for (j, &other) in positions.iter().enumerate() {
                if i == j {
                    continue;
                }
                let d = other - positions[i];
                let l2 = d.length_squared().max(1.0);
                node.vel += d * (k / l2);
            }
        }
    }

    /// Overlap separation on predicted positions, neighbors from a uniform grid
    fn apply_collide(&self, nodes: &mut [BubbleNode]) {
        let margin = self.params.collide_margin;
        let strength = self.params.collide_strength;
        let max_r = nodes
            .iter()
            .map(|n| n.current_radius + margin)
            .fold(0.0_f32, f32::max);
        if max_r <= 0.0 {
            return;
        }
        let predicted: Vec<Vec2> = nodes.iter().map(|n| n.pos + n.vel).collect();
        let grid = CollisionGrid::build(&predicted, max_r * 2.0);

        for i in 0..nodes.len() {
            let ri = nodes[i].current_radius + margin;
            for j in grid.neighbors(predicted[i]) {
                if j <= i {
                    continue;
                }
                let rj = nodes[j].current_radius + margin;
                let r = ri + rj;
                let mut d = (nodes[i].pos + nodes[i].vel) - (nodes[j].pos + nodes[j].vel);
                let mut l2 = d.length_squared();
                if l2 >= r * r {
                    continue;
                }
                if l2 < 1e-6 {
                    // Coincident centers: split along a fixed per-pair direction
                    let angle = (i * 7 + j * 13) as f32;
                    d = Vec2::new(angle.cos(), angle.sin()) * 1e-3;
                    l2 = d.length_squared();
                }
                let l = l2.sqrt();
                let push = d * ((r - l) / l * strength);
                let (ri2, rj2) = (ri * ri, rj * rj);
                let wi = rj2 / (ri2 + rj2);
                nodes[i].vel += push * wi;
                nodes[j].vel -= push * (1.0 - wi);
            }
        }
    }

    fn apply_radial(&self, nodes: &mut [BubbleNode]) {
        let center = self.center();
        let extent = self.width.min(self.height - self.hud_band) * self.params.radial_extent;
        let k = self.params.radial_strength * self.alpha;
        for node in nodes.iter_mut() {
            let d = node.pos - center;
            let r = d.length();
            if r > extent && r > 0.0 {
                node.vel += d * ((extent - r) * k / r);
            }
        }
    }
}

/// Uniform grid bucketing points by cell
struct CollisionGrid {
    cell: f32,
    buckets: HashMap<(i32, i32), Vec<usize>>,
}

impl CollisionGrid {
    fn build(points: &[Vec2], cell: f32) -> Self {
        let mut grid = Self {
            cell: cell.max(1.0),
            buckets: HashMap::new(),
        };
        for (i, &p) in points.iter().enumerate() {
            let key = grid.key(p);
            grid.buckets.entry(key).or_default().push(i);
        }
        grid
    }

    fn key(&self, p: Vec2) -> (i32, i32) {
        ((p.x / self.cell).floor() as i32, (p.y / self.cell).floor() as i32)
    }

    /// Indices in the 3x3 block of cells around `p`
    fn neighbors(&self, p: Vec2) -> impl Iterator<Item = usize> + '_ {
        let (cx, cy) = self.key(p);
        (-1..=1)
            .flat_map(move |dx| (-1..=1).map(move |dy| (cx + dx, cy + dy)))
            .filter_map(|key| self.buckets.get(&key))
            .flat_map(|bucket| bucket.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::node::SourceBubble;

    fn node_at(id: u32, x: f32, y: f32, r: f32) -> BubbleNode {
        BubbleNode::new(&SourceBubble::new(id, "n"), Vec2::new(x, y), r, 0.0)
    }

    fn solver() -> ForceSolver {
        ForceSolver::new(800.0, 600.0, Intensity::default(), 80.0).unwrap()
    }

    #[test]
    fn test_zero_area_canvas_fails() {
        assert!(ForceSolver::new(0.0, 600.0, Intensity::default(), 80.0).is_err());
        assert!(solver().resize(800.0, 0.0).is_err());
    }

    #[test]
    fn test_center_below_hud() {
        let s = solver();
        assert_eq!(s.center(), Vec2::new(400.0, 340.0));
    }

    #[test]
    fn test_set_nodes_energy() {
        let mut s = solver();
        assert_eq!(s.current_energy(), 0.0);
        s.set_nodes(&[]);
        assert_eq!(s.current_energy(), INITIAL_ALPHA);

        let mut s = solver();
        s.set_nodes(&[]);
        s.alpha = 0.0;
        s.set_nodes(&[]);
        assert_eq!(s.current_energy(), SWAP_ALPHA);
    }

    #[test]
    fn test_energy_cools() {
        let mut s = solver();
        let mut nodes = vec![node_at(1, 400.0, 340.0, 30.0)];
        s.set_nodes(&nodes);
        let before = s.current_energy();
        s.tick(&mut nodes);
        assert!(s.current_energy() < before);
    }

    #[test]
    fn test_overlapping_nodes_separate() {
        let mut s = solver();
        let mut nodes = vec![node_at(1, 390.0, 340.0, 30.0), node_at(2, 410.0, 340.0, 30.0)];
        s.set_nodes(&nodes);
        let start = nodes[0].pos.distance(nodes[1].pos);
        for _ in 0..10 {
            s.tick(&mut nodes);
        }
        let end = nodes[0].pos.distance(nodes[1].pos);
        assert!(end > start + 15.0, "start {start} end {end}");
    }

    #[test]
    fn test_coincident_nodes_do_not_nan() {
        let mut s = solver();
        let mut nodes = vec![node_at(1, 400.0, 340.0, 30.0), node_at(2, 400.0, 340.0, 30.0)];
        s.set_nodes(&nodes);
        s.tick(&mut nodes);
        assert!(nodes.iter().all(|n| n.pos.is_finite()));
        assert!(nodes[0].pos != nodes[1].pos);
    }

    #[test]
    fn test_radial_containment_pulls_inward() {
        let mut s = solver();
        let mut nodes = vec![node_at(1, 5.0, 590.0, 20.0)];
        s.set_nodes(&nodes);
        let center = s.center();
        let before = nodes[0].pos.distance(center);
        s.tick(&mut nodes);
        assert!(nodes[0].pos.distance(center) < before);
    }

    #[test]
    fn test_reheat_timer() {
        let mut s = solver();
        s.set_nodes(&[]);
        s.alpha = 0.0;
        // First call arms the timer and reheats immediately
        assert!(s.maintain(0.0));
        assert!(s.current_energy() > 0.0);
        s.alpha = 0.0;
        assert!(!s.maintain(1000.0));
        assert!(s.maintain(REHEAT_INTERVAL_MS + 1.0));
    }

    #[test]
    fn test_stop_clears_timer() {
        let mut s = solver();
        s.set_nodes(&[]);
        s.stop();
        assert!(s.is_stopped());
        assert_eq!(s.current_energy(), 0.0);
        assert!(!s.maintain(10_000.0));
    }

    #[test]
    fn test_intensity_scales_forces() {
        let calm = SolverParams::for_intensity(Intensity::new(1));
        let frantic = SolverParams::for_intensity(Intensity::new(5));
        assert!(frantic.charge_strength < calm.charge_strength);
        assert!(frantic.alpha_decay < calm.alpha_decay);
        assert!(frantic.center_strength > calm.center_strength);
    }
}
