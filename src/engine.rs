//! The owning engine instance
//!
//! One `BubbleEngine` holds every piece of mutable state: nodes, saved
//! positions, effects, solver and render loop. Hosts drive it with `frame`
//! once per display refresh and forward pointer events between frames.
//! Handlers take `&mut self`, so a click can never start while another is
//! still being handled.

use std::collections::HashSet;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::consts::HOVER_SCALE;
use crate::error::EngineError;
use crate::render::{RenderLoop, Scene, Surface};
use crate::settings::{Intensity, Settings};
use crate::sim::effects::{EffectsEngine, FloatingTextRequest, TextKind};
use crate::sim::hooks::Hooks;
use crate::sim::impulse;
use crate::sim::interaction::{self, ClickOutcome, Command};
use crate::sim::manager::BubbleManager;
use crate::sim::node::{BubbleId, BubbleKind, BubbleNode, SourceBubble};
use crate::sim::solver::ForceSolver;

/// Hover nudge reaches this many radii from the hovered bubble
pub const HOVER_PUSH_REACH: f32 = 2.0;
pub const HOVER_PUSH_STRENGTH: f32 = 0.6;
/// Detonation blast reaches this many radii from the popped bubble
pub const DETONATION_REACH: f32 = 3.5;
pub const DETONATION_STRENGTH: f32 = 4.0;
/// Solver energy after an impulse so forces pick the kick up
pub const IMPULSE_ALPHA: f32 = 0.2;

pub const LEVEL_UP_COLOR: [f32; 4] = [1.0, 0.85, 0.3, 1.0];
pub const ACHIEVEMENT_COLOR: [f32; 4] = [0.55, 0.75, 1.0, 1.0];

/// Where the canvas sits in the host's client coordinate space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl CanvasRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Map a client point to canvas pixels.
    ///
    /// Scales when the displayed size differs from the canvas size.
    pub fn to_local(&self, client: Vec2, canvas_size: Vec2) -> Vec2 {
        let scale = if self.width > 0.0 && self.height > 0.0 {
            canvas_size / Vec2::new(self.width, self.height)
        } else {
            Vec2::ONE
        };
        (client - Vec2::new(self.left, self.top)) * scale
    }
}

/// Snapshot of engine counters for logging
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EngineStats {
    pub nodes: usize,
    pub live_nodes: usize,
    pub pending_removals: usize,
    pub explosions: usize,
    pub debris: usize,
    pub texts: usize,
    pub quality_tier: u8,
    pub energy: f32,
    pub fps: Option<f32>,
    pub frames_drawn: u64,
    pub frames_skipped: u64,
}

#[derive(Debug)]
pub struct BubbleEngine {
    settings: Settings,
    width: f32,
    height: f32,
    intensity: Intensity,
    rng: Pcg32,

    nodes: Vec<BubbleNode>,
    manager: BubbleManager,
    solver: ForceSolver,
    effects: EffectsEngine,
    render: RenderLoop,
    hooks: Hooks,

    canvas_rect: CanvasRect,
    hovered: Option<BubbleId>,
    pending_removals: Vec<BubbleId>,
    /// Kinds detonated at least once, for first-pop achievements
    popped_kinds: HashSet<BubbleKind>,

    start_ms: Option<f64>,
    now_ms: f64,
    running: bool,
}

impl BubbleEngine {
    /// Create an engine for a canvas. Fails fast on a zero-area canvas.
    pub fn new(
        width: f32,
        height: f32,
        settings: Settings,
        seed: u64,
    ) -> Result<Self, EngineError> {
        EngineError::check_canvas(width, height)?;
        let intensity = settings.intensity;
        let mut rng = Pcg32::seed_from_u64(seed);
        let solver = ForceSolver::new(width, height, intensity, settings.hud_band_height)?;
        let render = RenderLoop::new(&settings, width, height, &mut rng);

        let mut engine = Self {
            manager: BubbleManager::new(&settings),
            effects: EffectsEngine::new(settings.max_debris(), settings.effective_screen_shake()),
            settings,
            width,
            height,
            intensity,
            rng,
            nodes: Vec::new(),
            solver,
            render,
            hooks: Hooks::default(),
            canvas_rect: CanvasRect::new(0.0, 0.0, width, height),
            hovered: None,
            pending_removals: Vec::new(),
            popped_kinds: HashSet::new(),
            start_ms: None,
            now_ms: 0.0,
            running: true,
        };
        engine.render.request_frame();
        log::info!(
            "Engine started on {}x{} canvas (intensity {}, quality {})",
            width,
            height,
            intensity.level(),
            engine.settings.quality.as_str()
        );
        Ok(engine)
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn set_hooks(&mut self, hooks: Hooks) {
        self.hooks = hooks;
    }

    pub fn set_canvas_rect(&mut self, rect: CanvasRect) {
        self.canvas_rect = rect;
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn intensity(&self) -> Intensity {
        self.intensity
    }

    pub fn solver(&self) -> &ForceSolver {
        &self.solver
    }

    pub fn effects(&self) -> &EffectsEngine {
        &self.effects
    }

    pub fn canvas_size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_frame_pending(&self) -> bool {
        self.render.is_frame_pending()
    }

    pub fn hovered(&self) -> Option<BubbleId> {
        self.hovered
    }

    pub fn pending_removals(&self) -> &[BubbleId] {
        &self.pending_removals
    }

    /// Replace the bubble set, keeping positions of ids seen before
    pub fn set_bubbles(&mut self, sources: &[SourceBubble]) {
        self.manager.save_positions(&self.nodes);
        self.nodes = self
            .manager
            .create_nodes(sources, self.width, self.height, &mut self.rng);
        self.solver.set_nodes(&self.nodes);
        self.pending_removals.clear();
        // Fresh nodes start unhovered; re-apply if the hovered id survived
        let hovered = self.hovered.take();
        self.set_hovered(hovered);
        log::info!("Bubble set replaced: {} nodes", self.nodes.len());
    }

    pub fn find_bubble_by_id(&self, id: BubbleId) -> Option<&BubbleNode> {
        self.nodes.iter().find(|n| n.id() == id)
    }

    pub fn current_bubbles(&self) -> &[BubbleNode] {
        &self.nodes
    }

    /// Fix a click-gated bubble's threshold ahead of its first click
    pub fn set_clicks_required(&mut self, id: BubbleId, required: u32) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        let node = &mut self.nodes[idx];
        if !node.kind.is_click_gated() || node.clicks_required.is_some() {
            return false;
        }
        node.clicks_required = Some(required.max(1));
        true
    }

    fn index_of(&self, id: BubbleId) -> Option<usize> {
        self.nodes.iter().position(|n| n.id() == id)
    }

    /// Run one display frame.
    ///
    /// Without a surface the draw is skipped and the loop carries on. Returns
    /// false once the engine has been stopped.
    pub fn frame(&mut self, now_ms: f64, surface: Option<&mut dyn Surface>) -> bool {
        if !self.running {
            return false;
        }
        self.render.take_frame();
        self.now_ms = now_ms;
        let start = *self.start_ms.get_or_insert(now_ms);

        self.flush_removals();

        self.solver.maintain(now_ms);
        self.solver.tick(&mut self.nodes);
        let time_secs = ((now_ms - start) / 1000.0) as f32;
        self.manager.update_bubble_states(
            &mut self.nodes,
            self.width,
            self.height,
            self.intensity,
            time_secs,
            &mut self.rng,
        );

        self.effects.advance(now_ms, &self.nodes);
        self.render.record_frame(now_ms);
        let shake = self.effects.shake.sample(now_ms, &mut self.rng);

        match surface {
            Some(surface) => {
                let scene = Scene {
                    nodes: &self.nodes,
                    effects: &self.effects,
                    hovered: self.hovered,
                    shake,
                    glow: self.effects.glow.intensity(now_ms),
                };
                self.render.draw(surface, &scene);
            }
            None => self.render.skip_frame(),
        }

        self.render.request_frame();
        true
    }

    fn to_local(&self, client_x: f32, client_y: f32) -> Vec2 {
        self.canvas_rect
            .to_local(Vec2::new(client_x, client_y), self.canvas_size())
    }

    /// Pointer moved in client coordinates. Returns the hovered bubble.
    pub fn pointer_move(&mut self, client_x: f32, client_y: f32) -> Option<BubbleId> {
        let point = self.to_local(client_x, client_y);
        let hit = self
            .manager
            .find_under_cursor(point, &self.nodes)
            .map(|n| n.id());
        if hit == self.hovered {
            return hit;
        }
        self.set_hovered(hit);

        if let Some(idx) = hit.and_then(|id| self.index_of(id)) {
            let id = self.nodes[idx].id();
            let reach = self.nodes[idx].current_radius * HOVER_PUSH_REACH;
            impulse::push_neighbors(
                id,
                reach,
                HOVER_PUSH_STRENGTH,
                &mut self.nodes,
                self.intensity,
                &mut self.rng,
            );
            self.solver.nudge(IMPULSE_ALPHA);
        }
        hit
    }

    pub fn pointer_leave(&mut self) {
        self.set_hovered(None);
    }

    fn set_hovered(&mut self, target: Option<BubbleId>) {
        if let Some(idx) = self.hovered.and_then(|id| self.index_of(id)) {
            let node = &mut self.nodes[idx];
            node.is_hovered = false;
            let base = node.base_radius;
            node.set_target_radius(base);
        }
        self.hovered = None;

        if let Some(idx) = target.and_then(|id| self.index_of(id)) {
            let node = &mut self.nodes[idx];
            if !node.is_popped() {
                node.is_hovered = true;
                let hover = node.base_radius * HOVER_SCALE;
                node.set_target_radius(hover);
                self.hovered = target;
            }
        }
        self.effects.glow.set(self.hovered, self.now_ms);
    }

    /// Pointer clicked in client coordinates
    pub fn pointer_click(&mut self, client_x: f32, client_y: f32) -> ClickOutcome {
        let point = self.to_local(client_x, client_y);
        let Some(idx) = self
            .manager
            .find_under_cursor(point, &self.nodes)
            .map(|n| n.id())
            .and_then(|id| self.index_of(id))
        else {
            return ClickOutcome::Ignored;
        };

        let response =
            interaction::handle_click(&mut self.nodes[idx], point, self.intensity, &mut self.rng);
        log::debug!(
            "Click on {} bubble {}: {:?}",
            self.nodes[idx].kind.as_str(),
            self.nodes[idx].id(),
            response.outcome
        );
        if matches!(response.outcome, ClickOutcome::Progress(_)) {
            self.solver.nudge(IMPULSE_ALPHA);
        }
        self.run_commands(response.commands);
        response.outcome
    }

    /// The detail dialog for `id` was dismissed
    pub fn continue_detail(&mut self, id: BubbleId) -> bool {
        let Some(node) = self.find_bubble_by_id(id) else {
            log::warn!("Continue for unknown bubble {}", id);
            return false;
        };
        if !matches!(node.kind, BubbleKind::Regular | BubbleKind::Tough) {
            log::warn!("Continue for {} bubble {} ignored", node.kind.as_str(), id);
            return false;
        }
        let commands = interaction::continue_after_detail(node);
        let handled = !commands.is_empty();
        self.run_commands(commands);
        handled
    }

    /// The question dialog for `id` was answered
    pub fn answer_question(&mut self, id: BubbleId, agreed: bool) -> bool {
        let Some(node) = self.find_bubble_by_id(id) else {
            log::warn!("Answer for unknown bubble {}", id);
            return false;
        };
        let commands = interaction::resolve_answer(node, agreed);
        let handled = !commands.is_empty();
        self.run_commands(commands);
        handled
    }

    fn run_commands(&mut self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::Reward { amount, source } => self.reward(amount, source),
                Command::OpenDetail { id } => self.open_detail(id),
                Command::OpenQuestion { id } => self.open_question(id),
                Command::FloatingText {
                    pos,
                    text,
                    kind,
                    color,
                } => self.create_floating_text(FloatingTextRequest {
                    x: pos.x,
                    y: pos.y,
                    text,
                    kind,
                    color,
                }),
                Command::Detonate { id } => {
                    self.request_detonation(id);
                }
                Command::QueueRemoval { id } => self.queue_removal(id),
            }
        }
    }

    fn reward(&mut self, amount: i32, source: BubbleKind) {
        match self.hooks.reward.reward(amount, source) {
            Ok(outcome) => {
                if let Some(tier) = outcome.tier_up {
                    self.level_up(tier);
                }
            }
            Err(err) => log::warn!(
                "Reward {} for {} bubble failed: {}",
                amount,
                source.as_str(),
                err
            ),
        }
    }

    fn level_up(&mut self, tier: u32) {
        log::info!("Tier up: {}", tier);
        if let Err(err) = self.hooks.modal.open_level_up(tier) {
            log::warn!("Level-up dialog failed: {}", err);
        }
        let center = self.solver.center();
        self.create_floating_text(FloatingTextRequest {
            x: center.x,
            y: center.y,
            text: "LEVEL UP".into(),
            kind: TextKind::Gain,
            color: LEVEL_UP_COLOR,
        });
    }

    fn open_detail(&mut self, id: BubbleId) {
        let Some(node) = self.find_bubble_by_id(id) else {
            return;
        };
        let name = node.name.clone();
        let description = node.description.clone();
        if let Err(err) = self.hooks.modal.open_detail(id, &name, description.as_deref()) {
            // Nothing will ever send "continue"; finish now so the node cannot get stuck
            log::warn!("Detail dialog for {} failed, continuing: {}", id, err);
            self.continue_detail(id);
        }
    }

    fn open_question(&mut self, id: BubbleId) {
        let Some(node) = self.find_bubble_by_id(id) else {
            return;
        };
        let prompt = node.description.clone().unwrap_or_else(|| node.name.clone());
        if let Err(err) = self.hooks.modal.open_question(id, &prompt) {
            log::warn!("Question dialog for {} failed, removing: {}", id, err);
            self.explode_bubble(id);
        }
    }

    /// Play removal effects and mark the node popped. At most once per node.
    pub fn request_detonation(&mut self, id: BubbleId) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        if !self
            .effects
            .explode(&mut self.nodes[idx], self.now_ms, &mut self.rng)
        {
            return false;
        }
        let (pos, radius, kind) = {
            let node = &self.nodes[idx];
            (node.pos, node.current_radius, node.kind)
        };
        if self.hovered == Some(id) {
            self.set_hovered(None);
        }

        let bounds = self.manager.bounds(self.width, self.height);
        let touched = impulse::explode_from_point(
            pos,
            radius * DETONATION_REACH,
            DETONATION_STRENGTH,
            &mut self.nodes,
            &bounds,
            self.intensity,
            &mut self.rng,
        );
        self.solver.nudge(IMPULSE_ALPHA);
        log::debug!("Detonated {} ({} neighbors pushed)", id, touched);

        self.first_pop(kind, pos);
        true
    }

    fn first_pop(&mut self, kind: BubbleKind, pos: Vec2) {
        if !self.popped_kinds.insert(kind) {
            return;
        }
        let key = format!("first_pop_{}", kind.as_str());
        match self.hooks.achievements.unlock(&key) {
            Ok(true) => self.create_floating_text(FloatingTextRequest {
                x: pos.x,
                y: pos.y - 24.0,
                text: "ACHIEVEMENT!".into(),
                kind: TextKind::Gain,
                color: ACHIEVEMENT_COLOR,
            }),
            Ok(false) => {}
            Err(err) => log::warn!("Achievement {} failed: {}", key, err),
        }
    }

    fn queue_removal(&mut self, id: BubbleId) {
        if !self.pending_removals.contains(&id) {
            self.pending_removals.push(id);
        }
    }

    /// Drop a node from the live set, detonating it first if needed
    pub fn finalize_removal(&mut self, id: BubbleId) -> bool {
        let Some(idx) = self.index_of(id) else {
            self.pending_removals.retain(|p| *p != id);
            return false;
        };
        if !self.nodes[idx].is_popped() {
            self.request_detonation(id);
        }
        self.nodes = self.manager.remove_bubble(id, &self.nodes);
        self.pending_removals.retain(|p| *p != id);
        if self.hovered == Some(id) {
            self.hovered = None;
            self.effects.glow.set(None, self.now_ms);
        }
        log::debug!("Removed bubble {} ({} left)", id, self.nodes.len());
        true
    }

    fn flush_removals(&mut self) {
        for id in std::mem::take(&mut self.pending_removals) {
            self.finalize_removal(id);
        }
    }

    /// Detonate and queue removal. Safe to call any number of times.
    pub fn explode_bubble(&mut self, id: BubbleId) -> bool {
        let fired = self.request_detonation(id);
        if self.index_of(id).is_some() {
            self.queue_removal(id);
        }
        fired
    }

    pub fn create_floating_text(&mut self, request: FloatingTextRequest) {
        self.effects.create_floating_text(request, self.now_ms);
    }

    /// Push neighbors of `center` outward and re-energize the solver
    pub fn push_neighbors(&mut self, center: BubbleId, radius: f32, strength: f32) -> usize {
        let touched = impulse::push_neighbors(
            center,
            radius,
            strength,
            &mut self.nodes,
            self.intensity,
            &mut self.rng,
        );
        if touched > 0 {
            self.solver.nudge(IMPULSE_ALPHA);
        }
        touched
    }

    /// Blast nodes away from a canvas point and re-energize the solver
    pub fn explode_from_point(&mut self, point: Vec2, radius: f32, strength: f32) -> usize {
        let bounds = self.manager.bounds(self.width, self.height);
        let touched = impulse::explode_from_point(
            point,
            radius,
            strength,
            &mut self.nodes,
            &bounds,
            self.intensity,
            &mut self.rng,
        );
        if touched > 0 {
            self.solver.nudge(IMPULSE_ALPHA);
        }
        touched
    }

    /// Resize the canvas, re-clamping every node into the new bounds
    pub fn resize(&mut self, width: f32, height: f32) -> Result<(), EngineError> {
        EngineError::check_canvas(width, height)?;
        self.solver.resize(width, height)?;
        if self.canvas_rect == CanvasRect::new(0.0, 0.0, self.width, self.height) {
            self.canvas_rect = CanvasRect::new(0.0, 0.0, width, height);
        }
        self.width = width;
        self.height = height;
        self.render.resize(width, height);

        let bounds = self.manager.bounds(width, height);
        for node in &mut self.nodes {
            node.pos = bounds.clamp_disc(node.pos, node.current_radius);
        }
        log::info!("Canvas resized to {}x{}", width, height);
        Ok(())
    }

    pub fn set_intensity(&mut self, intensity: Intensity) {
        self.intensity = intensity;
        self.settings.intensity = intensity;
        self.solver.set_intensity(intensity);
    }

    /// Full teardown: no timer, no pending frame, no effects, no saved positions
    pub fn stop(&mut self) {
        self.running = false;
        self.solver.stop();
        self.render.cancel_frame();
        self.effects.clear();
        self.manager.clear_saved_positions();
        self.pending_removals.clear();
        log::info!("Engine stopped");
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            nodes: self.nodes.len(),
            live_nodes: self.nodes.iter().filter(|n| !n.is_popped()).count(),
            pending_removals: self.pending_removals.len(),
            explosions: self.effects.explosions.len(),
            debris: self.effects.debris.len(),
            texts: self.effects.texts.len(),
            quality_tier: self.render.quality_tier(),
            energy: self.solver.current_energy(),
            fps: self.render.fps(),
            frames_drawn: self.render.frames_drawn(),
            frames_skipped: self.render.frames_skipped(),
        }
    }
}
