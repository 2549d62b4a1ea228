//! Bubble simulation
//!
//! Node state, the force solver, impulses, click rules and effects. Nothing in
//! here draws or talks to collaborators directly:
//! - Randomness comes from a caller-supplied `Rng`
//! - Time comes in as milliseconds from the caller
//! - Side effects leave as [`Command`]s for the engine to run

pub mod effects;
pub mod hooks;
pub mod impulse;
pub mod interaction;
pub mod manager;
pub mod node;
pub mod solver;

pub use effects::{
    Debris, EffectsEngine, Explosion, FloatingText, FloatingTextRequest, HoverGlow, ScreenShake,
    TextKind,
};
pub use hooks::{
    AchievementSink, HookCall, HookError, Hooks, ModalSink, NullSink, Recorder, RewardOutcome,
    RewardSink,
};
pub use impulse::{Bounds, explode_from_point, push_neighbors};
pub use interaction::{
    ClickOutcome, ClickResponse, Command, continue_after_detail, handle_click, resolve_answer,
};
pub use manager::{BubbleManager, RadiusBand, SavedPosition};
pub use node::{BubbleId, BubbleKind, BubbleNode, ClickProgress, SourceBubble, TextLayout, Tier};
pub use solver::{ForceSolver, SolverParams};
