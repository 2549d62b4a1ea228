//! Collaborator interfaces
//!
//! Score bookkeeping, dialogs and achievements live outside the engine. The
//! engine only calls through these traits and never waits on their UI.

use std::cell::RefCell;
use std::rc::Rc;

use super::node::{BubbleId, BubbleKind};

/// A collaborator call failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookError(pub String);

impl std::fmt::Display for HookError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "collaborator failed: {}", self.0)
    }
}

impl std::error::Error for HookError {}

/// What the reward sink reports back
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewardOutcome {
    /// New tier if this reward crossed a tier boundary
    pub tier_up: Option<u32>,
}

/// Receives XP gains and penalties
pub trait RewardSink {
    fn reward(&mut self, amount: i32, source: BubbleKind) -> Result<RewardOutcome, HookError>;
}

/// Receives dialog presentation requests
pub trait ModalSink {
    fn open_detail(
        &mut self,
        id: BubbleId,
        name: &str,
        description: Option<&str>,
    ) -> Result<(), HookError>;
    fn open_question(&mut self, id: BubbleId, prompt: &str) -> Result<(), HookError>;
    fn open_level_up(&mut self, tier: u32) -> Result<(), HookError>;
}

/// Unlocks achievements by key
pub trait AchievementSink {
    /// Returns true when the achievement was newly unlocked
    fn unlock(&mut self, key: &str) -> Result<bool, HookError>;
}

/// Sink that accepts everything and does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl RewardSink for NullSink {
    fn reward(&mut self, _amount: i32, _source: BubbleKind) -> Result<RewardOutcome, HookError> {
        Ok(RewardOutcome::default())
    }
}

impl ModalSink for NullSink {
    fn open_detail(&mut self, _: BubbleId, _: &str, _: Option<&str>) -> Result<(), HookError> {
        Ok(())
    }
    fn open_question(&mut self, _: BubbleId, _: &str) -> Result<(), HookError> {
        Ok(())
    }
    fn open_level_up(&mut self, _: u32) -> Result<(), HookError> {
        Ok(())
    }
}

impl AchievementSink for NullSink {
    fn unlock(&mut self, _key: &str) -> Result<bool, HookError> {
        Ok(false)
    }
}

/// The engine's set of collaborators
pub struct Hooks {
    pub reward: Box<dyn RewardSink>,
    pub modal: Box<dyn ModalSink>,
    pub achievements: Box<dyn AchievementSink>,
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            reward: Box::new(NullSink),
            modal: Box::new(NullSink),
            achievements: Box::new(NullSink),
        }
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks").finish_non_exhaustive()
    }
}

/// One recorded collaborator call
#[derive(Debug, Clone, PartialEq)]
pub enum HookCall {
    Reward { amount: i32, source: BubbleKind },
    OpenDetail { id: BubbleId },
    OpenQuestion { id: BubbleId },
    OpenLevelUp { tier: u32 },
    Unlock { key: String },
}

/// Shared-log collaborator that records every call.
///
/// Clones share the same log, so one clone can be handed to the engine and
/// another kept for inspection.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    calls: Rc<RefCell<Vec<HookCall>>>,
    state: Rc<RefCell<RecorderState>>,
}

#[derive(Debug, Default)]
struct RecorderState {
    fail: bool,
    xp: i64,
    xp_per_tier: i64,
    tier: u32,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a tier-up every `xp` accumulated points
    pub fn with_tiers(self, xp: i64) -> Self {
        self.state.borrow_mut().xp_per_tier = xp;
        self
    }

    /// Make every call fail from now on
    pub fn fail_all(&self, fail: bool) {
        self.state.borrow_mut().fail = fail;
    }

    /// Wire all three collaborator slots to this recorder
    pub fn hooks(&self) -> Hooks {
        Hooks {
            reward: Box::new(self.clone()),
            modal: Box::new(self.clone()),
            achievements: Box::new(self.clone()),
        }
    }

    pub fn calls(&self) -> Vec<HookCall> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, pred: impl Fn(&HookCall) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: HookCall) -> Result<(), HookError> {
        self.calls.borrow_mut().push(call);
        if self.state.borrow().fail {
            Err(HookError("recorder set to fail".into()))
        } else {
            Ok(())
        }
    }
}

impl RewardSink for Recorder {
    fn reward(&mut self, amount: i32, source: BubbleKind) -> Result<RewardOutcome, HookError> {
        self.record(HookCall::Reward { amount, source })?;
        let mut state = self.state.borrow_mut();
        state.xp += amount as i64;
        if state.xp_per_tier > 0 {
            let tier = (state.xp.max(0) / state.xp_per_tier) as u32;
            if tier > state.tier {
                state.tier = tier;
                return Ok(RewardOutcome {
                    tier_up: Some(tier),
                });
            }
        }
        Ok(RewardOutcome::default())
    }
}

impl ModalSink for Recorder {
    fn open_detail(
        &mut self,
        id: BubbleId,
        _name: &str,
        _description: Option<&str>,
    ) -> Result<(), HookError> {
        self.record(HookCall::OpenDetail { id })
    }

    fn open_question(&mut self, id: BubbleId, _prompt: &str) -> Result<(), HookError> {
        self.record(HookCall::OpenQuestion { id })
    }

    fn open_level_up(&mut self, tier: u32) -> Result<(), HookError> {
        self.record(HookCall::OpenLevelUp { tier })
    }
}

impl AchievementSink for Recorder {
    fn unlock(&mut self, key: &str) -> Result<bool, HookError> {
        self.record(HookCall::Unlock {
            key: key.to_string(),
        })?;
        Ok(true)
    }
}
