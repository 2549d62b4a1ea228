//! Per-bubble click rules
//!
//! Each kind has its own path from first click to detonation:
//! - Regular: click opens details; removal waits for the detail "continue"
//! - Tough: clicks count up to a rolled threshold, then behaves like Regular
//! - Hidden: clicks count up, then rewards and removes with no dialog
//! - Question: click opens a dialog; the answer decides reward or penalty
//!
//! The rules mutate the clicked node (counters, flags, pulse, recoil) and hand
//! everything that reaches outside the node back to the engine as [`Command`]s.

use glam::Vec2;
use rand::Rng;

use super::effects::TextKind;
use super::node::{BubbleId, BubbleKind, BubbleNode, ClickProgress};
use crate::clamp_length;
use crate::settings::Intensity;

/// XP for finishing each kind
pub const REGULAR_REWARD: i32 = 10;
pub const TOUGH_REWARD: i32 = 25;
pub const HIDDEN_REWARD: i32 = 15;
/// XP for each counted click on a tough bubble
pub const TOUGH_CLICK_REWARD: i32 = 2;
/// Question outcomes
pub const AGREE_REWARD: i32 = 20;
pub const DISAGREE_PENALTY: i32 = -5;

/// Radius multiplier a counted click snaps to before easing back
pub const PULSE_SCALE: f32 = 1.2;
/// Recoil speed at full progress, before the velocity ceiling
pub const RECOIL_STRENGTH: f32 = 5.0;

pub const GAIN_COLOR: [f32; 4] = [0.4, 1.0, 0.5, 1.0];
pub const LOSS_COLOR: [f32; 4] = [1.0, 0.35, 0.35, 1.0];

/// Side effect the engine must carry out
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Reward { amount: i32, source: BubbleKind },
    OpenDetail { id: BubbleId },
    OpenQuestion { id: BubbleId },
    FloatingText {
        pos: Vec2,
        text: String,
        kind: TextKind,
        color: [f32; 4],
    },
    /// Play removal effects and mark the node popped
    Detonate { id: BubbleId },
    /// Drop the node from the live set at the next frame
    QueueRemoval { id: BubbleId },
}

/// What a click did to a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Visited, popped, or nothing under the pointer
    Ignored,
    /// Counted toward a threshold that is not reached yet
    Progress(ClickProgress),
    /// Detail dialog requested
    DetailRequested,
    /// Question dialog requested
    QuestionRequested,
    /// Hidden bubble found and queued for removal
    Revealed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClickResponse {
    pub outcome: ClickOutcome,
    pub commands: Vec<Command>,
}

impl ClickResponse {
    fn ignored() -> Self {
        Self {
            outcome: ClickOutcome::Ignored,
            commands: Vec::new(),
        }
    }
}

fn gain_text(pos: Vec2, amount: i32) -> Command {
    Command::FloatingText {
        pos,
        text: format!("+{}", amount),
        kind: TextKind::Gain,
        color: GAIN_COLOR,
    }
}

fn loss_text(pos: Vec2, amount: i32) -> Command {
    Command::FloatingText {
        pos,
        text: format!("{}", amount),
        kind: TextKind::Loss,
        color: LOSS_COLOR,
    }
}

/// Apply a click at `point` to `node`
pub fn handle_click(
    node: &mut BubbleNode,
    point: Vec2,
    intensity: Intensity,
    rng: &mut impl Rng,
) -> ClickResponse {
    if node.is_visited || node.is_popped() {
        return ClickResponse::ignored();
    }
    let id = node.id();

    match node.kind {
        BubbleKind::Regular => {
            node.is_visited = true;
            ClickResponse {
                outcome: ClickOutcome::DetailRequested,
                commands: vec![Command::OpenDetail { id }],
            }
        }
        BubbleKind::Question => {
            node.is_visited = true;
            ClickResponse {
                outcome: ClickOutcome::QuestionRequested,
                commands: vec![Command::OpenQuestion { id }],
            }
        }
        BubbleKind::Tough | BubbleKind::Hidden => {
            let progress = count_click(node, intensity, rng);
            if !progress.is_ready {
                return ClickResponse {
                    outcome: ClickOutcome::Progress(progress),
                    commands: below_threshold(node, point, progress, intensity),
                };
            }
            node.is_visited = true;
            if node.kind == BubbleKind::Tough {
                ClickResponse {
                    outcome: ClickOutcome::DetailRequested,
                    commands: vec![Command::OpenDetail { id }],
                }
            } else {
                ClickResponse {
                    outcome: ClickOutcome::Revealed,
                    commands: vec![
                        Command::Reward {
                            amount: HIDDEN_REWARD,
                            source: BubbleKind::Hidden,
                        },
                        gain_text(node.pos, HIDDEN_REWARD),
                        Command::Detonate { id },
                        Command::QueueRemoval { id },
                    ],
                }
            }
        }
    }
}

/// Count a click, rolling the threshold from the kind's level-scaled range
fn count_click(node: &mut BubbleNode, intensity: Intensity, rng: &mut impl Rng) -> ClickProgress {
    let range = node.kind.click_range(intensity);
    node.increment_clicks(|| match range {
        Some(range) => rng.random_range(range),
        None => 1,
    })
}

/// Squash-and-stretch plus a recoil away from the click; tough bubbles also pay out
fn below_threshold(
    node: &mut BubbleNode,
    point: Vec2,
    progress: ClickProgress,
    intensity: Intensity,
) -> Vec<Command> {
    node.set_current_radius(node.base_radius * PULSE_SCALE);

    let ratio = progress.current as f32 / progress.required as f32;
    let dir = (node.pos - point).normalize_or_zero();
    let dir = if dir == Vec2::ZERO { Vec2::Y } else { dir };
    node.vel = clamp_length(
        node.vel + dir * RECOIL_STRENGTH * ratio,
        node.max_velocity(intensity),
    );

    match node.kind {
        BubbleKind::Tough => vec![
            Command::Reward {
                amount: TOUGH_CLICK_REWARD,
                source: BubbleKind::Tough,
            },
            gain_text(node.pos, TOUGH_CLICK_REWARD),
        ],
        _ => Vec::new(),
    }
}

/// The detail dialog was dismissed: pay out and detonate.
///
/// Only a node whose detail dialog was requested by a click takes the signal.
pub fn continue_after_detail(node: &BubbleNode) -> Vec<Command> {
    if !node.is_visited
        || node.is_popped()
        || !matches!(node.kind, BubbleKind::Regular | BubbleKind::Tough)
    {
        return Vec::new();
    }
    let id = node.id();
    let amount = match node.kind {
        BubbleKind::Tough => TOUGH_REWARD,
        _ => REGULAR_REWARD,
    };
    vec![
        Command::Reward {
            amount,
            source: node.kind,
        },
        gain_text(node.pos, amount),
        Command::Detonate { id },
        Command::QueueRemoval { id },
    ]
}

/// A question was answered: reward or penalize, then detonate.
///
/// Ignored unless a click opened the question first.
pub fn resolve_answer(node: &BubbleNode, agreed: bool) -> Vec<Command> {
    if !node.is_visited || node.is_popped() || node.kind != BubbleKind::Question {
        return Vec::new();
    }
    let id = node.id();
    let (amount, text) = if agreed {
        (AGREE_REWARD, gain_text(node.pos, AGREE_REWARD))
    } else {
        (DISAGREE_PENALTY, loss_text(node.pos, DISAGREE_PENALTY))
    };
    vec![
        Command::Reward {
            amount,
            source: BubbleKind::Question,
        },
        text,
        Command::Detonate { id },
        Command::QueueRemoval { id },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::node::SourceBubble;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn node(kind: BubbleKind) -> BubbleNode {
        let source = SourceBubble::new(7, "Borrowck").with_kind(kind);
        BubbleNode::new(&source, Vec2::new(200.0, 200.0), 40.0, 0.0)
    }

    fn click(n: &mut BubbleNode) -> ClickResponse {
        let mut rng = Pcg32::seed_from_u64(11);
        handle_click(n, Vec2::new(190.0, 200.0), Intensity::default(), &mut rng)
    }

    #[test]
    fn test_regular_click_opens_detail_once() {
        let mut n = node(BubbleKind::Regular);
        let r = click(&mut n);
        assert_eq!(r.outcome, ClickOutcome::DetailRequested);
        assert_eq!(r.commands, vec![Command::OpenDetail { id: 7 }]);
        assert!(n.is_visited);
        // Visited bubbles are inert
        assert_eq!(click(&mut n).outcome, ClickOutcome::Ignored);
    }

    #[test]
    fn test_tough_threshold() {
        let mut n = node(BubbleKind::Tough);
        n.clicks_required = Some(3);

        let first = click(&mut n);
        assert!(matches!(first.outcome, ClickOutcome::Progress(p) if !p.is_ready));
        assert!(first.commands.contains(&Command::Reward {
            amount: TOUGH_CLICK_REWARD,
            source: BubbleKind::Tough
        }));
        assert!(!first.commands.iter().any(|c| matches!(c, Command::OpenDetail { .. })));
        // Recoil away from the click (click was to the left)
        assert!(n.vel.x > 0.0);
        assert!(n.current_radius > n.base_radius);

        let second = click(&mut n);
        assert!(matches!(second.outcome, ClickOutcome::Progress(p) if !p.is_ready));

        let third = click(&mut n);
        assert_eq!(third.outcome, ClickOutcome::DetailRequested);
        assert_eq!(third.commands, vec![Command::OpenDetail { id: 7 }]);
        assert!(n.is_visited);
    }

    #[test]
    fn test_threshold_rolled_from_range() {
        let mut n = node(BubbleKind::Tough);
        click(&mut n);
        let required = n.clicks_required.unwrap();
        assert!(BubbleKind::Tough.click_range(Intensity::default()).unwrap().contains(&required));
    }

    #[test]
    fn test_hidden_reveal_has_no_modal() {
        let mut n = node(BubbleKind::Hidden);
        n.clicks_required = Some(2);
        let first = click(&mut n);
        assert!(first.commands.is_empty());
        let second = click(&mut n);
        assert_eq!(second.outcome, ClickOutcome::Revealed);
        assert!(second.commands.contains(&Command::QueueRemoval { id: 7 }));
        assert!(second.commands.contains(&Command::Detonate { id: 7 }));
        assert!(second.commands.iter().any(|c| matches!(c, Command::FloatingText { .. })));
        assert!(!second.commands.iter().any(|c| matches!(
            c,
            Command::OpenDetail { .. } | Command::OpenQuestion { .. }
        )));
    }

    #[test]
    fn test_question_opens_dialog_without_removal() {
        let mut n = node(BubbleKind::Question);
        let r = click(&mut n);
        assert_eq!(r.outcome, ClickOutcome::QuestionRequested);
        assert_eq!(r.commands, vec![Command::OpenQuestion { id: 7 }]);
    }

    #[test]
    fn test_resolve_answer() {
        let mut n = node(BubbleKind::Question);
        click(&mut n);
        let agreed = resolve_answer(&n, true);
        assert!(agreed.contains(&Command::Reward {
            amount: AGREE_REWARD,
            source: BubbleKind::Question
        }));
        let disagreed = resolve_answer(&n, false);
        assert!(disagreed.iter().any(|c| matches!(
            c,
            Command::FloatingText { kind: TextKind::Loss, .. }
        )));
        assert!(disagreed.contains(&Command::QueueRemoval { id: 7 }));

        // Only questions take answers
        let mut regular = node(BubbleKind::Regular);
        click(&mut regular);
        assert!(resolve_answer(&regular, true).is_empty());
    }

    #[test]
    fn test_answer_needs_open_question() {
        let n = node(BubbleKind::Question);
        assert!(resolve_answer(&n, true).is_empty());
        assert!(resolve_answer(&n, false).is_empty());
    }

    #[test]
    fn test_continue_needs_open_detail() {
        // Never clicked
        let regular = node(BubbleKind::Regular);
        assert!(continue_after_detail(&regular).is_empty());

        // Partway through its clicks
        let mut tough = node(BubbleKind::Tough);
        tough.clicks_required = Some(3);
        click(&mut tough);
        assert!(continue_after_detail(&tough).is_empty());
        click(&mut tough);
        assert!(continue_after_detail(&tough).is_empty());

        // Threshold reached, detail open
        assert_eq!(click(&mut tough).outcome, ClickOutcome::DetailRequested);
        let commands = continue_after_detail(&tough);
        assert!(commands.contains(&Command::Reward {
            amount: TOUGH_REWARD,
            source: BubbleKind::Tough
        }));
        assert!(commands.contains(&Command::QueueRemoval { id: 7 }));
    }

    #[test]
    fn test_popped_nodes_are_inert() {
        let mut n = node(BubbleKind::Regular);
        n.mark_popped();
        assert_eq!(click(&mut n).outcome, ClickOutcome::Ignored);
        assert!(continue_after_detail(&n).is_empty());
    }

    #[test]
    fn test_independent_counters() {
        let mut a = node(BubbleKind::Tough);
        let mut b = node(BubbleKind::Tough);
        a.clicks_required = Some(3);
        b.clicks_required = Some(3);
        click(&mut a);
        click(&mut a);
        assert_eq!(a.clicks_so_far, 2);
        assert_eq!(b.clicks_so_far, 0);
    }
}
