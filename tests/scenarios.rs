//! End-to-end scenarios against the public engine API

use bubble_field::sim::{
    BubbleKind, ClickOutcome, HookCall, Recorder, SourceBubble, manager::BubbleManager,
};
use bubble_field::{BubbleEngine, EngineError, Settings};

const WIDTH: f32 = 800.0;
const HEIGHT: f32 = 600.0;
/// Allowed overlap depth as a fraction of the smaller radius
const OVERLAP_TOLERANCE: f32 = 0.25;

fn engine(sources: &[SourceBubble]) -> (BubbleEngine, Recorder) {
    let recorder = Recorder::new();
    let mut engine = BubbleEngine::new(WIDTH, HEIGHT, Settings::default(), 7)
        .unwrap()
        .with_hooks(recorder.hooks());
    engine.set_bubbles(sources);
    (engine, recorder)
}

fn click(engine: &mut BubbleEngine, id: u32) -> ClickOutcome {
    let pos = engine.find_bubble_by_id(id).unwrap().pos;
    engine.pointer_click(pos.x, pos.y)
}

fn is_modal(call: &HookCall) -> bool {
    matches!(
        call,
        HookCall::OpenDetail { .. } | HookCall::OpenQuestion { .. }
    )
}

#[test]
fn test_tough_three_clicks() {
    let (mut engine, recorder) = engine(&[
        SourceBubble::new(1, "Pinning").with_kind(BubbleKind::Tough),
        SourceBubble::new(2, "Unsafe").with_kind(BubbleKind::Tough),
    ]);
    assert!(engine.set_clicks_required(1, 3));
    let mut now = 0.0;

    let mut ready = Vec::new();
    for _ in 0..3 {
        let outcome = click(&mut engine, 1);
        ready.push(match outcome {
            ClickOutcome::Progress(p) => p.is_ready,
            ClickOutcome::DetailRequested => true,
            other => panic!("unexpected outcome {:?}", other),
        });
        if ready.len() < 3 {
            assert_eq!(recorder.count(is_modal), 0);
        }
        now += 16.0;
        engine.frame(now, None);
    }
    assert_eq!(ready, vec![false, false, true]);
    assert_eq!(recorder.count(is_modal), 1);
    assert!(recorder.calls().contains(&HookCall::OpenDetail { id: 1 }));

    // Per-click rewards while below threshold
    assert_eq!(
        recorder.count(|c| matches!(c, HookCall::Reward { amount: 2, .. })),
        2
    );

    // The other tough bubble keeps its own counters
    let other = engine.find_bubble_by_id(2).unwrap();
    assert_eq!(other.clicks_so_far, 0);
    assert_eq!(other.clicks_required, None);

    // Detail dismissed: removal follows on the next frame
    assert!(engine.continue_detail(1));
    engine.frame(now + 16.0, None);
    assert!(engine.find_bubble_by_id(1).is_none());
    assert!(recorder.calls().contains(&HookCall::Reward {
        amount: 25,
        source: BubbleKind::Tough
    }));
}

#[test]
fn test_hidden_reveal_without_modal() {
    let (mut engine, recorder) =
        engine(&[SourceBubble::new(9, "Easter egg").with_kind(BubbleKind::Hidden)]);
    assert!(engine.set_clicks_required(9, 2));

    assert!(matches!(
        click(&mut engine, 9),
        ClickOutcome::Progress(p) if !p.is_ready
    ));
    engine.frame(16.0, None);
    assert_eq!(click(&mut engine, 9), ClickOutcome::Revealed);

    assert!(engine.effects().texts.iter().any(|t| t.text == "+15"));
    assert_eq!(engine.pending_removals(), &[9]);
    assert_eq!(recorder.count(is_modal), 0);
    assert!(recorder.calls().contains(&HookCall::Reward {
        amount: 15,
        source: BubbleKind::Hidden
    }));

    engine.frame(32.0, None);
    assert!(engine.current_bubbles().is_empty());
}

#[test]
fn test_twenty_bubbles_fit_without_overlap() {
    let sources: Vec<SourceBubble> = (0..20)
        .map(|i| SourceBubble::new(i, format!("Bubble {}", i)))
        .collect();
    let (mut engine, _) = engine(&sources);
    engine.frame(0.0, None);

    let nodes = engine.current_bubbles();
    assert_eq!(nodes.len(), 20);
    for node in nodes {
        assert!(node.pos.x - node.current_radius >= -1e-3);
        assert!(node.pos.y - node.current_radius >= -1e-3);
        assert!(node.pos.x + node.current_radius <= WIDTH + 1e-3);
        assert!(node.pos.y + node.current_radius <= HEIGHT + 1e-3);
    }
    for (i, a) in nodes.iter().enumerate() {
        for b in &nodes[i + 1..] {
            let overlap = a.current_radius + b.current_radius - a.pos.distance(b.pos);
            let allowed = OVERLAP_TOLERANCE * a.current_radius.min(b.current_radius);
            assert!(
                overlap <= allowed,
                "{} and {} overlap by {:.1}",
                a.id(),
                b.id(),
                overlap
            );
        }
    }
}

#[test]
fn test_explode_bubble_twice() {
    let (mut engine, _) = engine(&[SourceBubble::new(1, "Once"), SourceBubble::new(2, "Other")]);
    assert!(engine.explode_bubble(1));
    assert!(!engine.explode_bubble(1));
    assert_eq!(engine.effects().explosions.len(), 1);
    engine.frame(16.0, None);
    assert!(!engine.explode_bubble(1));
    assert_eq!(engine.current_bubbles().len(), 1);
}

#[test]
fn test_invalid_canvas_fails_fast() {
    for (w, h) in [(0.0, 600.0), (800.0, 0.0), (-1.0, 10.0), (f32::INFINITY, 10.0)] {
        let result = BubbleEngine::new(w, h, Settings::default(), 1);
        assert!(matches!(result, Err(EngineError::InvalidCanvas { .. })));
    }
}

#[test]
fn test_collaborator_failure_still_removes() {
    let (mut engine, recorder) = engine(&[
        SourceBubble::new(1, "Regular"),
        SourceBubble::new(2, "Question").with_kind(BubbleKind::Question),
    ]);
    recorder.fail_all(true);

    click(&mut engine, 1);
    click(&mut engine, 2);
    engine.frame(16.0, None);
    assert!(engine.current_bubbles().is_empty());
    assert_eq!(engine.effects().explosions.len(), 2);
}

#[test]
fn test_saved_positions_round_trip() {
    let settings = Settings::default();
    let mut manager = BubbleManager::new(&settings);
    let sources: Vec<SourceBubble> = (0..8).map(|i| SourceBubble::new(i, "n")).collect();
    let mut rng = <rand_pcg::Pcg32 as rand::SeedableRng>::seed_from_u64(3);

    let mut nodes = manager.create_nodes(&sources, WIDTH, HEIGHT, &mut rng);
    for (i, node) in nodes.iter_mut().enumerate() {
        node.vel = glam::Vec2::new(i as f32 * 0.1, -0.2);
    }
    manager.save_positions(&nodes);

    let again = manager.create_nodes(&sources[2..], WIDTH, HEIGHT, &mut rng);
    for node in &again {
        let original = nodes.iter().find(|n| n.id() == node.id()).unwrap();
        assert_eq!(node.pos, original.pos);
        assert_eq!(node.vel, original.vel);
    }

    // Absent id leaves the set untouched
    assert_eq!(manager.remove_bubble(99, &again), again);
}
