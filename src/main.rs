//! Bubble Field entry point
//!
//! Runs the engine headlessly: loads bubble records (from a JSON file or a
//! built-in set), simulates frames onto a mesh surface, clicks through every
//! bubble the way a player and a dialog layer would, and logs the result.
//!
//! Usage: `bubble-field [bubbles.json] [settings.json]`

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use bubble_field::render::MeshSurface;
    use bubble_field::sim::{BubbleKind, ClickOutcome, HookCall, Recorder, SourceBubble};
    use bubble_field::{BubbleEngine, EngineError, Settings};

    const WIDTH: f32 = 1024.0;
    const HEIGHT: f32 = 768.0;
    const SEED: u64 = 0xB0BB1E;
    const FRAME_MS: f64 = bubble_field::consts::FRAME_MS;
    /// Give up on a bubble after this many clicks
    const MAX_CLICKS: usize = 12;

    fn load_bubbles(path: &str) -> Result<Vec<SourceBubble>, EngineError> {
        let json = std::fs::read_to_string(path).map_err(|error| EngineError::Io {
            path: path.into(),
            error,
        })?;
        let bubbles: Vec<SourceBubble> = serde_json::from_str(&json)?;
        log::info!("Loaded {} bubbles from {}", bubbles.len(), path);
        Ok(bubbles)
    }

    fn builtin_bubbles() -> Vec<SourceBubble> {
        vec![
            SourceBubble::new(1, "Ownership").with_tier("novice"),
            SourceBubble::new(2, "Borrowing").with_tier("beginner"),
            SourceBubble::new(3, "Lifetimes")
                .with_tier("advanced")
                .with_kind(BubbleKind::Tough),
            SourceBubble::new(4, "Traits").with_tier("intermediate"),
            SourceBubble::new(5, "Is unsafe ever fine?").with_kind(BubbleKind::Question),
            SourceBubble::new(6, "Secret").with_kind(BubbleKind::Hidden),
            SourceBubble::new(7, "Async Rust")
                .with_tier("expert")
                .with_kind(BubbleKind::Tough),
            SourceBubble::new(8, "Macros").with_tier("master"),
        ]
    }

    fn run_frames(
        engine: &mut BubbleEngine,
        surface: &mut MeshSurface,
        now: &mut f64,
        count: usize,
    ) {
        for _ in 0..count {
            *now += FRAME_MS;
            engine.frame(*now, Some(&mut *surface));
        }
    }

    pub fn run() -> Result<(), EngineError> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let bubbles = match args.first() {
            Some(path) => load_bubbles(path)?,
            None => builtin_bubbles(),
        };
        let settings = match args.get(1) {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };

        let recorder = Recorder::new().with_tiers(50);
        let mut surface = MeshSurface::new(settings.quality.circle_segments());
        let mut engine =
            BubbleEngine::new(WIDTH, HEIGHT, settings, SEED)?.with_hooks(recorder.hooks());
        engine.set_bubbles(&bubbles);

        let mut now = 0.0;
        run_frames(&mut engine, &mut surface, &mut now, 120);
        log::info!(
            "Settled: {} triangles, {} labels, energy {:.3}",
            surface.triangle_count(),
            surface.texts.len(),
            engine.solver().current_energy()
        );

        let ids: Vec<u32> = engine.current_bubbles().iter().map(|n| n.id()).collect();
        for id in ids {
            for _ in 0..MAX_CLICKS {
                let Some(pos) = engine.find_bubble_by_id(id).map(|n| n.pos) else {
                    break;
                };
                engine.pointer_move(pos.x, pos.y);
                let outcome = engine.pointer_click(pos.x, pos.y);
                log::info!("Clicked {}: {:?}", id, outcome);
                match outcome {
                    ClickOutcome::Progress(_) => {}
                    ClickOutcome::DetailRequested => {
                        engine.continue_detail(id);
                        break;
                    }
                    ClickOutcome::QuestionRequested => {
                        engine.answer_question(id, id % 2 == 1);
                        break;
                    }
                    ClickOutcome::Revealed | ClickOutcome::Ignored => break,
                }
                run_frames(&mut engine, &mut surface, &mut now, 4);
            }
            run_frames(&mut engine, &mut surface, &mut now, 10);
        }
        engine.pointer_leave();
        run_frames(&mut engine, &mut surface, &mut now, 90);

        let xp: i32 = recorder
            .calls()
            .iter()
            .filter_map(|c| match c {
                HookCall::Reward { amount, .. } => Some(*amount),
                _ => None,
            })
            .sum();
        log::info!(
            "Collaborator calls: {} ({} xp total)",
            recorder.calls().len(),
            xp
        );
        log::info!("Stats: {}", serde_json::to_string(&engine.stats())?);

        engine.stop();
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Bubble Field (headless) starting...");

    if let Err(err) = demo::run() {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Web hosts drive the library directly
}
