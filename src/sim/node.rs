//! Bubble node model
//!
//! A node is a bubble's live simulation state. Nodes are rebuilt in bulk from
//! [`SourceBubble`] records whenever the host swaps its data set.

use std::ops::RangeInclusive;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{BASE_MAX_VELOCITY, MAX_HOVER_MULTIPLIER, REWRAP_THRESHOLD};
use crate::settings::Intensity;

/// Stable bubble identifier
pub type BubbleId = u32;

/// Closed classification of a bubble's interaction rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BubbleKind {
    /// Single click opens details
    #[default]
    Regular,
    /// Needs several clicks before it opens
    Tough,
    /// Nearly invisible, several clicks, no dialog
    Hidden,
    /// Opens a branching question dialog
    Question,
}

impl BubbleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BubbleKind::Regular => "regular",
            BubbleKind::Tough => "tough",
            BubbleKind::Hidden => "hidden",
            BubbleKind::Question => "question",
        }
    }

    /// Radius multiplier applied after tier interpolation
    pub fn size_multiplier(&self) -> f32 {
        match self {
            BubbleKind::Regular => 1.0,
            BubbleKind::Tough => 1.15,
            BubbleKind::Hidden => 0.8,
            BubbleKind::Question => 1.1,
        }
    }

    /// Velocity ceiling multiplier (heavy bubbles move less)
    pub fn velocity_scale(&self) -> f32 {
        match self {
            BubbleKind::Regular => 1.0,
            BubbleKind::Tough => 0.7,
            BubbleKind::Hidden => 1.2,
            BubbleKind::Question => 0.9,
        }
    }

    /// Range the click threshold is rolled from, for click-gated kinds
    pub fn click_range(&self, intensity: Intensity) -> Option<RangeInclusive<u32>> {
        let level = intensity.level() as u32;
        match self {
            BubbleKind::Tough => Some((2 + level / 2)..=(3 + level)),
            BubbleKind::Hidden => Some(2..=(2 + level / 2)),
            BubbleKind::Regular | BubbleKind::Question => None,
        }
    }

    /// Whether clicks are counted before the bubble commits
    pub fn is_click_gated(&self) -> bool {
        matches!(self, BubbleKind::Tough | BubbleKind::Hidden)
    }
}

/// Weight/skill tier, drives size and color only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Tier {
    Novice,
    #[default]
    Intermediate,
    Advanced,
    Expert,
    Master,
}

impl Tier {
    /// Parse a tier name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "novice" | "beginner" => Some(Tier::Novice),
            "intermediate" => Some(Tier::Intermediate),
            "advanced" => Some(Tier::Advanced),
            "expert" => Some(Tier::Expert),
            "master" => Some(Tier::Master),
            _ => None,
        }
    }

    /// Resolve a tier name, falling back to the default tier
    pub fn resolve(name: &str) -> Self {
        Self::from_name(name).unwrap_or_else(|| {
            if !name.is_empty() {
                log::debug!("Unknown tier '{}', using default", name);
            }
            Tier::default()
        })
    }

    /// Position within the radius band (0 = smallest, 1 = largest)
    pub fn weight(&self) -> f32 {
        match self {
            Tier::Novice => 0.0,
            Tier::Intermediate => 0.25,
            Tier::Advanced => 0.5,
            Tier::Expert => 0.75,
            Tier::Master => 1.0,
        }
    }

    /// Fill color (RGBA)
    pub fn color(&self) -> [f32; 4] {
        match self {
            Tier::Novice => [0.45, 0.8, 0.55, 0.85],
            Tier::Intermediate => [0.35, 0.65, 0.95, 0.85],
            Tier::Advanced => [0.6, 0.45, 0.95, 0.85],
            Tier::Expert => [0.95, 0.55, 0.3, 0.85],
            Tier::Master => [0.95, 0.8, 0.25, 0.9],
        }
    }
}

/// A bubble record as delivered by the data layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceBubble {
    pub id: BubbleId,
    pub name: String,
    /// Tier name; unknown names fall back to the default tier
    #[serde(default)]
    pub tier: String,
    #[serde(default)]
    pub is_question: bool,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub is_tough: bool,
    /// Detail text or question prompt
    #[serde(default)]
    pub description: Option<String>,
}

impl SourceBubble {
    pub fn new(id: BubbleId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder: set kind flags from a kind
    pub fn with_kind(mut self, kind: BubbleKind) -> Self {
        self.is_question = kind == BubbleKind::Question;
        self.is_hidden = kind == BubbleKind::Hidden;
        self.is_tough = kind == BubbleKind::Tough;
        self
    }

    /// Builder: set tier name
    pub fn with_tier(mut self, tier: impl Into<String>) -> Self {
        self.tier = tier.into();
        self
    }

    /// Kind flags collapse to exactly one kind (question > hidden > tough)
    pub fn kind(&self) -> BubbleKind {
        if self.is_question {
            BubbleKind::Question
        } else if self.is_hidden {
            BubbleKind::Hidden
        } else if self.is_tough {
            BubbleKind::Tough
        } else {
            BubbleKind::Regular
        }
    }
}

/// Wrapped label, laid out for a given radius
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextLayout {
    pub lines: Vec<String>,
    /// Label scale relative to the base radius layout
    pub scale: f32,
    /// Radius the layout was computed for
    pub radius: f32,
}

/// Progress through a click-gated bubble's threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickProgress {
    pub current: u32,
    pub required: u32,
    pub is_ready: bool,
}

/// A bubble's live simulation state
#[derive(Debug, Clone, PartialEq)]
pub struct BubbleNode {
    id: BubbleId,
    pub name: String,
    pub description: Option<String>,
    pub kind: BubbleKind,
    pub tier: Tier,
    pub color: [f32; 4],

    pub pos: Vec2,
    pub vel: Vec2,
    pub base_radius: f32,
    pub current_radius: f32,
    pub target_radius: f32,
    pub oscillation_phase: f32,

    pub clicks_so_far: u32,
    /// Rolled on first click, fixed afterward
    pub clicks_required: Option<u32>,

    pub is_hovered: bool,
    /// A terminal interaction has been committed
    pub is_visited: bool,
    /// Detonation effects have fired; never reset
    is_popped: bool,

    pub text: TextLayout,
}

impl BubbleNode {
    pub fn new(source: &SourceBubble, pos: Vec2, base_radius: f32, oscillation_phase: f32) -> Self {
        let tier = Tier::resolve(&source.tier);
        let mut node = Self {
            id: source.id,
            name: source.name.clone(),
            description: source.description.clone(),
            kind: source.kind(),
            tier,
            color: tier.color(),
            pos,
            vel: Vec2::ZERO,
            base_radius,
            current_radius: base_radius,
            target_radius: base_radius,
            oscillation_phase,
            clicks_so_far: 0,
            clicks_required: None,
            is_hovered: false,
            is_visited: false,
            is_popped: false,
            text: TextLayout::default(),
        };
        node.relayout_text();
        node
    }

    pub fn id(&self) -> BubbleId {
        self.id
    }

    pub fn is_popped(&self) -> bool {
        self.is_popped
    }

    /// Mark detonated. Returns false if it already was.
    pub fn mark_popped(&mut self) -> bool {
        if self.is_popped {
            return false;
        }
        self.is_popped = true;
        true
    }

    /// Hard ceiling for `current_radius`
    pub fn max_radius(&self) -> f32 {
        self.base_radius * MAX_HOVER_MULTIPLIER
    }

    /// Set the animated radius, clamped to `[0, max_radius]`
    pub fn set_current_radius(&mut self, radius: f32) {
        self.current_radius = radius.clamp(0.0, self.max_radius());
    }

    /// Set the eased-toward radius, clamped to `[0, max_radius]`
    pub fn set_target_radius(&mut self, radius: f32) {
        self.target_radius = radius.clamp(0.0, self.max_radius());
    }

    /// Velocity ceiling for this node's kind at the given level
    pub fn max_velocity(&self, intensity: Intensity) -> f32 {
        BASE_MAX_VELOCITY * self.kind.velocity_scale() * intensity.factor()
    }

    /// Whether a point lies inside the bubble's current disc
    pub fn contains(&self, point: Vec2) -> bool {
        self.pos.distance(point) <= self.current_radius
    }

    /// Count a click, rolling the threshold on first use
    pub fn increment_clicks(&mut self, roll: impl FnOnce() -> u32) -> ClickProgress {
        let required = *self.clicks_required.get_or_insert_with(|| roll().max(1));
        self.clicks_so_far = (self.clicks_so_far + 1).min(required);
        ClickProgress {
            current: self.clicks_so_far,
            required,
            is_ready: self.clicks_so_far >= required,
        }
    }

    /// Whether the label should be re-wrapped for the current radius
    pub fn needs_relayout(&self) -> bool {
        (self.current_radius - self.text.radius).abs() > REWRAP_THRESHOLD
    }

    /// Re-wrap the label for the current radius
    pub fn relayout_text(&mut self) {
        let font_size = label_font_size(self.current_radius);
        let max_chars =
            ((self.current_radius * 1.6) / (font_size * 0.55)).floor().max(3.0) as usize;
        self.text = TextLayout {
            lines: wrap_text(&self.name, max_chars, 3),
            scale: if self.base_radius > 0.0 {
                self.current_radius / self.base_radius
            } else {
                1.0
            },
            radius: self.current_radius,
        };
    }
}

/// Label font size for a bubble radius
pub fn label_font_size(radius: f32) -> f32 {
    (radius * 0.32).clamp(9.0, 18.0)
}

/// Greedy word wrap into at most `max_lines`, eliding overflow
pub fn wrap_text(text: &str, max_chars: usize, max_lines: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let current_len = current.chars().count();
        if current.is_empty() {
            current.push_str(word);
        } else if current_len + 1 + word_len <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    // Hard-break single words longer than a line
    let lines: Vec<String> = lines
        .into_iter()
        .flat_map(|line| {
            let chars: Vec<char> = line.chars().collect();
            chars
                .chunks(max_chars)
                .map(|c| c.iter().collect::<String>())
                .collect::<Vec<_>>()
        })
        .collect();

    if lines.len() > max_lines {
        let mut kept: Vec<String> = lines.into_iter().take(max_lines).collect();
        if let Some(last) = kept.last_mut() {
            let mut chars: Vec<char> = last.chars().collect();
            chars.truncate(max_chars.saturating_sub(1));
            *last = chars.into_iter().collect::<String>() + "…";
        }
        kept
    } else {
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(kind: BubbleKind) -> BubbleNode {
        let source = SourceBubble::new(1, "Rust Ownership").with_kind(kind);
        BubbleNode::new(&source, Vec2::new(100.0, 100.0), 40.0, 0.0)
    }

    #[test]
    fn test_kind_from_flags() {
        let mut source = SourceBubble::new(1, "x");
        assert_eq!(source.kind(), BubbleKind::Regular);
        source.is_tough = true;
        assert_eq!(source.kind(), BubbleKind::Tough);
        source.is_hidden = true;
        assert_eq!(source.kind(), BubbleKind::Hidden);
        source.is_question = true;
        assert_eq!(source.kind(), BubbleKind::Question);
    }

    #[test]
    fn test_unknown_tier_falls_back() {
        assert_eq!(Tier::resolve("grandmaster"), Tier::default());
        assert_eq!(Tier::resolve("Expert"), Tier::Expert);
        assert_eq!(Tier::resolve(""), Tier::default());
    }

    #[test]
    fn test_increment_clicks_rolls_once() {
        let mut n = node(BubbleKind::Tough);
        let mut rolls = 0;
        let p = n.increment_clicks(|| {
            rolls += 1;
            3
        });
        assert_eq!(p, ClickProgress { current: 1, required: 3, is_ready: false });
        let p = n.increment_clicks(|| {
            rolls += 1;
            99
        });
        assert_eq!(p.required, 3);
        assert!(!p.is_ready);
        let p = n.increment_clicks(|| 99);
        assert!(p.is_ready);
        assert_eq!(rolls, 1);

        // Extra clicks never exceed the threshold
        let p = n.increment_clicks(|| 99);
        assert_eq!(p.current, 3);
    }

    #[test]
    fn test_popped_is_monotonic() {
        let mut n = node(BubbleKind::Regular);
        assert!(n.mark_popped());
        assert!(!n.mark_popped());
        assert!(n.is_popped());
    }

    #[test]
    fn test_radius_clamped() {
        let mut n = node(BubbleKind::Regular);
        n.set_current_radius(1000.0);
        assert!((n.current_radius - 40.0 * MAX_HOVER_MULTIPLIER).abs() < 1e-4);
        n.set_current_radius(-5.0);
        assert_eq!(n.current_radius, 0.0);
    }

    #[test]
    fn test_relayout_threshold() {
        let mut n = node(BubbleKind::Regular);
        assert!(!n.needs_relayout());
        n.current_radius += 0.5;
        assert!(!n.needs_relayout());
        n.current_radius += 1.0;
        assert!(n.needs_relayout());
        n.relayout_text();
        assert!(!n.needs_relayout());
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("hello big world", 9, 3), vec!["hello big", "world"]);
        assert_eq!(wrap_text("abcdefgh", 3, 3), vec!["abc", "def", "gh"]);
        let elided = wrap_text("one two three four", 5, 2);
        assert_eq!(elided.len(), 2);
        assert!(elided[1].ends_with('…'));
    }

    #[test]
    fn test_click_ranges() {
        let calm = Intensity::new(1);
        let frantic = Intensity::new(5);
        assert_eq!(BubbleKind::Tough.click_range(calm), Some(2..=4));
        assert_eq!(BubbleKind::Tough.click_range(frantic), Some(4..=8));
        assert_eq!(BubbleKind::Hidden.click_range(calm), Some(2..=2));
        assert_eq!(BubbleKind::Regular.click_range(calm), None);
    }
}
