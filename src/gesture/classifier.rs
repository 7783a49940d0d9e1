//! Per-frame gesture classification
//!
//! Turns zero, one or two hands into a single [`Action`] with a confidence.
//! Classification is pure: identical input always yields identical output.

use serde::{Deserialize, Serialize};

use super::landmarks::{distance, is_above, Finger, Hand, INDEX_PIP, INDEX_TIP, WRIST};

/// Discrete action a frame can map to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    #[default]
    None,
    Firebreath,
    Shield,
    Punch,
    Block,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Firebreath => "firebreath",
            Self::Shield => "shield",
            Self::Punch => "punch",
            Self::Block => "block",
        }
    }
}

/// Classification output for one frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GestureResult {
    pub action: Action,
    pub confidence: f32,
}

impl GestureResult {
    pub fn none(confidence: f32) -> Self {
        Self {
            action: Action::None,
            confidence,
        }
    }
}

/// Thresholds for gesture classification.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Best score below this yields `Action::None`.
    pub confidence_threshold: f32,
    /// Top two scores closer than this yield `Action::None`.
    pub ambiguity_band: f32,
    /// Each hand's palm score must exceed this for two-hand shield.
    pub two_hand_palm_min: f32,
    /// Each hand's fist score must exceed this for two-hand block.
    pub two_hand_fist_min: f32,
    /// A two-hand gesture at or above this suppresses single-hand gestures.
    pub two_hand_dominance: f32,
    /// Shield must reach this to displace a block.
    pub shield_preference_min: f32,
    /// Shield within this of block's score displaces it.
    pub shield_preference_window: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.55,
            ambiguity_band: 0.08,
            two_hand_palm_min: 0.45,
            two_hand_fist_min: 0.70,
            two_hand_dominance: 0.5,
            shield_preference_min: 0.5,
            shield_preference_window: 0.12,
        }
    }
}

// ── Shape scores ───────────────────────────────────────────

/// Closed hand: 4 closed fingers → 0.90, 3 → 0.72, else 0
pub fn fist_score(hand: &Hand) -> f32 {
    if !hand.is_complete() {
        return 0.0;
    }
    match hand.closed_count() {
        4 => 0.90,
        3 => 0.72,
        _ => 0.0,
    }
}

/// Open hand: 4 extended and spread → 0.88, at least 3 extended → 0.60, else 0
pub fn palm_score(hand: &Hand) -> f32 {
    if !hand.is_complete() {
        return 0.0;
    }
    let extended = hand.extended_count();
    let spread = hand.finger_spread() > 0.1;
    if extended >= 4 && spread {
        0.88
    } else if extended >= 3 {
        0.60
    } else {
        0.0
    }
}

/// Index out, middle/ring/pinky curled. Direction is not checked here.
pub fn finger_gun_score(hand: &Hand) -> f32 {
    if !hand.is_complete() {
        return 0.0;
    }
    let (Some(tip), Some(pip), Some(wrist)) = (
        hand.point(INDEX_TIP),
        hand.point(INDEX_PIP),
        hand.point(WRIST),
    ) else {
        return 0.0;
    };

    // Looser than the palm check: a pointed index is often foreshortened.
    let index_extended =
        tip.y < pip.y + 0.03 || distance(tip, wrist) > distance(pip, wrist) * 1.15;
    let others_closed = [Finger::Middle, Finger::Ring, Finger::Pinky]
        .iter()
        .all(|f| hand.is_closed(*f));

    if index_extended && others_closed {
        0.85
    } else {
        0.0
    }
}

/// Finger gun with the index tip above the wrist → 0.88; any other direction → 0
pub fn finger_gun_up_score(hand: &Hand) -> f32 {
    if finger_gun_score(hand) == 0.0 {
        return 0.0;
    }
    match (hand.point(INDEX_TIP), hand.point(WRIST)) {
        (Some(tip), Some(wrist)) if is_above(tip, wrist, 0.02) => 0.88,
        _ => 0.0,
    }
}

// ── Classifier ─────────────────────────────────────────────

/// Scores for every candidate action in one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Scores {
    firebreath: f32,
    shield: f32,
    punch: f32,
    block: f32,
}

impl Scores {
    /// Non-zero candidates, best first. Equal scores keep declaration order.
    fn ranked(&self) -> Vec<(Action, f32)> {
        let mut entries: Vec<(Action, f32)> = [
            (Action::Firebreath, self.firebreath),
            (Action::Shield, self.shield),
            (Action::Punch, self.punch),
            (Action::Block, self.block),
        ]
        .into_iter()
        .filter(|(_, score)| *score > 0.0)
        .collect();
        entries.sort_by(|a, b| b.1.total_cmp(&a.1));
        entries
    }
}

/// Stateless gesture classifier
#[derive(Debug, Clone, Default)]
pub struct GestureClassifier {
    pub config: ClassifierConfig,
}

impl GestureClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Classify one frame. Hands past the second are ignored.
    pub fn classify(&self, hands: &[Hand]) -> GestureResult {
        let Some(primary) = hands.first() else {
            return GestureResult::none(0.0);
        };

        let scores = self.score(primary, hands.get(1));
        self.select(&scores)
    }

    fn score(&self, primary: &Hand, secondary: Option<&Hand>) -> Scores {
        let cfg = &self.config;
        let mut scores = Scores::default();

        if let Some(other) = secondary {
            let (palm0, palm1) = (palm_score(primary), palm_score(other));
            let (fist0, fist1) = (fist_score(primary), fist_score(other));
            if palm0 > cfg.two_hand_palm_min && palm1 > cfg.two_hand_palm_min {
                scores.shield = (palm0 + palm1) / 2.0;
            }
            // Stricter than the general floor so loosely closed hands don't block.
            if fist0 > cfg.two_hand_fist_min && fist1 > cfg.two_hand_fist_min {
                scores.block = (fist0 + fist1) / 2.0;
            }
        }

        if scores.shield.max(scores.block) < cfg.two_hand_dominance {
            scores.firebreath = finger_gun_up_score(primary);
            scores.punch = fist_score(primary);
        }

        scores
    }

    fn select(&self, scores: &Scores) -> GestureResult {
        let cfg = &self.config;
        let ranked = scores.ranked();

        let Some(&(mut top, mut top_score)) = ranked.first() else {
            return GestureResult::none(0.0);
        };
        if top_score < cfg.confidence_threshold {
            return GestureResult::none(top_score);
        }

        // Open palms must not be misread as a closed-fist block.
        let mut displaced = None;
        if top == Action::Block
            && scores.shield >= cfg.shield_preference_min
            && scores.shield >= top_score - cfg.shield_preference_window
        {
            displaced = Some(Action::Block);
            top = Action::Shield;
            top_score = scores.shield;
        }

        let runner_up = ranked
            .iter()
            .find(|(action, _)| *action != top && Some(*action) != displaced);
        if let Some(&(_, second_score)) = runner_up {
            if top_score - second_score < cfg.ambiguity_band {
                return GestureResult::none(top_score);
            }
        }

        GestureResult {
            action: top,
            confidence: top_score,
        }
    }
}
