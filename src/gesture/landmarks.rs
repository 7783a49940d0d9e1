//! Hand landmark geometry
//!
//! Pure predicates over the 21 tracked key-points of one hand. Coordinates are
//! normalized to 0..1 with the origin top-left, so a smaller `y` is higher on
//! screen.

use serde::{Deserialize, Serialize};

// ============================================================================
// HAND LANDMARK INDICES
// ============================================================================

pub const WRIST: usize = 0;
pub const THUMB_TIP: usize = 4;
pub const INDEX_PIP: usize = 6;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_TIP: usize = 12;
pub const RING_PIP: usize = 14;
pub const RING_TIP: usize = 16;
pub const PINKY_PIP: usize = 18;
pub const PINKY_TIP: usize = 20;

/// Key-points a hand must carry before any shape is scored
pub const HAND_LANDMARK_COUNT: usize = 21;

/// Slack when deciding a fingertip has curled down to its joint
pub const CLOSED_TOLERANCE: f32 = 0.02;
/// Slack when deciding a fingertip is raised above its joint
pub const EXTENDED_TOLERANCE: f32 = 0.02;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// A single tracked point (normalized coordinates)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }
}

/// The four non-thumb fingers, in the order they are scored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finger {
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 4] = [Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky];

    pub fn tip(self) -> usize {
        match self {
            Finger::Index => INDEX_TIP,
            Finger::Middle => MIDDLE_TIP,
            Finger::Ring => RING_TIP,
            Finger::Pinky => PINKY_TIP,
        }
    }

    pub fn pip(self) -> usize {
        match self {
            Finger::Index => INDEX_PIP,
            Finger::Middle => MIDDLE_PIP,
            Finger::Ring => RING_PIP,
            Finger::Pinky => PINKY_PIP,
        }
    }
}

/// One hand's landmarks for a single frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hand {
    points: Vec<Landmark>,
}

impl Hand {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    /// Hands with fewer than 21 points score zero for every shape
    pub fn is_complete(&self) -> bool {
        self.points.len() >= HAND_LANDMARK_COUNT
    }

    pub fn point(&self, index: usize) -> Option<Landmark> {
        self.points.get(index).copied()
    }

    fn tip_and_pip(&self, finger: Finger) -> Option<(Landmark, Landmark)> {
        Some((self.point(finger.tip())?, self.point(finger.pip())?))
    }

    /// Tip at or below its proximal joint, within `CLOSED_TOLERANCE`
    pub fn is_closed(&self, finger: Finger) -> bool {
        self.tip_and_pip(finger)
            .map(|(tip, pip)| tip.y > pip.y - CLOSED_TOLERANCE)
            .unwrap_or(false)
    }

    /// Tip above its proximal joint, within `EXTENDED_TOLERANCE`
    pub fn is_extended(&self, finger: Finger) -> bool {
        self.tip_and_pip(finger)
            .map(|(tip, pip)| tip.y < pip.y + EXTENDED_TOLERANCE)
            .unwrap_or(false)
    }

    /// Number of fingers (thumb excluded) that are closed
    pub fn closed_count(&self) -> usize {
        Finger::ALL.iter().filter(|f| self.is_closed(**f)).count()
    }

    /// Number of fingers (thumb excluded) that are extended
    pub fn extended_count(&self) -> usize {
        Finger::ALL.iter().filter(|f| self.is_extended(**f)).count()
    }

    /// Index-tip to pinky-tip distance, 0 when either point is missing
    pub fn finger_spread(&self) -> f32 {
        match (self.point(INDEX_TIP), self.point(PINKY_TIP)) {
            (Some(a), Some(b)) => distance(a, b),
            _ => 0.0,
        }
    }
}

// ============================================================================
// PREDICATES
// ============================================================================

/// Planar distance between two points
pub fn distance(a: Landmark, b: Landmark) -> f32 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// True when `a` sits higher on screen than `b` by more than `margin`
pub fn is_above(a: Landmark, b: Landmark, margin: f32) -> bool {
    a.y < b.y - margin
}
