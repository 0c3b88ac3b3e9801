//! Hand geometry: wrist-to-wrist angle and fist classification
//!
//! Landmarks use the common 21-point hand layout with coordinates normalized
//! to `[0, 1]` of the frame.

use serde::{Deserialize, Serialize};

pub const WRIST: usize = 0;
pub const LANDMARK_COUNT: usize = 21;

/// Fingertip indices (index, middle, ring, pinky); the PIP joint sits two below each
const FINGERTIPS: [usize; 4] = [8, 12, 16, 20];
const MIN_FOLDED_FINGERS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn distance(&self, other: &Landmark) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Landmarks of one detected hand
#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarks {
    points: Vec<Landmark>,
}

impl HandLandmarks {
    /// Returns `None` unless exactly 21 landmarks are supplied
    pub fn new(points: Vec<Landmark>) -> Option<Self> {
        if points.len() == LANDMARK_COUNT {
            Some(Self { points })
        } else {
            None
        }
    }

    pub fn wrist(&self) -> Landmark {
        self.points[WRIST]
    }

    pub fn point(&self, index: usize) -> Option<Landmark> {
        self.points.get(index).copied()
    }

    /// Wrist position in pixel coordinates, truncated like the frame grid
    pub fn wrist_px(&self, frame_width: u32, frame_height: u32) -> (i64, i64) {
        let wrist = self.wrist();
        (
            (wrist.x * frame_width as f64) as i64,
            (wrist.y * frame_height as f64) as i64,
        )
    }
}

/// Angle in degrees of the segment `p1 -> p2`, in `(-180, 180]`
pub fn wrist_angle(p1: (f64, f64), p2: (f64, f64)) -> f64 {
    let (x1, y1) = p1;
    let (x2, y2) = p2;
    (y2 - y1).atan2(x2 - x1).to_degrees()
}

/// A finger counts as folded when its tip is closer to the wrist than its PIP joint
pub fn is_fist(hand: &HandLandmarks) -> bool {
    let wrist = hand.wrist();
    let folded = FINGERTIPS
        .iter()
        .filter(|&&tip| {
            let tip_point = hand.points[tip];
            let pip_point = hand.points[tip - 2];
            tip_point.distance(&wrist) < pip_point.distance(&wrist)
        })
        .count();
    folded >= MIN_FOLDED_FINGERS
}
