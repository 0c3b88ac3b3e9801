//! Aktuierungsschicht: wandelt einen geglätteten Lenkwinkel und eine Pedal-Absicht
//! in Tastenereignisse um.
//!
//! Das Modul ist in kleine Bausteine aufgeteilt, die vom [`SteeringController`]
//! zusammengesetzt werden:
//!
//! ```text
//! Rohwinkel ──► AngleSmoother ──► SteeringMapper ──► PwmActuator ──┐
//!                                                                  ├──► KeySink
//! Fäuste    ──► PedalArbiter ──────────────────────────────────────┘
//! ```

pub mod controller;
pub mod mapper;
pub mod pedal;
pub mod pwm;
pub mod smoothing;

pub use controller::SteeringController;
pub use mapper::SteeringMapper;
pub use pedal::{PedalArbiter, PedalState};
pub use pwm::PwmActuator;
pub use smoothing::AngleSmoother;

use crate::keys::LogicalKey;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Lenkrichtung
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    /// Taste, die in diese Richtung lenkt
    pub fn key(self) -> LogicalKey {
        match self {
            Direction::Left => LogicalKey::SteerLeft,
            Direction::Right => LogicalKey::SteerRight,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Left => write!(f, "LEFT"),
            Direction::Right => write!(f, "RIGHT"),
        }
    }
}

/// RGB-Farbe für die Anzeige der Lenkintensität
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct IndicatorColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl IndicatorColor {
    pub const STRAIGHT: IndicatorColor = IndicatorColor { r: 0, g: 255, b: 0 };
    pub const NO_SIGNAL: IndicatorColor = IndicatorColor {
        r: 100,
        g: 100,
        b: 100,
    };

    /// Verläuft von Grün (keine Lenkung) nach Rot (Vollausschlag)
    pub fn for_intensity(intensity: f64) -> Self {
        let i = intensity.clamp(0.0, 1.0);
        Self {
            r: (255.0 * i) as u8,
            g: (255.0 * (1.0 - i)) as u8,
            b: 0,
        }
    }
}

/// Abgeleitete Lenkausgabe eines Zyklus, wird nicht gespeichert
#[derive(Debug, Clone, PartialEq)]
pub struct SteeringOutput {
    pub direction: Direction,
    pub intensity: f64,
    pub label: String,
    pub color: IndicatorColor,
}

impl SteeringOutput {
    pub fn new(direction: Direction, intensity: f64) -> Self {
        if intensity == 0.0 {
            return Self {
                direction,
                intensity,
                label: "STRAIGHT".to_string(),
                color: IndicatorColor::STRAIGHT,
            };
        }

        Self {
            direction,
            intensity,
            label: format!("{} {}%", direction, (intensity * 100.0) as u32),
            color: IndicatorColor::for_intensity(intensity),
        }
    }
}
