//! Abbildung des Lenkwinkels auf Richtung und Intensität

use super::Direction;
use crate::config::SteeringSettings;

/// Bildet `angle` (Grad) auf Richtung und Intensität in `[0, 1]` ab.
///
/// Positive Winkel lenken nach rechts, negative nach links. Ein Winkel von genau
/// null erhält `zero_direction`; bei Intensität 0 hat die Richtung keine Wirkung.
///
/// Ein nicht endlicher Winkel (NaN, ±∞) ergibt Intensität 0.
///
/// Innerhalb der Totzone ist die Intensität 0. Darüber wird linear über
/// `[deadzone, max_angle]` normiert, begrenzt und durch eine Wurzelkurve
/// geschickt, damit kleine Auslenkungen schon deutlich ansprechen.
pub fn map_angle(
    angle: f64,
    deadzone: f64,
    max_angle: f64,
    zero_direction: Direction,
) -> (Direction, f64) {
    if !angle.is_finite() {
        return (zero_direction, 0.0);
    }

    let direction = if angle > 0.0 {
        Direction::Right
    } else if angle < 0.0 {
        Direction::Left
    } else {
        zero_direction
    };

    let abs_angle = angle.abs();
    if abs_angle < deadzone {
        return (direction, 0.0);
    }

    let range = max_angle - deadzone;
    if range <= 0.0 {
        // leerer Bereich: direkt auf Vollausschlag
        return (direction, 1.0);
    }

    let normalized = ((abs_angle - deadzone) / range).clamp(0.0, 1.0);
    (direction, normalized.sqrt())
}

/// Konfigurierte Lenkkennlinie
#[derive(Debug, Clone)]
pub struct SteeringMapper {
    deadzone: f64,
    max_angle: f64,
    zero_direction: Direction,
}

impl SteeringMapper {
    pub fn new(deadzone: f64, max_angle: f64, zero_direction: Direction) -> Self {
        Self {
            deadzone,
            max_angle,
            zero_direction,
        }
    }

    pub fn from_settings(settings: &SteeringSettings) -> Self {
        Self::new(
            settings.deadzone_deg,
            settings.max_turn_deg,
            settings.zero_angle_direction,
        )
    }

    pub fn map(&self, angle: f64) -> (Direction, f64) {
        map_angle(angle, self.deadzone, self.max_angle, self.zero_direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> SteeringMapper {
        SteeringMapper::new(2.0, 50.0, Direction::Left)
    }

    #[test]
    fn worked_example() {
        let (direction, intensity) = mapper().map(26.0);
        assert_eq!(direction, Direction::Right);
        assert!((intensity - 0.5f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn deadzone_yields_zero() {
        let m = mapper();
        for angle in [-1.99, -1.0, -0.001, 0.0, 0.5, 1.99] {
            assert_eq!(m.map(angle).1, 0.0, "angle {}", angle);
        }
    }

    #[test]
    fn saturates_beyond_max() {
        let m = mapper();
        for angle in [50.0, 51.0, 90.0, -50.0, -179.0] {
            assert_eq!(m.map(angle).1, 1.0, "angle {}", angle);
        }
    }

    #[test]
    fn monotonic_over_range() {
        let m = mapper();
        let mut previous = 0.0;
        let mut angle = 2.0;
        while angle <= 50.0 {
            let (_, intensity) = m.map(angle);
            assert!(intensity >= previous, "angle {}", angle);
            previous = intensity;
            angle += 0.25;
        }
    }

    #[test]
    fn zero_tie_break_is_configurable() {
        assert_eq!(mapper().map(0.0).0, Direction::Left);
        let m = SteeringMapper::new(2.0, 50.0, Direction::Right);
        assert_eq!(m.map(0.0).0, Direction::Right);
        assert_eq!(m.map(-0.1).0, Direction::Left);
    }

    #[test]
    fn non_finite_angle_is_straight() {
        let m = mapper();
        assert_eq!(m.map(f64::NAN), (Direction::Left, 0.0));
        assert_eq!(m.map(f64::INFINITY).1, 0.0);
        assert_eq!(m.map(f64::NEG_INFINITY).1, 0.0);
    }

    #[test]
    fn empty_range_snaps() {
        assert_eq!(map_angle(4.9, 5.0, 5.0, Direction::Left).1, 0.0);
        assert_eq!(map_angle(5.0, 5.0, 5.0, Direction::Left).1, 1.0);
        assert_eq!(map_angle(-12.0, 5.0, 5.0, Direction::Left), (Direction::Left, 1.0));
    }
}
