//! Pulsweitenmodulation einer Lenktaste
//!
//! Eine Tastatur kennt nur gedrückt oder losgelassen. Eine Zwischenintensität wird
//! deshalb durch zyklisches Drücken angenähert: in jeder Periode ist die Taste für
//! `cycle * intensity` gedrückt. Die Phase wird gegen einen festen Ursprung in
//! absoluter Zeit berechnet, nicht gegen die Anzahl der Aufrufe. Ausgelassene oder
//! verspätete Zyklen verschieben das Tastmuster daher nicht.

use crate::keys::{LogicalKey, SinkError};
use std::time::{Duration, Instant};
use tracing::debug;

/// Standard-Schwelle, ab der die Taste dauerhaft gehalten wird
pub const DEFAULT_FULL_LOCK_THRESHOLD: f64 = 0.95;

#[derive(Debug, Clone)]
pub struct PwmActuator {
    cycle: Duration,
    full_lock_threshold: f64,
    phase_origin: Instant,
    held: Option<LogicalKey>,
}

impl PwmActuator {
    pub fn new(cycle: Duration, full_lock_threshold: f64) -> Self {
        Self::with_origin(cycle, full_lock_threshold, Instant::now())
    }

    /// Erstellt einen Aktuator mit explizitem Phasenursprung
    pub fn with_origin(cycle: Duration, full_lock_threshold: f64, phase_origin: Instant) -> Self {
        Self {
            cycle,
            full_lock_threshold,
            phase_origin,
            held: None,
        }
    }

    /// Aktuell physisch gehaltene Lenktaste
    pub fn held(&self) -> Option<LogicalKey> {
        self.held
    }

    pub fn phase_origin(&self) -> Instant {
        self.phase_origin
    }

    /// Position innerhalb der laufenden Periode zum Zeitpunkt `now`
    pub fn phase(&self, now: Instant) -> Duration {
        let elapsed = now.saturating_duration_since(self.phase_origin).as_nanos();
        let cycle = self.cycle.as_nanos().max(1);
        Duration::from_nanos((elapsed % cycle) as u64)
    }

    /// Soll die Zieltaste bei `intensity` zum Zeitpunkt `now` gedrückt sein?
    ///
    /// NaN und ±∞ gelten als losgelassen.
    pub fn wants_down(&self, intensity: f64, now: Instant) -> bool {
        if !intensity.is_finite() || intensity <= 0.0 {
            false
        } else if intensity >= self.full_lock_threshold {
            true
        } else {
            let on_time = self.cycle.mul_f64(intensity);
            self.phase(now) < on_time
        }
    }

    /// Führt einen PWM-Schritt aus
    ///
    /// Zuerst wird `opposite` losgelassen, falls gehalten, unabhängig von der
    /// Intensität. Danach wird `target` nur dann umgeschaltet, wenn der gewünschte
    /// Zustand vom aufgezeichneten abweicht. Der aufgezeichnete Zustand ändert sich
    /// nur, wenn `emit` erfolgreich war.
    pub fn tick<F>(
        &mut self,
        intensity: f64,
        target: LogicalKey,
        opposite: LogicalKey,
        now: Instant,
        mut emit: F,
    ) -> Result<(), SinkError>
    where
        F: FnMut(LogicalKey, bool) -> Result<(), SinkError>,
    {
        if self.held == Some(opposite) {
            emit(opposite, false)?;
            debug!("Released opposite steering key {}", opposite);
            self.held = None;
        }

        let want_down = self.wants_down(intensity, now);
        let is_down = self.held == Some(target);

        if want_down && !is_down {
            emit(target, true)?;
            self.held = Some(target);
        } else if !want_down && is_down {
            emit(target, false)?;
            self.held = None;
        }

        Ok(())
    }

    /// Vermerkt, dass `key` losgelassen wurde
    pub(crate) fn mark_released(&mut self, key: LogicalKey) {
        if self.held == Some(key) {
            self.held = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEFT: LogicalKey = LogicalKey::SteerLeft;
    const RIGHT: LogicalKey = LogicalKey::SteerRight;

    fn actuator(origin: Instant) -> PwmActuator {
        PwmActuator::with_origin(Duration::from_millis(100), DEFAULT_FULL_LOCK_THRESHOLD, origin)
    }

    fn tick(
        pwm: &mut PwmActuator,
        intensity: f64,
        target: LogicalKey,
        opposite: LogicalKey,
        now: Instant,
    ) -> Vec<(LogicalKey, bool)> {
        let mut out = Vec::new();
        pwm.tick(intensity, target, opposite, now, |k, p| {
            out.push((k, p));
            Ok(())
        })
        .unwrap();
        out
    }

    #[test]
    fn thirty_percent_duty_pattern() {
        let origin = Instant::now();
        let mut pwm = actuator(origin);
        let at = |ms: u64| origin + Duration::from_millis(ms);

        assert_eq!(tick(&mut pwm, 0.3, RIGHT, LEFT, at(0)), vec![(RIGHT, true)]);
        assert!(tick(&mut pwm, 0.3, RIGHT, LEFT, at(29)).is_empty());
        assert_eq!(tick(&mut pwm, 0.3, RIGHT, LEFT, at(30)), vec![(RIGHT, false)]);
        assert!(tick(&mut pwm, 0.3, RIGHT, LEFT, at(99)).is_empty());
        assert_eq!(tick(&mut pwm, 0.3, RIGHT, LEFT, at(100)), vec![(RIGHT, true)]);
    }

    #[test]
    fn duty_fraction_matches_intensity() {
        let origin = Instant::now();
        for intensity in [0.1, 0.3, 0.5, 0.77, 0.94] {
            let mut pwm = actuator(origin);
            let mut held_ms = 0u64;
            // 10 full periods sampled every millisecond
            for ms in 0..1000u64 {
                tick(&mut pwm, intensity, LEFT, RIGHT, origin + Duration::from_millis(ms));
                if pwm.held() == Some(LEFT) {
                    held_ms += 1;
                }
            }
            let expected = intensity * 1000.0;
            assert!(
                (held_ms as f64 - expected).abs() <= 100.0,
                "intensity {} held {}ms",
                intensity,
                held_ms
            );
        }
    }

    #[test]
    fn phase_survives_skipped_cycles() {
        let origin = Instant::now();
        let mut pwm = actuator(origin);
        // first call long after construction still lands on the absolute phase
        let late = origin + Duration::from_millis(1_045);
        assert!(tick(&mut pwm, 0.3, LEFT, RIGHT, late).is_empty());
        assert_eq!(pwm.phase(late), Duration::from_millis(45));

        let next_on = origin + Duration::from_millis(1_110);
        assert_eq!(tick(&mut pwm, 0.3, LEFT, RIGHT, next_on), vec![(LEFT, true)]);
    }

    #[test]
    fn full_lock_holds_without_chatter() {
        let origin = Instant::now();
        let mut pwm = actuator(origin);
        assert_eq!(tick(&mut pwm, 0.95, LEFT, RIGHT, origin), vec![(LEFT, true)]);
        for ms in 1..300u64 {
            let out = tick(&mut pwm, 0.97, LEFT, RIGHT, origin + Duration::from_millis(ms));
            assert!(out.is_empty());
        }
        assert_eq!(pwm.held(), Some(LEFT));
    }

    #[test]
    fn zero_intensity_releases_only_if_held() {
        let origin = Instant::now();
        let mut pwm = actuator(origin);
        assert!(tick(&mut pwm, 0.0, LEFT, RIGHT, origin).is_empty());

        tick(&mut pwm, 1.0, LEFT, RIGHT, origin);
        assert_eq!(tick(&mut pwm, 0.0, LEFT, RIGHT, origin), vec![(LEFT, false)]);
        assert_eq!(pwm.held(), None);
    }

    #[test]
    fn opposite_released_before_target_press() {
        let origin = Instant::now();
        let mut pwm = actuator(origin);
        tick(&mut pwm, 1.0, LEFT, RIGHT, origin);

        let out = tick(&mut pwm, 1.0, RIGHT, LEFT, origin + Duration::from_millis(5));
        assert_eq!(out, vec![(LEFT, false), (RIGHT, true)]);
        assert_eq!(pwm.held(), Some(RIGHT));
    }

    #[test]
    fn opposite_released_even_at_zero_intensity() {
        let origin = Instant::now();
        let mut pwm = actuator(origin);
        tick(&mut pwm, 1.0, RIGHT, LEFT, origin);

        let out = tick(&mut pwm, 0.0, LEFT, RIGHT, origin);
        assert_eq!(out, vec![(RIGHT, false)]);
        assert_eq!(pwm.held(), None);
    }

    #[test]
    fn non_finite_intensity_releases_target() {
        let origin = Instant::now();
        let mut pwm = actuator(origin);
        assert!(!pwm.wants_down(f64::NAN, origin));
        assert!(!pwm.wants_down(f64::INFINITY, origin));

        tick(&mut pwm, 1.0, LEFT, RIGHT, origin);
        assert_eq!(tick(&mut pwm, f64::NAN, LEFT, RIGHT, origin), vec![(LEFT, false)]);
        assert_eq!(pwm.held(), None);
    }

    #[test]
    fn failed_emit_keeps_recorded_state() {
        let origin = Instant::now();
        let mut pwm = actuator(origin);
        let result = pwm.tick(1.0, LEFT, RIGHT, origin, |_, _| {
            Err(SinkError::Rejected("test".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(pwm.held(), None);

        // next cycle retries the press
        assert_eq!(tick(&mut pwm, 1.0, LEFT, RIGHT, origin), vec![(LEFT, true)]);
    }
}
