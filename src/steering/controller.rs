//! Steuerung der vier Tasten: Lenken links/rechts, Gas, Bremse
//!
//! Der Controller ist der einzige Besitzer des Tastenzustands. Er bekommt fertig
//! aufgelöste Winkel und Pedal-Absichten aus der Schleife und kennt keine
//! Handerkennung.

use super::mapper::SteeringMapper;
use super::pedal::{PedalArbiter, PedalState};
use super::pwm::PwmActuator;
use super::SteeringOutput;
use crate::config::{ConfigError, DriveConfig};
use crate::keys::{KeyBindings, KeySink, LogicalKey, SinkError};
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct SteeringController<K: KeySink> {
    mapper: SteeringMapper,
    pwm: PwmActuator,
    pedals: PedalArbiter,
    bindings: KeyBindings,
    sink: K,
}

fn apply<K: KeySink>(
    sink: &mut K,
    bindings: &KeyBindings,
    key: LogicalKey,
    pressed: bool,
) -> Result<(), SinkError> {
    let transition = bindings.transition(key, pressed);
    debug!("Applying key transition {}", transition);
    sink.apply(transition)
}

impl<K: KeySink> SteeringController<K> {
    /// Erstellt einen Controller; eine ungültige Konfiguration wird abgelehnt
    pub fn new(config: &DriveConfig, sink: K) -> Result<Self, ConfigError> {
        Self::with_origin(config, sink, Instant::now())
    }

    /// Wie [`Self::new`], aber mit explizitem PWM-Phasenursprung
    pub fn with_origin(config: &DriveConfig, sink: K, origin: Instant) -> Result<Self, ConfigError> {
        config.validate()?;

        info!(
            "Steering controller ready: deadzone={}°, max={}°, cycle={}s, full lock>={}",
            config.steering.deadzone_deg,
            config.steering.max_turn_deg,
            config.pwm.cycle_seconds,
            config.steering.full_lock_threshold
        );

        Ok(Self {
            mapper: SteeringMapper::from_settings(&config.steering),
            pwm: PwmActuator::with_origin(
                config.pwm.cycle(),
                config.steering.full_lock_threshold,
                origin,
            ),
            pedals: PedalArbiter::new(),
            bindings: config.keys.clone(),
            sink,
        })
    }

    pub fn update_steering(&mut self, current_angle: f64) -> Result<SteeringOutput, SinkError> {
        self.update_steering_at(current_angle, Instant::now())
    }

    /// Ein Lenkzyklus zum Zeitpunkt `now`
    pub fn update_steering_at(
        &mut self,
        current_angle: f64,
        now: Instant,
    ) -> Result<SteeringOutput, SinkError> {
        let (direction, intensity) = self.mapper.map(current_angle);
        let target = direction.key();
        let opposite = direction.opposite().key();

        let Self {
            pwm,
            sink,
            bindings,
            ..
        } = self;
        pwm.tick(intensity, target, opposite, now, |key, pressed| {
            apply(&mut *sink, bindings, key, pressed)
        })?;

        Ok(SteeringOutput::new(direction, intensity))
    }

    /// Setzt die Pedal-Absicht um und liefert die Anzeige ("GAS", "BRAKE", "COAST")
    pub fn update_pedals(&mut self, intent: PedalState) -> Result<&'static str, SinkError> {
        let Self {
            pedals,
            sink,
            bindings,
            ..
        } = self;
        let state = pedals.emit(intent, |key, pressed| apply(&mut *sink, bindings, key, pressed))?;
        Ok(state.label())
    }

    /// Lässt alle vier Tasten los, unabhängig vom aufgezeichneten Zustand
    ///
    /// Sendet ausschließlich Loslass-Ereignisse und darf beliebig oft aufgerufen
    /// werden. Schlägt eine Taste fehl, werden die übrigen trotzdem gelöst und
    /// der erste Fehler zurückgegeben.
    pub fn stop(&mut self) -> Result<(), SinkError> {
        let mut first_error = None;

        for key in LogicalKey::ALL {
            match apply(&mut self.sink, &self.bindings, key, false) {
                Ok(()) => {
                    self.pwm.mark_released(key);
                    self.pedals.mark_released(key);
                }
                Err(e) => {
                    warn!("Failed to release {} during stop: {}", key, e);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Gehaltene Lenktaste laut aufgezeichnetem Zustand
    pub fn held_steering_key(&self) -> Option<LogicalKey> {
        self.pwm.held()
    }

    pub fn pedal_state(&self) -> PedalState {
        self.pedals.state()
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    #[cfg(test)]
    pub(crate) fn sink(&self) -> &K {
        &self.sink
    }

    #[cfg(test)]
    pub(crate) fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }
}

impl<K: KeySink> Drop for SteeringController<K> {
    fn drop(&mut self) {
        let held: Vec<LogicalKey> = self
            .pwm
            .held()
            .into_iter()
            .chain(self.pedals.state().key())
            .collect();

        for key in held {
            if let Err(e) = apply(&mut self.sink, &self.bindings, key, false) {
                warn!("Could not release {} on teardown: {}", key, e);
            }
        }
    }
}
