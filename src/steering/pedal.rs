//! Pedal-Arbitrierung aus zwei Faust-Gesten

use crate::keys::{LogicalKey, SinkError};
use std::fmt::{self, Display};
use tracing::debug;

/// Pedalzustand; Gas und Bremse sind nie gleichzeitig aktiv
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PedalState {
    #[default]
    Coasting,
    Gas,
    Brake,
}

impl PedalState {
    /// Zugehörige Taste, `None` beim Rollen
    pub fn key(self) -> Option<LogicalKey> {
        match self {
            PedalState::Coasting => None,
            PedalState::Gas => Some(LogicalKey::Gas),
            PedalState::Brake => Some(LogicalKey::Brake),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PedalState::Coasting => "COAST",
            PedalState::Gas => "GAS",
            PedalState::Brake => "BRAKE",
        }
    }
}

impl Display for PedalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Setzt Gesten in Pedalzustände um und sendet nur bei Zustandswechseln
#[derive(Debug, Clone, Default)]
pub struct PedalArbiter {
    state: PedalState,
}

impl PedalArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Beide Fäuste geschlossen = Gas, beide offen = Bremse, gemischt = Rollen
    pub fn arbitrate(left_closed: bool, right_closed: bool) -> PedalState {
        match (left_closed, right_closed) {
            (true, true) => PedalState::Gas,
            (false, false) => PedalState::Brake,
            _ => PedalState::Coasting,
        }
    }

    pub fn state(&self) -> PedalState {
        self.state
    }

    /// Wechselt nach `next` und sendet die nötigen Übergänge
    ///
    /// Erst wird die Taste des bisherigen Zustands gelöst, dann die neue gedrückt.
    /// Scheitert das Drücken nach erfolgreichem Lösen, steht der Zustand auf
    /// `Coasting`, damit der nächste Aufruf das Drücken wiederholt.
    pub fn emit<F>(&mut self, next: PedalState, mut emit: F) -> Result<PedalState, SinkError>
    where
        F: FnMut(LogicalKey, bool) -> Result<(), SinkError>,
    {
        if next == self.state {
            return Ok(self.state);
        }

        let previous = self.state;
        if let Some(key) = self.state.key() {
            emit(key, false)?;
            self.state = PedalState::Coasting;
        }
        if let Some(key) = next.key() {
            emit(key, true)?;
        }

        debug!("Pedal state {} -> {}", previous, next);
        self.state = next;
        Ok(self.state)
    }

    /// Vermerkt, dass `key` losgelassen wurde
    pub(crate) fn mark_released(&mut self, key: LogicalKey) {
        if self.state.key() == Some(key) {
            self.state = PedalState::Coasting;
        }
    }
}
