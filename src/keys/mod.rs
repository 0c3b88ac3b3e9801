//! Key identifiers and transition events for the key-simulation sink
//!
//! The steering core never talks to a keyboard device directly. It emits
//! [`KeyTransition`] values into a [`KeySink`], which forwards them to whatever
//! applies them (an OS key simulator, a channel, a log).
//!
//! ```text
//! SteeringController ──► KeyTransition ──► KeySink ──► key simulator
//!                        (logical + code)   (apply)
//! ```

pub mod sink;

pub use sink::{ChannelSink, KeySink, RecordingSink, SinkError};

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// The four keys owned by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalKey {
    SteerLeft,
    SteerRight,
    Gas,
    Brake,
}

impl LogicalKey {
    pub const ALL: [LogicalKey; 4] = [
        LogicalKey::SteerLeft,
        LogicalKey::SteerRight,
        LogicalKey::Gas,
        LogicalKey::Brake,
    ];
}

impl Display for LogicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalKey::SteerLeft => write!(f, "SteerLeft"),
            LogicalKey::SteerRight => write!(f, "SteerRight"),
            LogicalKey::Gas => write!(f, "Gas"),
            LogicalKey::Brake => write!(f, "Brake"),
        }
    }
}

/// Identifier of a physical key as understood by the key simulator (e.g. `"w"`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct KeyCode(pub String);

impl KeyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bindings from logical keys to physical key codes
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct KeyBindings {
    pub gas: KeyCode,
    pub brake: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            gas: KeyCode::new("w"),
            brake: KeyCode::new("s"),
            left: KeyCode::new("a"),
            right: KeyCode::new("d"),
        }
    }
}

impl KeyBindings {
    pub fn code(&self, key: LogicalKey) -> &KeyCode {
        match key {
            LogicalKey::SteerLeft => &self.left,
            LogicalKey::SteerRight => &self.right,
            LogicalKey::Gas => &self.gas,
            LogicalKey::Brake => &self.brake,
        }
    }

    /// Builds the transition event for `key` with its bound code
    pub fn transition(&self, key: LogicalKey, pressed: bool) -> KeyTransition {
        KeyTransition {
            key,
            code: self.code(key).clone(),
            pressed,
        }
    }
}

/// A single `(key, pressed)` event handed to the sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTransition {
    pub key: LogicalKey,
    pub code: KeyCode,
    pub pressed: bool,
}

impl Display for KeyTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = if self.pressed { "down" } else { "up" };
        write!(f, "{} [{}] {}", self.key, self.code, action)
    }
}
