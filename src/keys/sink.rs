//! Sink implementations for key transitions

use super::{KeyTransition, LogicalKey};
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Errors raised when a transition could not be applied
///
/// A failed transition is never recorded as applied by the controller, so the
/// same transition is attempted again on the next cycle.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The receiving side of the sink channel is gone
    #[error("Sink channel closed while sending {0}")]
    ChannelClosed(String),

    /// The sink channel has no capacity left
    #[error("Sink channel full, dropped {0}")]
    ChannelFull(String),

    /// The key simulator refused the event
    #[error("Key simulator rejected {0}")]
    Rejected(String),
}

/// Receives key transitions from the controller
///
/// Implementations must apply transitions in the order they are handed in and
/// without internal queuing; PWM timing depends on near-immediate application.
pub trait KeySink {
    fn apply(&mut self, transition: KeyTransition) -> Result<(), SinkError>;
}

impl<S: KeySink + ?Sized> KeySink for Box<S> {
    fn apply(&mut self, transition: KeyTransition) -> Result<(), SinkError> {
        (**self).apply(transition)
    }
}

/// Forwards transitions to an external key simulator over a tokio channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<KeyTransition>,
}

impl ChannelSink {
    pub fn new(sender: mpsc::Sender<KeyTransition>) -> Self {
        Self { sender }
    }

    /// Creates a sink together with the receiver the key simulator reads from
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<KeyTransition>) {
        let (sender, receiver) = mpsc::channel(capacity);
        debug!("Created key sink channel with capacity {}", capacity);
        (Self { sender }, receiver)
    }
}

impl KeySink for ChannelSink {
    fn apply(&mut self, transition: KeyTransition) -> Result<(), SinkError> {
        match self.sender.try_send(transition) {
            Ok(_) => Ok(()),
            Err(mpsc::error::TrySendError::Full(t)) => {
                error!("Key sink channel full, cannot deliver {}", t);
                Err(SinkError::ChannelFull(t.to_string()))
            }
            Err(mpsc::error::TrySendError::Closed(t)) => {
                error!("Key sink channel closed, cannot deliver {}", t);
                Err(SinkError::ChannelClosed(t.to_string()))
            }
        }
    }
}

/// Keeps every applied transition in memory
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    log: Vec<KeyTransition>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transitions(&self) -> &[KeyTransition] {
        &self.log
    }

    /// Returns and clears everything recorded so far
    pub fn drain(&mut self) -> Vec<KeyTransition> {
        std::mem::take(&mut self.log)
    }

    pub fn presses(&self) -> impl Iterator<Item = &KeyTransition> {
        self.log.iter().filter(|t| t.pressed)
    }

    /// Replays the log and reports whether `key` ended up pressed
    pub fn is_down(&self, key: LogicalKey) -> bool {
        self.log
            .iter()
            .rev()
            .find(|t| t.key == key)
            .map(|t| t.pressed)
            .unwrap_or(false)
    }
}

impl KeySink for RecordingSink {
    fn apply(&mut self, transition: KeyTransition) -> Result<(), SinkError> {
        self.log.push(transition);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyBindings;

    #[test]
    fn recording_sink_tracks_last_state_per_key() {
        let bindings = KeyBindings::default();
        let mut sink = RecordingSink::new();
        sink.apply(bindings.transition(LogicalKey::Gas, true)).unwrap();
        sink.apply(bindings.transition(LogicalKey::SteerLeft, true))
            .unwrap();
        sink.apply(bindings.transition(LogicalKey::Gas, false)).unwrap();

        assert!(!sink.is_down(LogicalKey::Gas));
        assert!(sink.is_down(LogicalKey::SteerLeft));
        assert!(!sink.is_down(LogicalKey::Brake));
        assert_eq!(sink.presses().count(), 2);
        assert_eq!(sink.drain().len(), 3);
        assert!(sink.transitions().is_empty());
    }

    #[test]
    fn channel_sink_reports_full_and_closed() {
        let bindings = KeyBindings::default();
        let (mut sink, mut rx) = ChannelSink::channel(1);

        sink.apply(bindings.transition(LogicalKey::Gas, true)).unwrap();
        let full = sink.apply(bindings.transition(LogicalKey::Gas, false));
        assert!(matches!(full, Err(SinkError::ChannelFull(_))));

        let received = rx.try_recv().unwrap();
        assert_eq!(received.code.as_str(), "w");
        assert!(received.pressed);

        drop(rx);
        let closed = sink.apply(bindings.transition(LogicalKey::Brake, true));
        assert!(matches!(closed, Err(SinkError::ChannelClosed(_))));
    }
}
