//! Progress and log notifications published to the caller
//!
//! Events travel over an unbounded tokio channel so that publishing never waits on the
//! subscriber. A sink whose receiver has been dropped silently discards events.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

/// A single notification emitted during a migration or rollback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MigrationEvent {
    /// Human-readable log line
    Log(String),
    /// Overall completion, 0-100
    Progress(u8),
}

impl fmt::Display for MigrationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationEvent::Log(text) => write!(f, "{}", text),
            MigrationEvent::Progress(percent) => write!(f, "{}%", percent),
        }
    }
}

/// Receiving half handed to the UI layer
pub type EventReceiver = mpsc::UnboundedReceiver<MigrationEvent>;

/// Publishing half shared by the orchestrator and the rollback ledger
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    sender: Option<mpsc::UnboundedSender<MigrationEvent>>,
}

impl EventSink {
    /// Create a connected sink/receiver pair
    pub fn channel() -> (Self, EventReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    /// A sink that drops every event
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn log(&self, text: impl Into<String>) {
        self.emit(MigrationEvent::Log(text.into()));
    }

    pub fn progress(&self, percent: u8) {
        self.emit(MigrationEvent::Progress(percent.min(100)));
    }

    fn emit(&self, event: MigrationEvent) {
        if let Some(sender) = &self.sender {
            // Subscriber went away; nothing left to notify
            let _ = sender.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (sink, mut rx) = EventSink::channel();
        sink.log("starting");
        sink.progress(50);
        sink.progress(150);

        assert_eq!(rx.recv().await, Some(MigrationEvent::Log("starting".into())));
        assert_eq!(rx.recv().await, Some(MigrationEvent::Progress(50)));
        assert_eq!(rx.recv().await, Some(MigrationEvent::Progress(100)));
    }

    #[test]
    fn test_dropped_receiver_does_not_fail() {
        let (sink, rx) = EventSink::channel();
        drop(rx);
        sink.log("nobody listening");
        EventSink::disabled().progress(10);
    }
}
