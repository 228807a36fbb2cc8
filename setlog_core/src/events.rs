//! Change notifications emitted by the session controller.
//!
//! Consumers subscribe for a channel receiver and re-read controller state
//! on `Changed`. `Terminated` fires exactly once per session.

use serde::Serialize;
use std::sync::mpsc::{channel, Receiver, Sender};
use uuid::Uuid;

/// How a session ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    Completed,
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// Session state changed; carries nothing, re-read the controller
    Changed,
    /// The session reached its terminal outcome and the controller is idle
    Terminated {
        session_id: Uuid,
        outcome: SessionOutcome,
    },
}

/// Fan-out of session events to any number of subscribers
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<SessionEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    /// Deliver `event` to every live subscriber, dropping closed ones
    pub fn emit(&mut self, event: SessionEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
