#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for the sprig concretizer
//!
//! The solver reports progress through events rather than by logging
//! directly; every emission is also mirrored into `tracing` at debug
//! level. Senders are fire-and-forget: a dropped receiver never fails a
//! solve.

use serde::{Deserialize, Serialize};
use sprig_types::Version;
use tokio::sync::mpsc::UnboundedSender;

/// Events emitted during concretization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// A solve started for a root request
    SolveStarted { root: String },

    /// A package entered the constraint graph
    NodeExpanded { package: String },

    /// A dependency edge's condition became true
    EdgeActivated { consumer: String, provider: String },

    /// The solver chose a version for a package
    VersionSelected { package: String, version: Version },

    /// A branch of the search failed and the solver is retrying
    Backtracked { package: String, depth: usize },

    /// Constraints could not be satisfied on the current branch
    ConflictDetected { constraints: Vec<String> },

    /// A solve finished with a concrete graph of `nodes` packages
    SolveSucceeded { root: String, nodes: usize },

    /// A solve failed terminally
    SolveFailed { root: String, message: String },
}

impl Event {
    /// Short label used for tracing output
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SolveStarted { .. } => "solve_started",
            Self::NodeExpanded { .. } => "node_expanded",
            Self::EdgeActivated { .. } => "edge_activated",
            Self::VersionSelected { .. } => "version_selected",
            Self::Backtracked { .. } => "backtracked",
            Self::ConflictDetected { .. } => "conflict_detected",
            Self::SolveSucceeded { .. } => "solve_succeeded",
            Self::SolveFailed { .. } => "solve_failed",
        }
    }
}

/// Type alias for the event sender
pub type EventSender = UnboundedSender<Event>;

/// Type alias for the event receiver
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<Event>;

/// Create a new event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events
///
/// Implementors only provide access to their optional sender; `emit`
/// handles the rest.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: Event) {
        tracing::debug!(event = event.name(), "{event:?}");
        if let Some(sender) = self.event_sender() {
            // Ignore send errors - if the receiver is dropped, we continue
            let _ = sender.send(event);
        }
    }
}

impl EventEmitter for Option<EventSender> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_and_receive() {
        let (tx, mut rx) = channel();
        let emitter = Some(tx);

        emitter.emit(Event::SolveStarted {
            root: "gaudi".to_string(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name(), "solve_started");
    }

    #[tokio::test]
    async fn test_emit_with_dropped_receiver_is_silent() {
        let (tx, rx) = channel();
        drop(rx);

        let emitter = Some(tx);
        emitter.emit(Event::NodeExpanded {
            package: "xerces-c".to_string(),
        });
    }

    #[test]
    fn test_none_emitter_is_silent() {
        let emitter: Option<EventSender> = None;
        emitter.emit(Event::SolveFailed {
            root: "gaudi".to_string(),
            message: "unsatisfiable".to_string(),
        });
    }
}
