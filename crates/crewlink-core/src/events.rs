//! Client events published to display layers
//!
//! Front ends never observe client state directly; they subscribe to a
//! broadcast channel of [`ClientEvent`]s and may take a snapshot when needed.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use crate::stream::{ChatMessage, StreamPhase};
use crate::status::Status;

/// Capacity of the broadcast channel; slow subscribers see `Lagged`
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// State changes emitted by the client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// The held session id changed (creation or header rotation)
    SessionChanged { session_id: String },
    /// Status indicator text changed
    StatusChanged { status: Status },
    /// Busy indicator toggled
    BusyChanged { busy: bool },
    /// A query was submitted
    QuerySubmitted { query: String, timestamp: String },
    /// A new chat message was appended
    MessageAppended { index: usize, message: ChatMessage },
    /// An existing message grew by `delta`
    MessageExtended {
        index: usize,
        delta: String,
        timestamp: String,
    },
    /// Messages, query echo and result files were discarded
    ResponseCleared,
    /// Workspace listing was replaced
    WorkspaceFilesChanged {
        files: Vec<String>,
        selected: Option<usize>,
    },
    /// A query reached a terminal phase
    QueryFinished { generation: u64, phase: StreamPhase },
}

/// Sending half of the event channel; sends never fail for lack of listeners
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: broadcast::Sender<ClientEvent>,
}

impl EventSink {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn emit(&self, event: ClientEvent) {
        if self.tx.send(event).is_err() {
            trace!("No event subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_serialize_with_type_tag() {
        let json = serde_json::to_value(ClientEvent::BusyChanged { busy: true }).unwrap();
        assert_eq!(json["type"], "busy_changed");
        assert_eq!(json["busy"], true);

        let json = serde_json::to_value(ClientEvent::StatusChanged {
            status: Status::Timeout,
        })
        .unwrap();
        assert_eq!(json["type"], "status_changed");
    }

    #[test]
    fn test_emit_without_subscribers() {
        let sink = EventSink::new();
        sink.emit(ClientEvent::ResponseCleared);

        let mut rx = sink.subscribe();
        sink.emit(ClientEvent::ResponseCleared);
        assert!(matches!(rx.try_recv(), Ok(ClientEvent::ResponseCleared)));
    }
}
