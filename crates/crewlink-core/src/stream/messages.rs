//! Display-ready chat messages and the append-or-new merge rule

use serde::{Deserialize, Serialize};

use super::event::ParsedEvent;

pub const SYSTEM_TEAM: &str = "system";
pub const SYSTEM_SENDER: &str = "System";

pub const CONNECTION_ERROR_TEXT: &str = "Failed to connect to backend API. Please ensure the backend server is running and the address is configured correctly.";
pub const TIMEOUT_TEXT: &str = "\n\n[System] Response timeout, connection closed.";

/// Current local time as HH:MM
pub fn current_time() -> String {
    chrono::Local::now().format("%H:%M").to_string()
}

/// One entry in the chat transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub team: String,
    pub sender: String,
    /// Grouping key; `None` for system-authored entries, which never merge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    pub content: String,
    pub timestamp: String,
}

impl ChatMessage {
    pub fn from_event(event: ParsedEvent, timestamp: impl Into<String>) -> Self {
        Self {
            team: event.team,
            sender: event.sender,
            sender_id: Some(event.sender_id),
            content: event.fragment,
            timestamp: timestamp.into(),
        }
    }

    pub fn system(content: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            team: SYSTEM_TEAM.to_string(),
            sender: SYSTEM_SENDER.to_string(),
            sender_id: None,
            content: content.into(),
            timestamp: timestamp.into(),
        }
    }

    pub fn is_system(&self) -> bool {
        self.sender_id.is_none() && self.team == SYSTEM_TEAM
    }
}

/// What [`MessageLog::apply`] did with a fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    Appended(usize),
    Extended(usize),
}

/// Ordered transcript; insertion order is arrival order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MessageLog {
    messages: Vec<ChatMessage>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a fragment: same sender as the last message extends it,
    /// anything else starts a new message.
    pub fn apply(&mut self, event: ParsedEvent, timestamp: String) -> Merge {
        if let Some(last) = self.messages.last_mut() {
            if last.sender_id.as_deref() == Some(event.sender_id.as_str()) {
                last.content.push_str(&event.fragment);
                last.timestamp = timestamp;
                return Merge::Extended(self.messages.len() - 1);
            }
        }

        self.messages.push(ChatMessage::from_event(event, timestamp));
        Merge::Appended(self.messages.len() - 1)
    }

    /// Append a system-authored entry; returns its index
    pub fn push_system(&mut self, content: impl Into<String>, timestamp: String) -> usize {
        self.messages.push(ChatMessage::system(content, timestamp));
        self.messages.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&ChatMessage> {
        self.messages.get(index)
    }

    pub fn as_slice(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
