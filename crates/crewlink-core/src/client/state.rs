//! Mutable client state and its read-only snapshot

use serde::Serialize;

use crate::config::defaults;
use crate::status::Status;
use crate::stream::{ChatMessage, MessageLog, StreamPhase, StreamTracker};
use crate::workspace::{ResultFile, ResultFiles, WorkspaceListing};

/// Everything the display layer shows, guarded by the client's lock
#[derive(Debug, Clone)]
pub(crate) struct ChatState {
    pub status: Status,
    pub busy: bool,
    pub user_query: Option<String>,
    pub user_query_time: Option<String>,
    pub messages: MessageLog,
    pub results: ResultFiles,
    pub workspace: WorkspaceListing,
    pub stream: StreamTracker,
    pub recursion_limit: u32,
    /// Description of the last stream failure, for callers awaiting a query
    pub last_error: Option<String>,
}

impl Default for ChatState {
    fn default() -> Self {
        Self {
            status: Status::Waiting,
            busy: false,
            user_query: None,
            user_query_time: None,
            messages: MessageLog::new(),
            results: ResultFiles::default(),
            workspace: WorkspaceListing::new(),
            stream: StreamTracker::new(),
            recursion_limit: defaults::RECURSION_LIMIT,
            last_error: None,
        }
    }
}

impl ChatState {
    pub fn snapshot(&self, session_id: String) -> ChatSnapshot {
        ChatSnapshot {
            session_id,
            status: self.status,
            busy: self.busy,
            user_query: self.user_query.clone(),
            user_query_time: self.user_query_time.clone(),
            messages: self.messages.as_slice().to_vec(),
            result_files: self.results.files().to_vec(),
            selected_result: self.results.selected(),
            workspace_files: self.workspace.files().to_vec(),
            selected_workspace_file: self.workspace.selected(),
            phase: self.stream.phase(),
            generation: self.stream.generation(),
            recursion_limit: self.recursion_limit,
        }
    }
}

/// Point-in-time copy of the client state
#[derive(Debug, Clone, Serialize)]
pub struct ChatSnapshot {
    pub session_id: String,
    pub status: Status,
    pub busy: bool,
    pub user_query: Option<String>,
    pub user_query_time: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub result_files: Vec<ResultFile>,
    pub selected_result: Option<usize>,
    pub workspace_files: Vec<String>,
    pub selected_workspace_file: Option<usize>,
    pub phase: StreamPhase,
    pub generation: u64,
    pub recursion_limit: u32,
}

impl ChatSnapshot {
    /// The conversation has something to show
    pub fn has_response(&self) -> bool {
        !self.messages.is_empty() || self.user_query.is_some()
    }

    pub fn selected_workspace_path(&self) -> Option<&str> {
        self.selected_workspace_file
            .and_then(|i| self.workspace_files.get(i))
            .map(String::as_str)
    }
}
