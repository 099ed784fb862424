//! Status indicator vocabulary

use serde::{Deserialize, Serialize};

/// What the status line shows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Waiting,
    Processing,
    Completed,
    Error,
    Timeout,
    SessionError,
    SessionInitError,
}

impl Status {
    pub fn message(&self) -> &'static str {
        match self {
            Status::Waiting => "Waiting for user input",
            Status::Processing => "Processing your request...",
            Status::Completed => "Processing completed",
            Status::Error => "Error occurred, please try again",
            Status::Timeout => "Processing timeout, interrupted",
            Status::SessionError => "Session validation failed, please try again",
            Status::SessionInitError => "Session initialization failed, please check the backend",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}
