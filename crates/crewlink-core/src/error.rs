//! Error types for Crewlink Core

use thiserror::Error;

/// Result type alias using Crewlink Error
pub type Result<T> = std::result::Result<T, Error>;

/// Crewlink error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Session validation failed: {0}")]
    SessionValidation(String),

    #[error("Session creation failed: {0}")]
    SessionCreation(String),

    #[error("Stream transport error: {0}")]
    StreamTransport(String),

    #[error("Stream parse error: {0}")]
    StreamParse(#[from] ParseError),

    #[error("Stream timed out after {0} seconds")]
    StreamTimeout(u64),

    #[error("File does not exist or has been deleted: {0}")]
    DownloadFileMissing(String),

    #[error("{}", expired_message(.recovered))]
    DownloadSessionExpired { recovered: bool },

    #[error("Query is empty")]
    EmptyQuery,

    #[error("Nothing selected: {0}")]
    NoSelection(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status} for {path}")]
    Status { status: u16, path: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn expired_message(recovered: &bool) -> &'static str {
    if *recovered {
        "Session has been refreshed, please try downloading again"
    } else {
        "Session expired and cannot be recreated"
    }
}

impl Error {
    /// True when the backend answered but refused the request.
    pub fn is_status(&self) -> bool {
        matches!(self, Error::Status { .. })
    }
}

/// Why a push payload could not be turned into a chat fragment
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid event payload: {0}")]
    InvalidJson(String),

    #[error("Event payload is missing field: {0}")]
    MissingField(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_expired_wording() {
        let recovered = Error::DownloadSessionExpired { recovered: true }.to_string();
        let lost = Error::DownloadSessionExpired { recovered: false }.to_string();
        assert!(recovered.contains("try downloading again"));
        assert!(lost.contains("cannot be recreated"));
    }

    #[test]
    fn test_parse_error_converts() {
        let err: Error = ParseError::MissingField("response").into();
        assert!(matches!(err, Error::StreamParse(ParseError::MissingField("response"))));
        assert!(!err.is_status());
    }
}
