//! Session types

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Opaque backend-issued session handle; empty means "none yet"
pub type SessionId = String;

/// Outcome of probing the backend with the held session id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validation {
    /// The backend knows the id
    Valid,
    /// No id is held
    Missing,
    /// The backend answered with a non-success status
    Rejected,
    /// The validity check never got an answer
    Unreachable,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid)
    }
}

/// Which step of session establishment failed, for user-facing wording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFailure {
    /// The backend could not be reached while validating, and creation failed too
    Validation,
    /// A new session could not be created
    Creation,
}

impl SessionFailure {
    pub fn after(validation: Validation) -> Self {
        match validation {
            Validation::Unreachable => SessionFailure::Validation,
            _ => SessionFailure::Creation,
        }
    }

    pub fn into_error(self, cause: Error) -> Error {
        let detail = match cause {
            Error::SessionCreation(detail) => detail,
            other => other.to_string(),
        };
        match self {
            SessionFailure::Validation => Error::SessionValidation(detail),
            SessionFailure::Creation => Error::SessionCreation(detail),
        }
    }

    pub fn from_error(error: &Error) -> Self {
        match error {
            Error::SessionValidation(_) => SessionFailure::Validation,
            _ => SessionFailure::Creation,
        }
    }

    /// System chat text shown when a query cannot get a session
    pub fn message(&self) -> &'static str {
        match self {
            SessionFailure::Validation => {
                "Error validating session ID. Please ensure the backend server is running and the address is configured correctly."
            }
            SessionFailure::Creation => {
                "Error creating new session. Please ensure the backend server is running and the address is configured correctly."
            }
        }
    }
}
