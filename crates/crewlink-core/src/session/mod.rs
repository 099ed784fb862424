//! Session lifecycle
//!
//! Validation, creation and server-driven rotation of the backend session id.

mod manager;
mod types;

pub use manager::SessionManager;
pub use types::{SessionFailure, SessionId, Validation};
