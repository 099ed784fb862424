//! Crewlink Core - streamed chat with an agent-team backend
//!
//! This crate provides the client side of the Crewlink service:
//! - Session establishment, validation and server-driven rotation
//! - Streaming query responses aggregated into a per-sender transcript
//! - Workspace file listing, selection and download
//! - Events describing every state change for display layers

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod session;
pub mod status;
pub mod stream;
pub mod workspace;

pub use api::{Backend, HttpBackend};
pub use client::{ChatClient, ChatSnapshot, QueryHandle};
pub use config::{Config, ConfigManager, defaults};
pub use error::{Error, Result};
pub use events::{ClientEvent, EventSink};
pub use session::{SessionId, SessionManager, Validation};
pub use status::Status;
pub use stream::{ChatMessage, StreamPhase};
pub use workspace::ResultFile;
