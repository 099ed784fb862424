//! Stream aggregation
//!
//! Turns push events into a display-ready transcript and tracks the phase of
//! the query that produced them.

mod event;
mod messages;
mod state;

pub use event::{ParsedEvent, derive_sender, parse_event};
pub use messages::{
    CONNECTION_ERROR_TEXT, ChatMessage, Merge, MessageLog, SYSTEM_SENDER, SYSTEM_TEAM,
    TIMEOUT_TEXT, current_time,
};
pub use state::{StreamPhase, StreamTracker};
