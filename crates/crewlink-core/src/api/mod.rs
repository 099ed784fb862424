//! Backend transport
//!
//! The agent-team backend is reached through the [`Backend`] trait so the
//! client logic can run against the real HTTP service or an in-memory double.

mod http;

pub use http::HttpBackend;

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Response header carrying the (possibly rotated) session id
pub const SESSION_HEADER: &str = "X-Session-ID";

/// Name of the push event that ends a query stream
pub const END_EVENT: &str = "end";

/// A backend response together with the session header it carried
#[derive(Debug, Clone)]
pub struct Reply<T> {
    pub session_header: Option<String>,
    pub body: T,
}

impl<T> Reply<T> {
    pub fn new(body: T) -> Self {
        Self {
            session_header: None,
            body,
        }
    }

    pub fn with_session_header(mut self, id: impl Into<String>) -> Self {
        self.session_header = Some(id.into());
        self
    }
}

/// Body of `GET /files`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileListing {
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Parameters of a streamed query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub query: String,
    pub recursion_limit: u32,
    pub session_id: Option<String>,
}

/// One event read from the push channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// Default (unnamed) event carrying a JSON fragment
    Message(String),
    /// Named `end` event; the stream is complete
    End(String),
}

pub type PushStream = Pin<Box<dyn Stream<Item = Result<PushEvent>> + Send>>;

/// An opened push channel
pub struct QueryStream {
    pub session_header: Option<String>,
    pub events: PushStream,
}

/// Operations the client needs from the agent-team backend
#[async_trait]
pub trait Backend: Send + Sync {
    /// `GET /files?session_id=`
    async fn list_files(&self, session_id: &str) -> Result<Reply<FileListing>>;

    /// Session-validity check against `GET /files`. Only the status counts;
    /// the body is not decoded.
    async fn check_session(&self, session_id: &str) -> Result<Reply<()>> {
        let reply = self.list_files(session_id).await?;
        Ok(Reply {
            session_header: reply.session_header,
            body: (),
        })
    }

    /// `POST /session`; the body's `session_id` is the fallback id source
    async fn create_session(&self) -> Result<Reply<Option<String>>>;

    /// `GET /session[?session_id=]`
    async fn session_info(&self, session_id: Option<&str>) -> Result<Reply<Option<String>>>;

    /// `GET /query?...`, resolving once the push channel is open
    async fn open_query(&self, request: &QueryRequest) -> Result<QueryStream>;

    /// `GET /download?session_id=&file_path=`
    async fn download(&self, session_id: &str, file_path: &str) -> Result<Reply<Bytes>>;
}
