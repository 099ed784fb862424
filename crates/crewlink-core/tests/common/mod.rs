//! In-memory backend shared by the client tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream;

use crewlink_core::api::{Backend, FileListing, PushEvent, QueryRequest, QueryStream, Reply};
use crewlink_core::{Config, Error, Result};

pub const FAKE_SESSION: &str = "fake-session";

/// How one opened query stream behaves
pub enum Script {
    /// Yield the events, then close
    Events(Vec<PushEvent>),
    /// Yield the events, then stay open forever
    EventsThenHang(Vec<PushEvent>),
    /// Yield the events, then a transport error; the channel stays open
    EventsThenError(Vec<PushEvent>, String),
}

pub fn fragment(namespace: &str, text: &str) -> PushEvent {
    PushEvent::Message(
        serde_json::json!({
            "response": text,
            "metadata": { "checkpoint_ns": namespace },
        })
        .to_string(),
    )
}

pub fn end() -> PushEvent {
    PushEvent::End(String::new())
}

#[derive(Default)]
pub struct FakeBackend {
    pub files: Mutex<Vec<String>>,
    pub scripts: Mutex<VecDeque<Script>>,
    pub requests: Mutex<Vec<QueryRequest>>,
    pub refuse_sessions: bool,
    pub downloads: AtomicUsize,
}

impl FakeBackend {
    pub fn with_scripts(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            ..Self::default()
        }
    }

    pub fn set_files(&self, files: &[&str]) {
        *self.files.lock().unwrap() = files.iter().map(|f| f.to_string()).collect();
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn list_files(&self, session_id: &str) -> Result<Reply<FileListing>> {
        if session_id != FAKE_SESSION {
            return Err(Error::Status {
                status: 404,
                path: "/files".to_string(),
            });
        }
        Ok(Reply::new(FileListing {
            files: self.files.lock().unwrap().clone(),
            session_id: None,
        }))
    }

    async fn create_session(&self) -> Result<Reply<Option<String>>> {
        if self.refuse_sessions {
            return Err(Error::Status {
                status: 503,
                path: "/session".to_string(),
            });
        }
        Ok(Reply::new(None).with_session_header(FAKE_SESSION))
    }

    async fn session_info(&self, _session_id: Option<&str>) -> Result<Reply<Option<String>>> {
        Ok(Reply::new(Some(FAKE_SESSION.to_string())))
    }

    async fn open_query(&self, request: &QueryRequest) -> Result<QueryStream> {
        self.requests.lock().unwrap().push(request.clone());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Script::Events(Vec::new()));

        let events = match script {
            Script::Events(events) => stream::iter(events.into_iter().map(Ok)).boxed(),
            Script::EventsThenHang(events) => stream::iter(events.into_iter().map(Ok))
                .chain(stream::pending())
                .boxed(),
            Script::EventsThenError(events, reason) => stream::iter(
                events
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(Error::StreamTransport(reason)))),
            )
            .chain(stream::pending())
            .boxed(),
        };
        Ok(QueryStream {
            session_header: None,
            events,
        })
    }

    async fn download(&self, _session_id: &str, file_path: &str) -> Result<Reply<Bytes>> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        Ok(Reply::new(Bytes::from(format!("contents of {}", file_path))))
    }
}

/// Config with a short query deadline
pub fn test_config(stream_timeout_secs: u64) -> Config {
    let mut config = Config::default();
    config.query.stream_timeout_secs = stream_timeout_secs;
    config
}
