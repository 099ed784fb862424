//! Chat client
//!
//! [`ChatClient`] is the single context object front ends talk to. It owns
//! the session manager, the transcript, the workspace listing and the live
//! query stream, and publishes every change as a [`ClientEvent`].

mod driver;
mod state;

pub use state::ChatSnapshot;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

use crate::api::{Backend, HttpBackend, QueryRequest};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::{ClientEvent, EventSink};
use crate::session::{SessionFailure, SessionManager};
use crate::status::Status;
use crate::stream::{CONNECTION_ERROR_TEXT, StreamPhase, current_time};
use crate::workspace::{ResultFile, download_target};
use state::ChatState;

pub(crate) struct Inner {
    backend: Arc<dyn Backend>,
    session: SessionManager,
    events: EventSink,
    state: Mutex<ChatState>,
    driver: Mutex<Option<AbortHandle>>,
    stream_timeout: Duration,
}

/// Session-aware, streaming chat client for the agent-team backend
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<Inner>,
}

impl ChatClient {
    pub fn new(backend: Arc<dyn Backend>, config: &Config) -> Self {
        let events = EventSink::new();
        let session = SessionManager::new(backend.clone(), events.clone());
        let state = ChatState {
            recursion_limit: config.query.recursion_limit,
            ..ChatState::default()
        };

        Self {
            inner: Arc::new(Inner {
                backend,
                session,
                events,
                state: Mutex::new(state),
                driver: Mutex::new(None),
                stream_timeout: config.query.stream_timeout(),
            }),
        }
    }

    /// Client talking HTTP to `config.api.base_url`
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = HttpBackend::from_config(&config.api)?;
        Ok(Self::new(Arc::new(backend), config))
    }

    /// Seed the session id (it is still validated before use)
    pub fn with_session_id(self, id: impl Into<String>) -> Self {
        let id = id.into();
        if !id.is_empty() {
            self.inner.session.set_initial_id(id);
        }
        self
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ClientEvent> {
        self.inner.events.subscribe()
    }

    pub fn session(&self) -> &SessionManager {
        &self.inner.session
    }

    pub fn session_id(&self) -> String {
        self.inner.session.current()
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        let session_id = self.inner.session.current();
        self.inner.state.lock().snapshot(session_id)
    }

    pub fn set_recursion_limit(&self, limit: u32) {
        self.inner.state.lock().recursion_limit = limit.max(1);
    }

    /// Establish a session and load the workspace listing.
    ///
    /// On failure the status becomes `SessionInitError` and a system message
    /// explains it; returns whether a session is available.
    pub async fn initialize(&self) -> bool {
        match self.inner.session.ensure_valid_session().await {
            Ok(id) => {
                info!("Session ready: {}", id);
                self.inner.refresh_workspace_files().await;
                true
            }
            Err(e) => {
                warn!("Failed to initialize session: {}", e);
                let mut state = self.inner.state.lock();
                state.status = Status::SessionInitError;
                let index = state.messages.push_system(CONNECTION_ERROR_TEXT, current_time());
                self.inner.emit_status(&state);
                self.inner.emit_appended(&state, index);
                false
            }
        }
    }

    /// Submit a query and start streaming its response.
    ///
    /// The session is ensured before any stream opens. A previous live
    /// stream is cancelled. The returned handle resolves when the query
    /// reaches a terminal phase.
    pub async fn submit_query(&self, query: &str) -> Result<QueryHandle> {
        if query.trim().is_empty() {
            return Err(Error::EmptyQuery);
        }

        self.inner.abort_driver();
        let (generation, recursion_limit) = {
            let mut state = self.inner.state.lock();
            let generation = state.stream.begin();
            let timestamp = current_time();
            state.messages.clear();
            state.results.clear();
            state.user_query = Some(query.to_string());
            state.user_query_time = Some(timestamp.clone());
            state.busy = true;
            state.status = Status::Processing;
            state.last_error = None;

            self.inner.events.emit(ClientEvent::ResponseCleared);
            self.inner.events.emit(ClientEvent::QuerySubmitted {
                query: query.to_string(),
                timestamp,
            });
            self.inner.emit_busy(&state);
            self.inner.emit_status(&state);
            (generation, state.recursion_limit)
        };

        let session_id = match self.inner.session.ensure_valid_session().await {
            Ok(id) => id,
            Err(e) => {
                self.inner.session_failed(generation, &e);
                return Ok(QueryHandle::failed(self.inner.clone(), generation, e));
            }
        };

        {
            let mut state = self.inner.state.lock();
            if state.stream.phase_of(generation) != Some(StreamPhase::Connecting) {
                debug!("Query {} superseded before its stream opened", generation);
                return Ok(QueryHandle::detached(self.inner.clone(), generation));
            }
            state.workspace.clear_selection_if_empty();
        }

        let request = QueryRequest {
            query: query.to_string(),
            recursion_limit,
            session_id: Some(session_id),
        };
        let task = tokio::spawn(driver::drive(self.inner.clone(), generation, request));
        *self.inner.driver.lock() = Some(task.abort_handle());

        Ok(QueryHandle {
            inner: self.inner.clone(),
            generation,
            task: Some(task),
            session_error: None,
        })
    }

    /// Discard the transcript, the query echo and result files.
    ///
    /// The session and the workspace listing are kept; a live stream is
    /// cancelled.
    pub fn clear_response(&self) {
        self.inner.abort_driver();
        let mut state = self.inner.state.lock();
        state.stream.reset();
        state.messages.clear();
        state.user_query = None;
        state.user_query_time = None;
        state.results.clear();
        state.status = Status::Waiting;
        state.busy = false;
        state.last_error = None;

        self.inner.events.emit(ClientEvent::ResponseCleared);
        self.inner.emit_busy(&state);
        self.inner.emit_status(&state);
    }

    /// Reload the workspace listing; failures are logged and leave the
    /// previous listing in place. Returns whether a new listing was applied.
    pub async fn refresh_workspace_files(&self) -> bool {
        self.inner.refresh_workspace_files().await
    }

    pub fn select_workspace_file(&self, index: usize) -> Result<()> {
        let mut state = self.inner.state.lock();
        state.workspace.select(index)?;
        self.inner.emit_workspace(&state);
        Ok(())
    }

    pub fn select_result_file(&self, index: usize) -> Result<()> {
        self.inner.state.lock().results.select(index)
    }

    /// Replace the inline result files; clears their selection
    pub fn set_result_files(&self, files: Vec<ResultFile>) {
        self.inner.state.lock().results.replace(files);
    }

    /// Download the selected workspace file into `dest_dir`
    pub async fn download_workspace_file(&self, dest_dir: &Path) -> Result<PathBuf> {
        let path = self
            .inner
            .state
            .lock()
            .workspace
            .selected_path()
            .map(str::to_string)
            .ok_or_else(|| Error::NoSelection("no workspace file selected".to_string()))?;
        self.download_workspace_path(&path, dest_dir).await
    }

    /// Download `remote_path` from the session workspace into `dest_dir`.
    ///
    /// The session is re-validated first. An invalid session is replaced and
    /// the listing refreshed, and the caller is asked to retry. Paths missing
    /// from the last listing are reported without contacting the backend.
    pub async fn download_workspace_path(&self, remote_path: &str, dest_dir: &Path) -> Result<PathBuf> {
        let session = &self.inner.session;
        if !session.validate_session().await.is_valid() {
            if let Err(e) = session.create_new_session().await {
                warn!("Session expired and cannot be recreated: {}", e);
                return Err(Error::DownloadSessionExpired { recovered: false });
            }
            self.inner.refresh_workspace_files().await;
            return Err(Error::DownloadSessionExpired { recovered: true });
        }

        if !self.inner.state.lock().workspace.contains(remote_path) {
            return Err(Error::DownloadFileMissing(remote_path.to_string()));
        }

        let target = download_target(dest_dir, remote_path)?;
        let reply = self
            .inner
            .backend
            .download(&session.current(), remote_path)
            .await?;
        session.apply_header(reply.session_header.as_deref());

        tokio::fs::create_dir_all(dest_dir).await?;
        tokio::fs::write(&target, &reply.body).await?;
        info!("Downloaded {} to {}", remote_path, target.display());
        Ok(target)
    }

    /// Write the selected result file into `dest_dir`
    pub async fn save_result(&self, dest_dir: &Path) -> Result<PathBuf> {
        let file = self
            .inner
            .state
            .lock()
            .results
            .selected_file()
            .cloned()
            .ok_or_else(|| Error::NoSelection("no result file selected".to_string()))?;

        let target = download_target(dest_dir, &file.name)?;
        tokio::fs::create_dir_all(dest_dir).await?;
        tokio::fs::write(&target, file.content.as_bytes()).await?;
        Ok(target)
    }
}

impl Inner {
    fn abort_driver(&self) {
        if let Some(handle) = self.driver.lock().take() {
            handle.abort();
        }
    }

    fn emit_status(&self, state: &ChatState) {
        self.events.emit(ClientEvent::StatusChanged { status: state.status });
    }

    fn emit_busy(&self, state: &ChatState) {
        self.events.emit(ClientEvent::BusyChanged { busy: state.busy });
    }

    fn emit_appended(&self, state: &ChatState, index: usize) {
        if let Some(message) = state.messages.get(index) {
            self.events.emit(ClientEvent::MessageAppended {
                index,
                message: message.clone(),
            });
        }
    }

    fn emit_workspace(&self, state: &ChatState) {
        self.events.emit(ClientEvent::WorkspaceFilesChanged {
            files: state.workspace.files().to_vec(),
            selected: state.workspace.selected(),
        });
    }

    fn emit_finished(&self, state: &ChatState, generation: u64) {
        self.events.emit(ClientEvent::QueryFinished {
            generation,
            phase: state.stream.phase(),
        });
    }

    /// `Connecting -> Errored` because no session could be established
    fn session_failed(&self, generation: u64, error: &Error) {
        let mut state = self.state.lock();
        if !state.stream.finish(generation, StreamPhase::Errored) {
            return;
        }
        let failure = SessionFailure::from_error(error);
        state.busy = false;
        state.status = Status::SessionError;
        state.last_error = Some(error.to_string());
        let index = state.messages.push_system(failure.message(), current_time());

        self.emit_busy(&state);
        self.emit_status(&state);
        self.emit_appended(&state, index);
        self.emit_finished(&state, generation);
    }

    async fn refresh_workspace_files(&self) -> bool {
        let id = self.session.current();
        if id.is_empty() {
            return false;
        }

        match self.backend.list_files(&id).await {
            Ok(reply) => {
                self.session.apply_header(reply.session_header.as_deref());
                let mut state = self.state.lock();
                state.workspace.replace(reply.body.files);
                self.emit_workspace(&state);
                true
            }
            Err(e) => {
                warn!("Failed to get workspace file list: {}", e);
                false
            }
        }
    }
}

/// Handle to a submitted query
pub struct QueryHandle {
    inner: Arc<Inner>,
    generation: u64,
    task: Option<JoinHandle<()>>,
    session_error: Option<Error>,
}

impl QueryHandle {
    fn failed(inner: Arc<Inner>, generation: u64, error: Error) -> Self {
        Self {
            inner,
            generation,
            task: None,
            session_error: Some(error),
        }
    }

    fn detached(inner: Arc<Inner>, generation: u64) -> Self {
        Self {
            inner,
            generation,
            task: None,
            session_error: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for the stream to stop. Returns the final phase, or `None` when
    /// the query was superseded or cleared.
    pub async fn wait(mut self) -> Option<StreamPhase> {
        self.join().await;
        self.inner.state.lock().stream.phase_of(self.generation)
    }

    /// Wait and convert the outcome into a `Result`
    pub async fn finish(mut self) -> Result<()> {
        if let Some(error) = self.session_error.take() {
            return Err(error);
        }
        self.join().await;

        let state = self.inner.state.lock();
        match state.stream.phase_of(self.generation) {
            Some(StreamPhase::TimedOut) => Err(Error::StreamTimeout(self.inner.stream_timeout.as_secs())),
            Some(StreamPhase::Errored) => Err(Error::StreamTransport(
                state
                    .last_error
                    .clone()
                    .unwrap_or_else(|| "stream failed".to_string()),
            )),
            _ => Ok(()),
        }
    }

    async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!("Query task failed: {}", e);
                }
            }
        }
    }
}
