//! Session Manager
//!
//! Owns the backend-issued session id. Every request that touches the session
//! passes its response through [`SessionManager::apply_header`], so a server
//! rotating the id is picked up no matter which call observed it.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::types::{SessionFailure, SessionId, Validation};
use crate::api::Backend;
use crate::error::{Error, Result};
use crate::events::{ClientEvent, EventSink};

/// Holds and maintains the current session id
#[derive(Clone)]
pub struct SessionManager {
    backend: Arc<dyn Backend>,
    id: Arc<RwLock<SessionId>>,
    events: EventSink,
}

impl SessionManager {
    pub fn new(backend: Arc<dyn Backend>, events: EventSink) -> Self {
        Self {
            backend,
            id: Arc::new(RwLock::new(SessionId::new())),
            events,
        }
    }

    /// Start from a previously issued id (still validated before use)
    pub fn with_initial_id(self, id: impl Into<SessionId>) -> Self {
        self.set_initial_id(id);
        self
    }

    /// Seed the held id without publishing a change
    pub fn set_initial_id(&self, id: impl Into<SessionId>) {
        *self.id.write() = id.into();
    }

    /// Current id; empty when no session has been issued yet
    pub fn current(&self) -> SessionId {
        self.id.read().clone()
    }

    pub fn has_session(&self) -> bool {
        !self.id.read().is_empty()
    }

    /// Header-rotation rule: adopt a header id that differs from the held one.
    ///
    /// Returns true when the held id was replaced.
    pub fn apply_header(&self, header: Option<&str>) -> bool {
        let Some(new_id) = header.filter(|h| !h.is_empty()) else {
            return false;
        };

        {
            let mut id = self.id.write();
            if *id == new_id {
                return false;
            }
            info!("Updating session ID from response header: {:?} -> {}", *id, new_id);
            *id = new_id.to_string();
        }

        self.events.emit(ClientEvent::SessionChanged {
            session_id: new_id.to_string(),
        });
        true
    }

    fn set(&self, new_id: SessionId) {
        *self.id.write() = new_id.clone();
        self.events.emit(ClientEvent::SessionChanged { session_id: new_id });
    }

    /// Probe the backend to see whether the held id is still known
    pub async fn validate_session(&self) -> Validation {
        let id = self.current();
        if id.is_empty() {
            return Validation::Missing;
        }

        debug!("Validating session ID: {}", id);
        match self.backend.check_session(&id).await {
            Ok(reply) => {
                self.apply_header(reply.session_header.as_deref());
                Validation::Valid
            }
            Err(e) if e.is_status() => {
                info!("Session ID invalid: {}", e);
                Validation::Rejected
            }
            Err(e) => {
                warn!("Error validating session ID: {}", e);
                Validation::Unreachable
            }
        }
    }

    /// Ask the backend for a fresh session.
    ///
    /// The id comes from the session header, or from the body's `session_id`
    /// when the header is absent.
    pub async fn create_new_session(&self) -> Result<SessionId> {
        info!("Creating new session");
        let reply = self
            .backend
            .create_session()
            .await
            .map_err(|e| Error::SessionCreation(e.to_string()))?;

        if let Some(header) = reply.session_header.as_deref().filter(|h| !h.is_empty()) {
            if !self.apply_header(Some(header)) {
                debug!("Backend reissued the held session ID");
            }
            return Ok(self.current());
        }

        match reply.body {
            Some(id) if !id.is_empty() => {
                info!("Getting session ID from response body: {}", id);
                self.set(id.clone());
                Ok(id)
            }
            _ => Err(Error::SessionCreation(
                "response carried no session id".to_string(),
            )),
        }
    }

    /// Single entry point before any use of the session id
    pub async fn ensure_valid_session(&self) -> Result<SessionId> {
        let validation = self.validate_session().await;
        if validation.is_valid() {
            return Ok(self.current());
        }

        match self.create_new_session().await {
            Ok(id) => Ok(id),
            Err(e) => {
                let failure = SessionFailure::after(validation);
                warn!("Could not establish a session ({:?}): {}", failure, e);
                Err(failure.into_error(e))
            }
        }
    }

    /// Companion request issued after a push channel opens: `GET /session`
    /// exists only to observe a rotated session header.
    pub async fn refresh_from_server(&self) -> Result<()> {
        let id = self.current();
        let id = (!id.is_empty()).then_some(id.as_str());
        let reply = self.backend.session_info(id).await?;
        self.apply_header(reply.session_header.as_deref());
        Ok(())
    }

    /// Fire-and-forget [`refresh_from_server`](Self::refresh_from_server)
    pub fn spawn_refresh(&self) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            if let Err(e) = manager.refresh_from_server().await {
                warn!("Failed to get session info: {}", e);
            }
        })
    }
}
