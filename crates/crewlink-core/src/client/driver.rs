//! Per-query stream driver
//!
//! One task per query generation. It opens the push stream, feeds fragments
//! into the transcript and enforces the response deadline. Every state change
//! goes through the generation-guarded [`StreamTracker`] transitions, so a
//! driver that lost a race with a newer query or a clear touches nothing.
//!
//! [`StreamTracker`]: crate::stream::StreamTracker

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, info, warn};

use super::Inner;
use crate::api::{PushEvent, QueryRequest};
use crate::error::Error;
use crate::events::ClientEvent;
use crate::status::Status;
use crate::stream::{CONNECTION_ERROR_TEXT, Merge, StreamPhase, TIMEOUT_TEXT, current_time, parse_event};

pub(super) async fn drive(inner: Arc<Inner>, generation: u64, request: QueryRequest) {
    let deadline = tokio::time::sleep(inner.stream_timeout);
    tokio::pin!(deadline);

    let opened = tokio::select! {
        result = inner.backend.open_query(&request) => result,
        _ = &mut deadline => {
            time_out(&inner, generation);
            return;
        }
    };

    let mut stream = match opened {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Failed to open query stream: {}", e);
            fail(&inner, generation, &e);
            return;
        }
    };

    inner.session.apply_header(stream.session_header.as_deref());
    if !inner.state.lock().stream.opened(generation) {
        debug!("Query {} superseded while connecting", generation);
        return;
    }
    // Keep the held id in step with the server while the answer streams
    inner.session.spawn_refresh();

    loop {
        tokio::select! {
            event = stream.events.next() => match event {
                Some(Ok(PushEvent::Message(data))) => {
                    if !apply_push(&inner, generation, &data) {
                        return;
                    }
                }
                Some(Ok(PushEvent::End(_))) => {
                    complete(&inner, generation).await;
                    return;
                }
                Some(Err(e)) => {
                    warn!("Query stream error: {}", e);
                    fail(&inner, generation, &e);
                    return;
                }
                None => {
                    let e = Error::StreamTransport("stream closed before end event".to_string());
                    warn!("{}", e);
                    fail(&inner, generation, &e);
                    return;
                }
            },
            _ = &mut deadline => {
                time_out(&inner, generation);
                return;
            }
        }
    }
}

/// Merge one message event into the transcript. Returns false once the
/// generation no longer accepts events.
fn apply_push(inner: &Inner, generation: u64, data: &str) -> bool {
    let mut state = inner.state.lock();
    if !state.stream.accepts_events(generation) {
        return false;
    }

    let timestamp = current_time();
    match parse_event(data) {
        Ok(event) => {
            let delta = event.fragment.clone();
            match state.messages.apply(event, timestamp.clone()) {
                Merge::Appended(index) => inner.emit_appended(&state, index),
                Merge::Extended(index) => inner.events.emit(ClientEvent::MessageExtended {
                    index,
                    delta,
                    timestamp,
                }),
            }
        }
        Err(e) => {
            warn!("{}", Error::StreamParse(e.clone()));
            let index = state
                .messages
                .push_system(format!("Failed to parse message: {}", e), timestamp);
            inner.emit_appended(&state, index);
        }
    }
    true
}

async fn complete(inner: &Inner, generation: u64) {
    {
        let mut state = inner.state.lock();
        if !state.stream.finish(generation, StreamPhase::Completed) {
            return;
        }
        state.busy = false;
        state.status = Status::Completed;
        inner.emit_busy(&state);
        inner.emit_status(&state);
        inner.emit_finished(&state, generation);
    }
    info!("Query {} completed", generation);
    inner.refresh_workspace_files().await;
}

fn fail(inner: &Inner, generation: u64, error: &Error) {
    let mut state = inner.state.lock();
    if !state.stream.finish(generation, StreamPhase::Errored) {
        return;
    }
    state.busy = false;
    state.status = Status::Error;
    state.last_error = Some(error.to_string());
    if state.messages.is_empty() {
        let index = state.messages.push_system(CONNECTION_ERROR_TEXT, current_time());
        inner.emit_appended(&state, index);
    }
    inner.emit_busy(&state);
    inner.emit_status(&state);
    inner.emit_finished(&state, generation);
}

fn time_out(inner: &Inner, generation: u64) {
    let mut state = inner.state.lock();
    if !state.stream.finish(generation, StreamPhase::TimedOut) {
        return;
    }
    warn!(
        "Query {} timed out after {}s",
        generation,
        inner.stream_timeout.as_secs()
    );
    state.busy = false;
    state.status = Status::Timeout;
    let index = state.messages.push_system(TIMEOUT_TEXT, current_time());
    inner.emit_appended(&state, index);
    inner.emit_busy(&state);
    inner.emit_status(&state);
    inner.emit_finished(&state, generation);
}
