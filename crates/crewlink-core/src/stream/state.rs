//! Per-query stream state machine
//!
//! `Idle -> Connecting -> Streaming -> {Completed | Errored | TimedOut}`.
//! Every transition names the query generation it belongs to and is refused
//! when that generation is no longer current or has already terminated, so a
//! late timer or a superseded stream can never touch the transcript.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamPhase {
    #[default]
    Idle,
    Connecting,
    Streaming,
    Completed,
    Errored,
    TimedOut,
}

impl StreamPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamPhase::Completed | StreamPhase::Errored | StreamPhase::TimedOut
        )
    }

    /// Connecting or streaming
    pub fn is_live(&self) -> bool {
        matches!(self, StreamPhase::Connecting | StreamPhase::Streaming)
    }
}

/// Tracks the phase of the current query generation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamTracker {
    generation: u64,
    phase: StreamPhase,
}

impl StreamTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    /// Phase of `generation`, or `None` once it has been superseded
    pub fn phase_of(&self, generation: u64) -> Option<StreamPhase> {
        (generation == self.generation).then_some(self.phase)
    }

    /// `Idle -> Connecting` for a fresh generation; any previous query is
    /// abandoned.
    pub fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.phase = StreamPhase::Connecting;
        self.generation
    }

    /// `Connecting -> Streaming`
    pub fn opened(&mut self, generation: u64) -> bool {
        if generation == self.generation && self.phase == StreamPhase::Connecting {
            self.phase = StreamPhase::Streaming;
            true
        } else {
            false
        }
    }

    /// True while `generation` is streaming and may receive fragments
    pub fn accepts_events(&self, generation: u64) -> bool {
        generation == self.generation && self.phase == StreamPhase::Streaming
    }

    /// Move a live generation to a terminal phase. Returns false when the
    /// generation is stale or already finished.
    pub fn finish(&mut self, generation: u64, terminal: StreamPhase) -> bool {
        debug_assert!(terminal.is_terminal());
        if generation == self.generation && self.phase.is_live() {
            self.phase = terminal;
            true
        } else {
            false
        }
    }

    /// Back to `Idle`; also invalidates the current generation
    pub fn reset(&mut self) {
        self.generation += 1;
        self.phase = StreamPhase::Idle;
    }
}
