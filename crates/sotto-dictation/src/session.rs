//! The single mutable session record and its background-task guards.

use std::time::Instant;

use tokio_util::sync::CancellationToken;

use sotto_core::types::SessionId;

use crate::state::DictationState;

/// Cancellation guard for a background task tied to the recording phase.
///
/// Cancelling is idempotent and never blocks. Dropping the guard cancels as
/// well, so a task can never outlive the slot that owns it.
#[derive(Debug)]
pub(crate) struct TaskHandle {
    token: CancellationToken,
}

impl TaskHandle {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// The authoritative record of the current dictation lifecycle.
///
/// Owned exclusively by the orchestrator behind a single mutex. Background
/// tasks never mutate it directly; they go through the orchestrator's
/// guarded publish helpers.
#[derive(Debug)]
pub(crate) struct SessionState {
    /// Identity of the current (or most recent) dictation attempt.
    pub(crate) id: SessionId,
    pub(crate) state: DictationState,
    /// Provisional transcript; meaningful only during Recording/Processing.
    pub(crate) partial_text: String,
    /// Set on entering Recording, cleared on leaving it.
    pub(crate) started_at: Option<Instant>,
    /// Streaming-loop guard; `Some` only while Recording with a streaming
    /// engine.
    pub(crate) streaming: Option<TaskHandle>,
    /// Silence-watcher guard; `Some` only while Recording in toggle mode.
    pub(crate) silence: Option<TaskHandle>,
    /// Duration-timer guard; `Some` only while Recording.
    pub(crate) timer: Option<TaskHandle>,
    /// Bumped on every state transition. Deferred actions (error auto-clear,
    /// final-transcription completion) compare against it before touching
    /// state.
    pub(crate) generation: u64,
}

impl SessionState {
    pub(crate) fn new() -> Self {
        Self {
            id: SessionId::new(),
            state: DictationState::Idle,
            partial_text: String::new(),
            started_at: None,
            streaming: None,
            silence: None,
            timer: None,
            generation: 0,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
