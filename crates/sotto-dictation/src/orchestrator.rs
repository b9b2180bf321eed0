//! The dictation orchestrator: state machine and sole owner of the session.
//!
//! Only the orchestrator mutates the session record. The streaming loop,
//! silence watcher, and duration timer are cancellable background tasks that
//! publish through guards which re-check the cancellation token and the
//! session state under the session mutex, so cancellation and state changes
//! are atomic with respect to every publish. An async operations mutex
//! serializes the start and stop flows across their suspension points.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

use sotto_audio::AudioSource;
use sotto_core::events::DictationEvent;
use sotto_core::types::{samples_duration_secs, SessionId, Timestamp, TranscriptionTask};
use sotto_transcribe::{TranscriptionEngine, TranscriptionRequest};

use crate::hotkey::{HotkeyEvent, HotkeyMode, HotkeySignal};
use crate::insert::TextSink;
use crate::session::{SessionState, TaskHandle};
use crate::state::DictationState;
use crate::{silence, streaming, timer};

const SESSION_POISONED: &str = "session state poisoned";

/// Fixed timing and threshold policy for the dictation engine.
///
/// These are engine policy, not user preferences. Tests shrink the durations
/// to keep scenarios fast.
#[derive(Debug, Clone)]
pub struct Tuning {
    /// Sample rate the audio source captures at.
    pub sample_rate: u32,
    /// Captures shorter than this are abandoned without transcription.
    pub min_audio_secs: f32,
    /// Minimum buffered audio before a streaming attempt.
    pub min_stream_secs: f32,
    /// Delay before the first streaming attempt.
    pub stream_initial_delay: Duration,
    /// Pause between streaming attempts.
    pub stream_interval: Duration,
    /// How long an error stays visible before auto-clearing.
    pub error_display: Duration,
    /// Capture gain applied when whisper mode is on.
    pub whisper_gain: f32,
    /// Period of the recording-duration sampler.
    pub timer_period: Duration,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            min_audio_secs: 0.3,
            min_stream_secs: 0.5,
            stream_initial_delay: Duration::from_millis(1500),
            stream_interval: Duration::from_millis(1500),
            error_display: Duration::from_secs(3),
            whisper_gain: 4.0,
            timer_period: Duration::from_millis(100),
        }
    }
}

/// Per-orchestrator dictation preferences.
#[derive(Debug, Clone, Default)]
pub struct DictationOptions {
    /// Language hint for the transcription engine. `None` auto-detects.
    pub language: Option<String>,
    /// Transcribe or translate.
    pub task: TranscriptionTask,
    /// Initial whisper-mode setting; toggleable at runtime.
    pub whisper_mode: bool,
    pub tuning: Tuning,
}

pub(crate) struct Inner<A, T, S, H> {
    pub(crate) audio: A,
    pub(crate) engine: T,
    pub(crate) sink: S,
    pub(crate) hotkey: H,
    pub(crate) options: DictationOptions,
    /// Serializes the start and stop flows across their awaits.
    ops: tokio::sync::Mutex<()>,
    pub(crate) session: Mutex<SessionState>,
    state_tx: watch::Sender<DictationState>,
    partial_tx: watch::Sender<String>,
    pub(crate) duration_tx: watch::Sender<f32>,
    streaming_tx: watch::Sender<bool>,
    events_tx: broadcast::Sender<DictationEvent>,
    whisper_mode: AtomicBool,
    /// Keeper receivers so `duration_tx`/`streaming_tx` stay open and their
    /// stored value updates even when no external subscriber is attached;
    /// `recording_duration()` and `is_streaming()` read that value directly.
    _duration_rx: watch::Receiver<f32>,
    _streaming_rx: watch::Receiver<bool>,
}

/// Orchestrates the dictation flow: recording, transcription, insertion.
///
/// Built by explicit dependency injection; the orchestrator is the only
/// component that drives the audio source, the transcription engine, and the
/// text sink. Cloning shares the underlying session.
pub struct Orchestrator<A, T, S, H> {
    inner: Arc<Inner<A, T, S, H>>,
}

impl<A, T, S, H> Clone for Orchestrator<A, T, S, H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, T, S, H> Orchestrator<A, T, S, H>
where
    A: AudioSource + 'static,
    T: TranscriptionEngine + 'static,
    S: TextSink + 'static,
    H: HotkeySignal + 'static,
{
    pub fn new(audio: A, engine: T, sink: S, hotkey: H, options: DictationOptions) -> Self {
        let (state_tx, _) = watch::channel(DictationState::Idle);
        let (partial_tx, _) = watch::channel(String::new());
        let (duration_tx, _duration_rx) = watch::channel(0.0);
        let (streaming_tx, _streaming_rx) = watch::channel(false);
        let (events_tx, _) = broadcast::channel(32);
        let whisper_mode = AtomicBool::new(options.whisper_mode);

        Self {
            inner: Arc::new(Inner {
                audio,
                engine,
                sink,
                hotkey,
                options,
                ops: tokio::sync::Mutex::new(()),
                session: Mutex::new(SessionState::new()),
                state_tx,
                partial_tx,
                duration_tx,
                streaming_tx,
                events_tx,
                whisper_mode,
                _duration_rx,
                _streaming_rx,
            }),
        }
    }

    // -------------------------------------------------------------------------
    // Control
    // -------------------------------------------------------------------------

    /// Start a dictation session. A no-op unless the state is `Idle`;
    /// precondition and capture failures surface through the `Error` state.
    pub async fn start_dictation(&self) {
        start_flow(Arc::clone(&self.inner)).await;
    }

    /// Stop the current session and run the final transcription. Idempotent:
    /// a stop request outside `Recording` does nothing.
    pub async fn stop_dictation(&self) {
        stop_flow(Arc::clone(&self.inner)).await;
    }

    /// Consume hotkey edges and map them onto start/stop requests.
    pub fn drive(
        &self,
        mut events: mpsc::UnboundedReceiver<HotkeyEvent>,
    ) -> tokio::task::JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    HotkeyEvent::Start => start_flow(Arc::clone(&inner)).await,
                    HotkeyEvent::Stop => stop_flow(Arc::clone(&inner)).await,
                }
            }
            tracing::debug!("Hotkey event channel closed");
        })
    }

    // -------------------------------------------------------------------------
    // Observables
    // -------------------------------------------------------------------------

    pub fn state(&self) -> DictationState {
        self.inner.state()
    }

    pub fn watch_state(&self) -> watch::Receiver<DictationState> {
        self.inner.state_tx.subscribe()
    }

    pub fn partial_text(&self) -> String {
        self.inner
            .session
            .lock()
            .expect(SESSION_POISONED)
            .partial_text
            .clone()
    }

    pub fn watch_partial_text(&self) -> watch::Receiver<String> {
        self.inner.partial_tx.subscribe()
    }

    /// Elapsed seconds of the current recording, zero outside `Recording`.
    pub fn recording_duration(&self) -> f32 {
        *self.inner.duration_tx.borrow()
    }

    pub fn watch_recording_duration(&self) -> watch::Receiver<f32> {
        self.inner.duration_tx.subscribe()
    }

    pub fn is_streaming(&self) -> bool {
        *self.inner.streaming_tx.borrow()
    }

    pub fn watch_is_streaming(&self) -> watch::Receiver<bool> {
        self.inner.streaming_tx.subscribe()
    }

    /// Input level passthrough from the audio source.
    pub fn audio_level(&self) -> watch::Receiver<f32> {
        self.inner.audio.audio_level()
    }

    pub fn hotkey_mode(&self) -> HotkeyMode {
        self.inner.hotkey.mode()
    }

    pub fn whisper_mode(&self) -> bool {
        self.inner.whisper_mode.load(Ordering::Relaxed)
    }

    /// Toggle the gain boost for quiet speech. Takes effect at the next start.
    pub fn set_whisper_mode(&self, enabled: bool) {
        self.inner.whisper_mode.store(enabled, Ordering::Relaxed);
    }

    pub fn can_dictate(&self) -> bool {
        self.inner.engine.is_ready()
    }

    pub fn needs_microphone_permission(&self) -> bool {
        !self.inner.audio.has_microphone_permission()
    }

    pub fn needs_accessibility_permission(&self) -> bool {
        !self.inner.sink.is_accessibility_granted()
    }

    pub async fn request_microphone_permission(&self) -> bool {
        self.inner.audio.request_microphone_permission().await
    }

    pub fn request_accessibility_permission(&self) {
        self.inner.sink.request_accessibility_permission();
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DictationEvent> {
        self.inner.events_tx.subscribe()
    }
}

// =============================================================================
// Shared internals
// =============================================================================

impl<A, T, S, H> Inner<A, T, S, H>
where
    A: AudioSource + 'static,
    T: TranscriptionEngine + 'static,
    S: TextSink + 'static,
    H: HotkeySignal + 'static,
{
    pub(crate) fn state(&self) -> DictationState {
        self.session.lock().expect(SESSION_POISONED).state.clone()
    }

    /// Apply a state transition under the session lock.
    ///
    /// Bumps the generation counter, clears the partial text on entering
    /// `Recording`, `Processing`, or `Idle`, and mirrors the new state into
    /// the watch channel. Returns the post-transition generation.
    pub(crate) fn set_state(&self, session: &mut SessionState, next: DictationState) -> u64 {
        if !session.state.can_transition_to(&next) {
            tracing::error!(
                from = %session.state,
                to = %next,
                "Ignoring invalid dictation state transition"
            );
            return session.generation;
        }

        tracing::debug!("Dictation state: {} -> {}", session.state, next);
        session.generation += 1;
        if matches!(
            next,
            DictationState::Recording | DictationState::Processing | DictationState::Idle
        ) && !session.partial_text.is_empty()
        {
            session.partial_text.clear();
            let _ = self.partial_tx.send(String::new());
        }
        session.state = next.clone();
        let _ = self.state_tx.send(next);
        session.generation
    }

    pub(crate) fn emit(&self, event: DictationEvent) {
        tracing::debug!(event = event.event_name(), "Dictation event");
        let _ = self.events_tx.send(event);
    }

    /// Publish intermediate text into the partial transcript.
    ///
    /// Returns false once the owning task was cancelled or the session left
    /// `Recording`; the token check and the state check happen under the
    /// session lock, so no partial result is ever published after
    /// cancellation.
    pub(crate) fn publish_partial(&self, text: &str, token: &CancellationToken) -> bool {
        let mut session = self.session.lock().expect(SESSION_POISONED);
        if token.is_cancelled() || session.state != DictationState::Recording {
            return false;
        }
        session.partial_text = text.to_string();
        let _ = self.partial_tx.send(text.to_string());
        true
    }

    /// Publish an elapsed-duration sample, dropped once the recording ended.
    pub(crate) fn publish_duration(&self, secs: f32, token: &CancellationToken) {
        let session = self.session.lock().expect(SESSION_POISONED);
        if token.is_cancelled() || session.state != DictationState::Recording {
            return;
        }
        let _ = self.duration_tx.send(secs);
    }

    /// Cancel all recording-phase tasks and reset their published values.
    ///
    /// Must run (and does, on every path) before the session leaves
    /// `Recording`. Caller holds the session lock.
    fn release_recording_tasks(&self, session: &mut SessionState) {
        if let Some(handle) = session.streaming.take() {
            handle.cancel();
        }
        if let Some(handle) = session.silence.take() {
            handle.cancel();
        }
        if let Some(handle) = session.timer.take() {
            handle.cancel();
        }
        session.started_at = None;
        let _ = self.duration_tx.send(0.0);
        let _ = self.streaming_tx.send(false);
    }
}

/// Enter the error state and schedule the guarded auto-clear.
pub(crate) fn enter_error<A, T, S, H>(
    inner: &Arc<Inner<A, T, S, H>>,
    session_id: SessionId,
    message: &str,
) where
    A: AudioSource + 'static,
    T: TranscriptionEngine + 'static,
    S: TextSink + 'static,
    H: HotkeySignal + 'static,
{
    let generation = {
        let mut session = inner.session.lock().expect(SESSION_POISONED);
        inner.release_recording_tasks(&mut session);
        inner.set_state(&mut session, DictationState::Error(message.to_string()))
    };

    inner.emit(DictationEvent::SessionFailed {
        session_id,
        reason: message.to_string(),
        timestamp: Timestamp::now(),
    });

    let clear_after = inner.options.tuning.error_display;
    let inner = Arc::clone(inner);
    tokio::spawn(async move {
        tokio::time::sleep(clear_after).await;
        let cleared = {
            let mut session = inner.session.lock().expect(SESSION_POISONED);
            // Another transition happened in the meantime: leave it alone.
            if session.generation != generation || !session.state.is_error() {
                false
            } else {
                inner.set_state(&mut session, DictationState::Idle);
                true
            }
        };
        if cleared {
            inner.emit(DictationEvent::ErrorCleared {
                session_id,
                timestamp: Timestamp::now(),
            });
        }
    });
}

/// A failed start also resets the external hotkey control.
fn fail_start<A, T, S, H>(inner: &Arc<Inner<A, T, S, H>>, session_id: SessionId, message: &str)
where
    A: AudioSource + 'static,
    T: TranscriptionEngine + 'static,
    S: TextSink + 'static,
    H: HotkeySignal + 'static,
{
    enter_error(inner, session_id, message);
    inner.hotkey.cancel();
}

// =============================================================================
// Start / stop flows
// =============================================================================

pub(crate) async fn start_flow<A, T, S, H>(inner: Arc<Inner<A, T, S, H>>)
where
    A: AudioSource + 'static,
    T: TranscriptionEngine + 'static,
    S: TextSink + 'static,
    H: HotkeySignal + 'static,
{
    let _ops = inner.ops.lock().await;

    {
        let session = inner.session.lock().expect(SESSION_POISONED);
        if session.state != DictationState::Idle {
            tracing::debug!(state = %session.state, "Ignoring start request outside Idle");
            return;
        }
    }

    let session_id = SessionId::new();

    if !inner.engine.is_ready() {
        tracing::warn!("Dictation start rejected: no model loaded");
        fail_start(&inner, session_id, "No model loaded. Download a model first.");
        return;
    }

    if !inner.audio.has_microphone_permission() {
        tracing::warn!("Dictation start rejected: microphone permission missing");
        fail_start(&inner, session_id, "Microphone permission required.");
        return;
    }

    let gain = if inner.whisper_mode.load(Ordering::Relaxed) {
        inner.options.tuning.whisper_gain
    } else {
        1.0
    };
    inner.audio.set_gain_multiplier(gain);

    if let Err(e) = inner.audio.start_recording().await {
        tracing::warn!(error = %e, "Failed to start audio capture");
        fail_start(&inner, session_id, &e.to_string());
        return;
    }

    let mode = inner.hotkey.mode();
    let streaming_supported = inner.engine.supports_streaming();

    {
        let mut session = inner.session.lock().expect(SESSION_POISONED);
        session.id = session_id;
        inner.set_state(&mut session, DictationState::Recording);

        let started = Instant::now();
        session.started_at = Some(started);

        let timer_token = CancellationToken::new();
        tokio::spawn(timer::run(
            Arc::clone(&inner),
            timer_token.clone(),
            started,
        ));
        session.timer = Some(TaskHandle::new(timer_token));

        if streaming_supported {
            let token = CancellationToken::new();
            tokio::spawn(streaming::run(Arc::clone(&inner), token.clone()));
            session.streaming = Some(TaskHandle::new(token));
        }

        if mode == HotkeyMode::Toggle {
            let token = CancellationToken::new();
            tokio::spawn(silence::run(Arc::clone(&inner), token.clone()));
            session.silence = Some(TaskHandle::new(token));
        }

        let _ = inner.streaming_tx.send(streaming_supported);
    }

    tracing::info!(
        session_id = %session_id,
        gain,
        streaming = streaming_supported,
        mode = ?mode,
        "Dictation session started"
    );
    inner.emit(DictationEvent::SessionStarted {
        session_id,
        timestamp: Timestamp::now(),
    });
}

pub(crate) async fn stop_flow<A, T, S, H>(inner: Arc<Inner<A, T, S, H>>)
where
    A: AudioSource + 'static,
    T: TranscriptionEngine + 'static,
    S: TextSink + 'static,
    H: HotkeySignal + 'static,
{
    let (session_id, samples, generation) = {
        let _ops = inner.ops.lock().await;

        let session_id = {
            let mut session = inner.session.lock().expect(SESSION_POISONED);
            if session.state != DictationState::Recording {
                tracing::debug!(state = %session.state, "Ignoring stop request outside Recording");
                return;
            }
            // All background tasks must be released before leaving Recording.
            inner.release_recording_tasks(&mut session);
            session.id
        };

        let samples = inner.audio.stop_recording().await;
        let audio_secs = samples_duration_secs(samples.len(), inner.options.tuning.sample_rate);

        let mut session = inner.session.lock().expect(SESSION_POISONED);
        if audio_secs < inner.options.tuning.min_audio_secs {
            // Too short to transcribe meaningfully: a quiet abandon, not an error.
            inner.set_state(&mut session, DictationState::Idle);
            drop(session);
            tracing::info!(
                session_id = %session_id,
                audio_secs,
                "Recording abandoned below minimum duration"
            );
            inner.emit(DictationEvent::SessionAbandoned {
                session_id,
                audio_secs,
                timestamp: Timestamp::now(),
            });
            return;
        }

        let generation = inner.set_state(&mut session, DictationState::Processing);
        drop(session);
        tracing::info!(
            session_id = %session_id,
            audio_secs,
            samples = samples.len(),
            "Processing dictation audio"
        );
        (session_id, samples, generation)
    };

    // The final pass runs outside the operations lock; the Processing state
    // itself blocks a concurrent start until the session reaches Idle.
    finalize(&inner, session_id, samples, generation).await;
}

/// Final transcription and insertion. The result is applied through the
/// generation guard rather than by assuming the state is untouched.
async fn finalize<A, T, S, H>(
    inner: &Arc<Inner<A, T, S, H>>,
    session_id: SessionId,
    samples: Vec<f32>,
    generation: u64,
) where
    A: AudioSource + 'static,
    T: TranscriptionEngine + 'static,
    S: TextSink + 'static,
    H: HotkeySignal + 'static,
{
    let request = TranscriptionRequest {
        samples: &samples,
        sample_rate: inner.options.tuning.sample_rate,
        language: inner.options.language.clone(),
        task: inner.options.task,
    };

    let result = match inner.engine.transcribe(request, None).await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(session_id = %session_id, error = %e, "Final transcription failed");
            enter_error(inner, session_id, &e.to_string());
            return;
        }
    };

    let text = result.text.trim().to_string();

    {
        let mut session = inner.session.lock().expect(SESSION_POISONED);
        if session.generation != generation {
            tracing::warn!(session_id = %session_id, "Discarding stale transcription result");
            return;
        }
        if text.is_empty() {
            tracing::info!(session_id = %session_id, "Final transcription empty, nothing to insert");
            inner.set_state(&mut session, DictationState::Idle);
            return;
        }
        inner.set_state(&mut session, DictationState::Inserting);
    }

    match inner.sink.insert_text(&text).await {
        Ok(()) => {
            {
                let mut session = inner.session.lock().expect(SESSION_POISONED);
                inner.set_state(&mut session, DictationState::Idle);
            }
            tracing::info!(session_id = %session_id, chars = text.len(), "Dictated text inserted");
            inner.emit(DictationEvent::TranscriptInserted {
                session_id,
                text,
                timestamp: Timestamp::now(),
            });
        }
        Err(e) => {
            tracing::warn!(session_id = %session_id, error = %e, "Text insertion failed");
            enter_error(inner, session_id, &e.to_string());
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
