//! Sotto Transcribe crate - speech-to-text capability surface.
//!
//! Defines the `TranscriptionEngine` trait the dictation engine runs both
//! its incremental (streaming) and final transcription passes through, and a
//! scriptable mock for testing. Streaming passes receive a `ProgressSink`
//! carrying a cancellation token: the engine publishes intermediate text
//! through it and is expected to abort its internal work once an update is
//! rejected.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use sotto_core::error::{Result, SottoError};
use sotto_core::types::TranscriptionTask;

/// A single transcription request over a PCM sample buffer.
#[derive(Debug, Clone)]
pub struct TranscriptionRequest<'a> {
    /// Raw PCM samples in [-1.0, 1.0].
    pub samples: &'a [f32],
    /// Sample rate of `samples`, typically 16000 Hz.
    pub sample_rate: u32,
    /// Language hint. `None` lets the engine auto-detect.
    pub language: Option<String>,
    /// Transcribe or translate.
    pub task: TranscriptionTask,
}

/// Output of a transcription pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionResult {
    pub text: String,
}

/// Receiver for intermediate text produced during a streaming pass.
///
/// `update` is the continuation contract: it returns `false` once the
/// attached token is cancelled or the session-side guard rejects the text,
/// and the engine must stop producing further progress. Nothing is published
/// after cancellation.
pub struct ProgressSink {
    token: CancellationToken,
    publish: Box<dyn Fn(&str) -> bool + Send + Sync>,
}

impl ProgressSink {
    pub fn new(
        token: CancellationToken,
        publish: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            token,
            publish: Box::new(publish),
        }
    }

    /// Offer intermediate text. Returns whether the engine should continue.
    pub fn update(&self, text: &str) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        (self.publish)(text)
    }

    /// Whether the pass this sink belongs to has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl std::fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSink")
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

/// Speech-to-text service consumed by the dictation engine.
pub trait TranscriptionEngine: Send + Sync {
    /// Whether a model is loaded and the engine can transcribe.
    fn is_ready(&self) -> bool;

    /// Whether the engine can produce useful partial results over an
    /// in-progress buffer.
    fn supports_streaming(&self) -> bool;

    /// Run a transcription pass.
    ///
    /// When `progress` is supplied the engine may invoke it zero or more
    /// times with intermediate text, and must stop early once an update
    /// returns `false`.
    fn transcribe(
        &self,
        request: TranscriptionRequest<'_>,
        progress: Option<&ProgressSink>,
    ) -> impl Future<Output = Result<TranscriptionResult>> + Send;
}

// =============================================================================
// Mock implementation
// =============================================================================

/// One recorded `transcribe` call on the mock engine.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub sample_count: usize,
    pub language: Option<String>,
    pub task: TranscriptionTask,
    /// Whether a progress sink was supplied (i.e. a streaming pass).
    pub streaming: bool,
}

enum Scripted {
    Text(String),
    Failure(String),
}

/// Scriptable transcription engine for testing.
///
/// Final passes (no progress sink) consume scripted responses front-to-back,
/// falling back to the configured default text. Streaming passes (progress
/// sink supplied) first emit the scripted progress texts through the sink,
/// respecting the continuation flag, then return the streaming text; they
/// never consume the final-pass queue.
#[derive(Clone)]
pub struct MockTranscriptionEngine {
    shared: Arc<MockEngineShared>,
}

struct MockEngineShared {
    ready: AtomicBool,
    supports_streaming: AtomicBool,
    responses: Mutex<VecDeque<Scripted>>,
    default_text: Mutex<String>,
    progress_script: Mutex<Vec<String>>,
    streaming_text: Mutex<String>,
    streaming_failure: Mutex<Option<String>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTranscriptionEngine {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(MockEngineShared {
                ready: AtomicBool::new(true),
                supports_streaming: AtomicBool::new(false),
                responses: Mutex::new(VecDeque::new()),
                default_text: Mutex::new(String::new()),
                progress_script: Mutex::new(Vec::new()),
                streaming_text: Mutex::new(String::new()),
                streaming_failure: Mutex::new(None),
                calls: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.shared.ready.store(ready, Ordering::Relaxed);
    }

    pub fn set_supports_streaming(&self, supported: bool) {
        self.shared
            .supports_streaming
            .store(supported, Ordering::Relaxed);
    }

    /// Queue a successful response.
    pub fn push_text(&self, text: &str) {
        self.shared
            .responses
            .lock()
            .expect("mock responses poisoned")
            .push_back(Scripted::Text(text.to_string()));
    }

    /// Queue a failing response.
    pub fn push_failure(&self, reason: &str) {
        self.shared
            .responses
            .lock()
            .expect("mock responses poisoned")
            .push_back(Scripted::Failure(reason.to_string()));
    }

    /// Text returned when the response queue is empty.
    pub fn set_default_text(&self, text: &str) {
        *self
            .shared
            .default_text
            .lock()
            .expect("mock default poisoned") = text.to_string();
    }

    /// Intermediate texts emitted through the progress sink on each
    /// streaming call.
    pub fn set_progress_script(&self, texts: &[&str]) {
        *self
            .shared
            .progress_script
            .lock()
            .expect("mock progress poisoned") = texts.iter().map(|t| t.to_string()).collect();
    }

    /// Result text of every streaming call.
    pub fn set_streaming_text(&self, text: &str) {
        *self
            .shared
            .streaming_text
            .lock()
            .expect("mock streaming poisoned") = text.to_string();
    }

    /// Make every streaming call fail with the given reason.
    pub fn set_streaming_failure(&self, reason: Option<&str>) {
        *self
            .shared
            .streaming_failure
            .lock()
            .expect("mock streaming poisoned") = reason.map(|r| r.to_string());
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.shared
            .calls
            .lock()
            .expect("mock calls poisoned")
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.shared.calls.lock().expect("mock calls poisoned").len()
    }
}

impl Default for MockTranscriptionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptionEngine for MockTranscriptionEngine {
    fn is_ready(&self) -> bool {
        self.shared.ready.load(Ordering::Relaxed)
    }

    fn supports_streaming(&self) -> bool {
        self.shared.supports_streaming.load(Ordering::Relaxed)
    }

    async fn transcribe(
        &self,
        request: TranscriptionRequest<'_>,
        progress: Option<&ProgressSink>,
    ) -> Result<TranscriptionResult> {
        self.shared
            .calls
            .lock()
            .expect("mock calls poisoned")
            .push(RecordedCall {
                sample_count: request.samples.len(),
                language: request.language.clone(),
                task: request.task,
                streaming: progress.is_some(),
            });

        if let Some(sink) = progress {
            let script = self
                .shared
                .progress_script
                .lock()
                .expect("mock progress poisoned")
                .clone();
            for text in &script {
                if !sink.update(text) {
                    tracing::debug!("Mock engine: progress rejected, aborting pass");
                    break;
                }
            }

            let failure = self
                .shared
                .streaming_failure
                .lock()
                .expect("mock streaming poisoned")
                .clone();
            return match failure {
                Some(reason) => Err(SottoError::Transcription(reason)),
                None => Ok(TranscriptionResult {
                    text: self
                        .shared
                        .streaming_text
                        .lock()
                        .expect("mock streaming poisoned")
                        .clone(),
                }),
            };
        }

        let scripted = self
            .shared
            .responses
            .lock()
            .expect("mock responses poisoned")
            .pop_front();

        match scripted {
            Some(Scripted::Text(text)) => Ok(TranscriptionResult { text }),
            Some(Scripted::Failure(reason)) => Err(SottoError::Transcription(reason)),
            None => Ok(TranscriptionResult {
                text: self
                    .shared
                    .default_text
                    .lock()
                    .expect("mock default poisoned")
                    .clone(),
            }),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn request(samples: &[f32]) -> TranscriptionRequest<'_> {
        TranscriptionRequest {
            samples,
            sample_rate: 16_000,
            language: None,
            task: TranscriptionTask::Transcribe,
        }
    }

    #[tokio::test]
    async fn test_scripted_responses_in_order() {
        let engine = MockTranscriptionEngine::new();
        engine.push_text("first");
        engine.push_failure("model exploded");
        engine.push_text("second");

        let samples = vec![0.0; 100];
        assert_eq!(
            engine.transcribe(request(&samples), None).await.unwrap().text,
            "first"
        );
        assert!(engine.transcribe(request(&samples), None).await.is_err());
        assert_eq!(
            engine.transcribe(request(&samples), None).await.unwrap().text,
            "second"
        );
    }

    #[tokio::test]
    async fn test_default_text_when_queue_empty() {
        let engine = MockTranscriptionEngine::new();
        engine.set_default_text("fallback");
        let samples = vec![0.0; 10];
        let result = engine.transcribe(request(&samples), None).await.unwrap();
        assert_eq!(result.text, "fallback");
    }

    #[tokio::test]
    async fn test_calls_are_recorded() {
        let engine = MockTranscriptionEngine::new();
        let samples = vec![0.0; 320];
        let req = TranscriptionRequest {
            samples: &samples,
            sample_rate: 16_000,
            language: Some("en".to_string()),
            task: TranscriptionTask::Translate,
        };
        engine.transcribe(req, None).await.unwrap();

        let calls = engine.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].sample_count, 320);
        assert_eq!(calls[0].language.as_deref(), Some("en"));
        assert_eq!(calls[0].task, TranscriptionTask::Translate);
        assert!(!calls[0].streaming);
    }

    #[tokio::test]
    async fn test_progress_script_emitted_through_sink() {
        let engine = MockTranscriptionEngine::new();
        engine.set_progress_script(&["he", "hello"]);
        engine.set_streaming_text("hello there");
        engine.push_text("final text");

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let sink = ProgressSink::new(CancellationToken::new(), move |text| {
            seen_clone.lock().unwrap().push(text.to_string());
            true
        });

        let samples = vec![0.0; 100];
        let result = engine
            .transcribe(request(&samples), Some(&sink))
            .await
            .unwrap();
        assert_eq!(result.text, "hello there");
        assert_eq!(*seen.lock().unwrap(), vec!["he", "hello"]);
        assert!(engine.calls()[0].streaming);

        // Streaming passes never consume the final-pass queue.
        let result = engine.transcribe(request(&samples), None).await.unwrap();
        assert_eq!(result.text, "final text");
    }

    #[tokio::test]
    async fn test_streaming_failure_only_affects_streaming_passes() {
        let engine = MockTranscriptionEngine::new();
        engine.set_streaming_failure(Some("partial pass unavailable"));
        engine.push_text("final text");

        let sink = ProgressSink::new(CancellationToken::new(), |_| true);
        let samples = vec![0.0; 100];
        assert!(engine.transcribe(request(&samples), Some(&sink)).await.is_err());

        let result = engine.transcribe(request(&samples), None).await.unwrap();
        assert_eq!(result.text, "final text");
    }

    #[tokio::test]
    async fn test_progress_stops_after_rejection() {
        let engine = MockTranscriptionEngine::new();
        engine.set_progress_script(&["a", "b", "c"]);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        // Reject everything after the first update.
        let sink = ProgressSink::new(CancellationToken::new(), move |text| {
            let mut seen = seen_clone.lock().unwrap();
            seen.push(text.to_string());
            seen.len() < 1
        });

        let samples = vec![0.0; 100];
        engine
            .transcribe(request(&samples), Some(&sink))
            .await
            .unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_sink_update_false_after_cancel() {
        let token = CancellationToken::new();
        let sink = ProgressSink::new(token.clone(), |_| true);

        assert!(sink.update("still live"));
        token.cancel();
        assert!(sink.is_cancelled());
        assert!(!sink.update("too late"));
    }

    #[test]
    fn test_sink_publish_not_invoked_after_cancel() {
        let token = CancellationToken::new();
        let hits = Arc::new(Mutex::new(0usize));
        let hits_clone = Arc::clone(&hits);
        let sink = ProgressSink::new(token.clone(), move |_| {
            *hits_clone.lock().unwrap() += 1;
            true
        });

        token.cancel();
        assert!(!sink.update("dropped"));
        assert_eq!(*hits.lock().unwrap(), 0);
    }

    #[test]
    fn test_ready_and_streaming_flags() {
        let engine = MockTranscriptionEngine::new();
        assert!(engine.is_ready());
        assert!(!engine.supports_streaming());

        engine.set_ready(false);
        engine.set_supports_streaming(true);
        assert!(!engine.is_ready());
        assert!(engine.supports_streaming());
    }
}
