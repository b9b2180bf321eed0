//! Sotto Audio crate - microphone capture capability surface.
//!
//! Defines the `AudioSource` trait the dictation engine records through, and
//! an in-memory mock implementation for testing without real audio hardware.
//! The engine never touches a device directly: it only starts/stops capture,
//! snapshots the buffer, and observes the level and silence signals computed
//! by the source.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use sotto_core::error::{Result, SottoError};

/// Microphone capture service consumed by the dictation engine.
///
/// Implementations own the device, the sample buffer, and the derived
/// level/silence signals. The engine configures gain before starting and
/// treats `stop_recording` as infallible (a dead device yields an empty
/// buffer, not an error).
pub trait AudioSource: Send + Sync {
    /// Whether microphone access has been granted.
    fn has_microphone_permission(&self) -> bool;

    /// Prompt for microphone access. Returns the resulting grant state.
    fn request_microphone_permission(&self) -> impl Future<Output = bool> + Send;

    /// Capture gain applied to incoming samples. Set before starting.
    fn gain_multiplier(&self) -> f32;
    fn set_gain_multiplier(&self, gain: f32);

    /// Start capturing from the device.
    fn start_recording(&self) -> impl Future<Output = Result<()>> + Send;

    /// Stop capturing and drain the full captured sample sequence.
    ///
    /// Always succeeds; the result may be empty.
    fn stop_recording(&self) -> impl Future<Output = Vec<f32>> + Send;

    /// Non-destructive snapshot of the samples captured so far.
    fn current_buffer(&self) -> Vec<f32>;

    /// Observable input level in [0.0, 1.0] for display purposes.
    fn audio_level(&self) -> watch::Receiver<f32>;

    /// Observable duration in seconds of the current run of silence.
    fn silence_duration(&self) -> watch::Receiver<f32>;

    /// Silence duration after which a toggle-mode recording should auto-stop.
    fn silence_auto_stop_secs(&self) -> f32;

    /// Flag distinguishing silence-triggered stops from manual ones.
    fn auto_stopped(&self) -> bool;
    fn set_auto_stopped(&self, value: bool);
}

// =============================================================================
// Mock implementation
// =============================================================================

/// Mock audio source for testing.
///
/// Captured samples are pushed in by the test; the level and silence signals
/// are driven through the corresponding `feed_*` methods. `Clone` shares the
/// underlying state so a test can keep a handle while the engine owns another.
#[derive(Clone)]
pub struct MockAudioSource {
    shared: Arc<MockAudioShared>,
}

struct MockAudioShared {
    permission: AtomicBool,
    recording: AtomicBool,
    fail_next_start: AtomicBool,
    auto_stopped: AtomicBool,
    gain_bits: AtomicU32,
    buffer: Mutex<Vec<f32>>,
    level_tx: watch::Sender<f32>,
    silence_tx: watch::Sender<f32>,
    silence_auto_stop_secs: f32,
}

impl MockAudioSource {
    pub fn new() -> Self {
        Self::with_auto_stop_secs(2.0)
    }

    /// Create a mock with a specific silence auto-stop threshold.
    pub fn with_auto_stop_secs(secs: f32) -> Self {
        let (level_tx, _) = watch::channel(0.0);
        let (silence_tx, _) = watch::channel(0.0);
        Self {
            shared: Arc::new(MockAudioShared {
                permission: AtomicBool::new(true),
                recording: AtomicBool::new(false),
                fail_next_start: AtomicBool::new(false),
                auto_stopped: AtomicBool::new(false),
                gain_bits: AtomicU32::new(1.0f32.to_bits()),
                buffer: Mutex::new(Vec::new()),
                level_tx,
                silence_tx,
                silence_auto_stop_secs: secs,
            }),
        }
    }

    /// Whether capture is currently active.
    pub fn is_recording(&self) -> bool {
        self.shared.recording.load(Ordering::Relaxed)
    }

    /// Grant or revoke microphone permission.
    pub fn set_permission(&self, granted: bool) {
        self.shared.permission.store(granted, Ordering::Relaxed);
    }

    /// Make the next `start_recording` call fail.
    pub fn fail_next_start(&self) {
        self.shared.fail_next_start.store(true, Ordering::Relaxed);
    }

    /// Append captured samples, as the device callback would.
    pub fn feed_samples(&self, samples: &[f32]) {
        self.shared
            .buffer
            .lock()
            .expect("mock audio buffer poisoned")
            .extend_from_slice(samples);
    }

    /// Publish a new input level reading.
    pub fn feed_level(&self, level: f32) {
        let _ = self.shared.level_tx.send(level);
    }

    /// Publish a new silence-duration reading.
    pub fn feed_silence(&self, secs: f32) {
        let _ = self.shared.silence_tx.send(secs);
    }
}

impl Default for MockAudioSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSource for MockAudioSource {
    fn has_microphone_permission(&self) -> bool {
        self.shared.permission.load(Ordering::Relaxed)
    }

    async fn request_microphone_permission(&self) -> bool {
        // The mock grants whatever was configured; a real source would prompt.
        self.shared.permission.load(Ordering::Relaxed)
    }

    fn gain_multiplier(&self) -> f32 {
        f32::from_bits(self.shared.gain_bits.load(Ordering::Relaxed))
    }

    fn set_gain_multiplier(&self, gain: f32) {
        self.shared.gain_bits.store(gain.to_bits(), Ordering::Relaxed);
    }

    async fn start_recording(&self) -> Result<()> {
        if self.shared.fail_next_start.swap(false, Ordering::Relaxed) {
            return Err(SottoError::Audio("Failed to open input device".to_string()));
        }
        if self.shared.recording.swap(true, Ordering::Relaxed) {
            return Err(SottoError::Audio("Capture is already active".to_string()));
        }
        self.shared.auto_stopped.store(false, Ordering::Relaxed);
        tracing::debug!("Mock audio capture started");
        Ok(())
    }

    async fn stop_recording(&self) -> Vec<f32> {
        self.shared.recording.store(false, Ordering::Relaxed);
        let _ = self.shared.silence_tx.send(0.0);
        let samples = std::mem::take(
            &mut *self
                .shared
                .buffer
                .lock()
                .expect("mock audio buffer poisoned"),
        );
        tracing::debug!(samples = samples.len(), "Mock audio capture stopped");
        samples
    }

    fn current_buffer(&self) -> Vec<f32> {
        self.shared
            .buffer
            .lock()
            .expect("mock audio buffer poisoned")
            .clone()
    }

    fn audio_level(&self) -> watch::Receiver<f32> {
        self.shared.level_tx.subscribe()
    }

    fn silence_duration(&self) -> watch::Receiver<f32> {
        self.shared.silence_tx.subscribe()
    }

    fn silence_auto_stop_secs(&self) -> f32 {
        self.shared.silence_auto_stop_secs
    }

    fn auto_stopped(&self) -> bool {
        self.shared.auto_stopped.load(Ordering::Relaxed)
    }

    fn set_auto_stopped(&self, value: bool) {
        self.shared.auto_stopped.store(value, Ordering::Relaxed);
    }
}

// =============================================================================
// Tests
// =============================================================================
