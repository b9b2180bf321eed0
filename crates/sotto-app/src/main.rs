//! Sotto application binary - composition root.
//!
//! Ties the dictation engine to concrete capability implementations:
//! 1. Initialize tracing
//! 2. Load configuration from TOML
//! 3. Build the orchestrator with explicit dependency injection
//! 4. Drive a scripted dictation session end to end
//!
//! Real microphone capture, global hotkey registration, and OS text
//! insertion are host-platform services wired in by the desktop shell; this
//! binary ships with the in-memory implementations so the engine can be
//! exercised from the command line on any platform.

use std::path::PathBuf;
use std::time::Duration;

use sotto_audio::MockAudioSource;
use sotto_core::config::SottoConfig;
use sotto_dictation::{DictationOptions, MockHotkey, MockTextSink, Orchestrator, Tuning};
use sotto_transcribe::MockTranscriptionEngine;

/// Resolve the config file path (SOTTO_CONFIG env, or ~/.sotto/config.toml).
fn config_path() -> PathBuf {
    if let Ok(p) = std::env::var("SOTTO_CONFIG") {
        return PathBuf::from(p);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".sotto").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting Sotto v{}", env!("CARGO_PKG_VERSION"));

    // Config.
    let config_file = config_path();
    let config = SottoConfig::load_or_default(&config_file);

    // Capability implementations.
    let audio = MockAudioSource::with_auto_stop_secs(config.audio.silence_auto_stop_secs);
    let engine = MockTranscriptionEngine::new();
    engine.set_supports_streaming(true);
    engine.set_streaming_text("testing the dictation");
    engine.push_text("Testing the dictation engine end to end.");

    let sink = MockTextSink::new();
    let (hotkey, hotkey_events) = MockHotkey::new(config.dictation.hotkey_mode);

    let options = DictationOptions {
        language: config.dictation.language.clone(),
        task: config.dictation.task,
        whisper_mode: config.dictation.whisper_mode,
        tuning: Tuning::default(),
    };
    let orchestrator = Orchestrator::new(
        audio.clone(),
        engine,
        sink.clone(),
        hotkey.clone(),
        options,
    );

    // Log session events as they happen.
    let mut events = orchestrator.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::info!(event = event.event_name(), "Session event");
        }
    });

    let driver = orchestrator.drive(hotkey_events);

    // Scripted session: press the hotkey, speak for two seconds, press again.
    hotkey.press_start();
    tokio::time::sleep(Duration::from_millis(200)).await;
    audio.feed_samples(&vec![0.05; 32_000]); // 2 s of audio at 16 kHz
    tokio::time::sleep(Duration::from_secs(2)).await;
    tracing::info!(partial = %orchestrator.partial_text(), "Partial transcript while recording");
    hotkey.press_stop();
    tokio::time::sleep(Duration::from_millis(500)).await;

    for text in sink.inserted() {
        tracing::info!(%text, "Text delivered to sink");
    }

    driver.abort();
    Ok(())
}
