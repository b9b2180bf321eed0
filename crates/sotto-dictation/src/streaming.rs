//! Incremental transcription over the in-progress capture buffer.
//!
//! Runs only while the session is recording and the engine supports
//! streaming. Failures here are non-fatal: the full pass at stop time runs
//! regardless, so a failed attempt is logged and the loop stays on its
//! schedule.

use std::sync::Arc;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use sotto_audio::AudioSource;
use sotto_core::types::samples_duration_secs;
use sotto_transcribe::{ProgressSink, TranscriptionEngine, TranscriptionRequest};

use crate::hotkey::HotkeySignal;
use crate::insert::TextSink;
use crate::orchestrator::Inner;
use crate::state::DictationState;

pub(crate) async fn run<A, T, S, H>(inner: Arc<Inner<A, T, S, H>>, token: CancellationToken)
where
    A: AudioSource + 'static,
    T: TranscriptionEngine + 'static,
    S: TextSink + 'static,
    H: HotkeySignal + 'static,
{
    let tuning = inner.options.tuning.clone();

    tokio::select! {
        _ = token.cancelled() => return,
        _ = sleep(tuning.stream_initial_delay) => {}
    }

    loop {
        if token.is_cancelled() || inner.state() != DictationState::Recording {
            break;
        }

        let buffer = inner.audio.current_buffer();
        let buffered_secs = samples_duration_secs(buffer.len(), tuning.sample_rate);

        if buffered_secs > tuning.min_stream_secs {
            let publish_inner = Arc::clone(&inner);
            let publish_token = token.clone();
            let progress = ProgressSink::new(token.clone(), move |text| {
                publish_inner.publish_partial(text, &publish_token)
            });

            let request = TranscriptionRequest {
                samples: &buffer,
                sample_rate: tuning.sample_rate,
                language: inner.options.language.clone(),
                task: inner.options.task,
            };

            match inner.engine.transcribe(request, Some(&progress)).await {
                Ok(result) => {
                    let text = result.text.trim();
                    if !text.is_empty() {
                        inner.publish_partial(text, &token);
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, buffered_secs, "Partial transcription failed")
                }
            }
        }

        tokio::select! {
            _ = token.cancelled() => break,
            _ = sleep(tuning.stream_interval) => {}
        }
    }
}
