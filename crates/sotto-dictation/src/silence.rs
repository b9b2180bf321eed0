//! Silence-triggered auto-stop for toggle-mode recordings.
//!
//! Watches the silence-duration signal computed by the audio source and,
//! once it reaches the source's auto-stop threshold while the session is
//! still recording, marks the stop as automatic, requests a stop, and resets
//! the external hotkey control. The threshold itself is audio-source policy;
//! this task only decides when to fire within the current session.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use sotto_audio::AudioSource;
use sotto_core::events::DictationEvent;
use sotto_core::types::Timestamp;
use sotto_transcribe::TranscriptionEngine;

use crate::hotkey::HotkeySignal;
use crate::insert::TextSink;
use crate::orchestrator::{stop_flow, Inner};
use crate::state::DictationState;

pub(crate) async fn run<A, T, S, H>(inner: Arc<Inner<A, T, S, H>>, token: CancellationToken)
where
    A: AudioSource + 'static,
    T: TranscriptionEngine + 'static,
    S: TextSink + 'static,
    H: HotkeySignal + 'static,
{
    let mut silence_rx = inner.audio.silence_duration();
    let threshold = inner.audio.silence_auto_stop_secs();

    loop {
        // Check-then-wait so a threshold already reached when the watcher
        // attaches still fires.
        let silence_secs = *silence_rx.borrow_and_update();
        if silence_secs >= threshold && inner.state() == DictationState::Recording {
            let session_id = inner
                .session
                .lock()
                .expect("session state poisoned")
                .id;

            tracing::info!(
                session_id = %session_id,
                silence_secs,
                threshold,
                "Silence threshold reached, auto-stopping dictation"
            );
            inner.audio.set_auto_stopped(true);
            inner.emit(DictationEvent::SilenceAutoStop {
                session_id,
                silence_secs,
                timestamp: Timestamp::now(),
            });

            let stop_inner = Arc::clone(&inner);
            tokio::spawn(async move {
                stop_flow(stop_inner).await;
            });
            inner.hotkey.cancel();
            return;
        }

        tokio::select! {
            _ = token.cancelled() => return,
            changed = silence_rx.changed() => {
                if changed.is_err() {
                    // Audio source dropped its signal; nothing left to watch.
                    return;
                }
            }
        }
    }
}
