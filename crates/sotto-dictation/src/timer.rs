//! Recording-duration sampler.
//!
//! Republishes the elapsed time since the recording started for display
//! purposes. Purely observational: it never affects transitions, and the
//! published value is reset to zero when the session leaves Recording.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use sotto_audio::AudioSource;
use sotto_transcribe::TranscriptionEngine;

use crate::hotkey::HotkeySignal;
use crate::insert::TextSink;
use crate::orchestrator::Inner;

pub(crate) async fn run<A, T, S, H>(
    inner: Arc<Inner<A, T, S, H>>,
    token: CancellationToken,
    started: Instant,
) where
    A: AudioSource + 'static,
    T: TranscriptionEngine + 'static,
    S: TextSink + 'static,
    H: HotkeySignal + 'static,
{
    let mut ticker = tokio::time::interval(inner.options.tuning.timer_period);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => return,
            _ = ticker.tick() => {
                inner.publish_duration(started.elapsed().as_secs_f32(), &token);
            }
        }
    }
}
