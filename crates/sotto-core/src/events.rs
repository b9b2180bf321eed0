use serde::{Deserialize, Serialize};

use crate::types::{SessionId, Timestamp};

/// Lifecycle events emitted by the dictation orchestrator.
///
/// Events are broadcast after state changes and consumed by the surrounding
/// application (menu bar indicator, logging, diagnostics). Emission is
/// fire-and-forget: a missing subscriber never affects the session.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DictationEvent {
    /// A recording session started.
    SessionStarted {
        session_id: SessionId,
        timestamp: Timestamp,
    },

    /// A recording was stopped but was too short to transcribe.
    SessionAbandoned {
        session_id: SessionId,
        audio_secs: f32,
        timestamp: Timestamp,
    },

    /// Silence reached the auto-stop threshold in toggle mode.
    SilenceAutoStop {
        session_id: SessionId,
        silence_secs: f32,
        timestamp: Timestamp,
    },

    /// Final transcription completed and the text was delivered to the sink.
    TranscriptInserted {
        session_id: SessionId,
        text: String,
        timestamp: Timestamp,
    },

    /// The session failed and entered the error state.
    SessionFailed {
        session_id: SessionId,
        reason: String,
        timestamp: Timestamp,
    },

    /// An error state was cleared back to idle.
    ErrorCleared {
        session_id: SessionId,
        timestamp: Timestamp,
    },
}

impl DictationEvent {
    /// Returns the timestamp of the event.
    pub fn timestamp(&self) -> Timestamp {
        match self {
            DictationEvent::SessionStarted { timestamp, .. }
            | DictationEvent::SessionAbandoned { timestamp, .. }
            | DictationEvent::SilenceAutoStop { timestamp, .. }
            | DictationEvent::TranscriptInserted { timestamp, .. }
            | DictationEvent::SessionFailed { timestamp, .. }
            | DictationEvent::ErrorCleared { timestamp, .. } => *timestamp,
        }
    }

    /// Returns a stable event name for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            DictationEvent::SessionStarted { .. } => "session_started",
            DictationEvent::SessionAbandoned { .. } => "session_abandoned",
            DictationEvent::SilenceAutoStop { .. } => "silence_auto_stop",
            DictationEvent::TranscriptInserted { .. } => "transcript_inserted",
            DictationEvent::SessionFailed { .. } => "session_failed",
            DictationEvent::ErrorCleared { .. } => "error_cleared",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_timestamp() {
        let ts = Timestamp::now();
        let event = DictationEvent::SessionStarted {
            session_id: SessionId::new(),
            timestamp: ts,
        };
        assert_eq!(event.timestamp(), ts);
    }

    #[test]
    fn test_event_names() {
        let ts = Timestamp::now();
        let id = SessionId::new();
        let cases: Vec<(DictationEvent, &str)> = vec![
            (
                DictationEvent::SessionStarted {
                    session_id: id,
                    timestamp: ts,
                },
                "session_started",
            ),
            (
                DictationEvent::SessionAbandoned {
                    session_id: id,
                    audio_secs: 0.2,
                    timestamp: ts,
                },
                "session_abandoned",
            ),
            (
                DictationEvent::SilenceAutoStop {
                    session_id: id,
                    silence_secs: 2.0,
                    timestamp: ts,
                },
                "silence_auto_stop",
            ),
            (
                DictationEvent::TranscriptInserted {
                    session_id: id,
                    text: "hello".to_string(),
                    timestamp: ts,
                },
                "transcript_inserted",
            ),
            (
                DictationEvent::SessionFailed {
                    session_id: id,
                    reason: "boom".to_string(),
                    timestamp: ts,
                },
                "session_failed",
            ),
            (
                DictationEvent::ErrorCleared {
                    session_id: id,
                    timestamp: ts,
                },
                "error_cleared",
            ),
        ];

        for (event, expected) in cases {
            assert_eq!(event.event_name(), expected);
        }
    }

    #[test]
    fn test_event_serialization_round_trip() {
        let event = DictationEvent::TranscriptInserted {
            session_id: SessionId::new(),
            text: "hello world".to_string(),
            timestamp: Timestamp::now(),
        };

        let json = serde_json::to_string(&event).unwrap();
        let rt: DictationEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(rt.event_name(), "transcript_inserted");
        assert_eq!(rt.timestamp(), event.timestamp());
        if let DictationEvent::TranscriptInserted { text, .. } = rt {
            assert_eq!(text, "hello world");
        } else {
            panic!("Expected TranscriptInserted after round trip");
        }
    }
}
