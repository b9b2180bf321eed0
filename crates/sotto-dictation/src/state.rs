//! Dictation lifecycle states and the legal transitions between them.
//!
//! - Idle -> Recording (start dictation)
//! - Recording -> Processing (capture stopped, final transcription running)
//! - Recording -> Idle (capture too short, quiet abandon)
//! - Processing -> Inserting (transcription produced text)
//! - Processing -> Idle (transcription produced nothing)
//! - Inserting -> Idle (text delivered)
//! - any -> Error (precondition or service failure)
//! - Error -> Idle (guarded auto-clear)

use std::fmt;

/// Operational state of a dictation session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictationState {
    /// No dictation in progress. Ready to start.
    Idle,
    /// Actively capturing speech from the microphone.
    Recording,
    /// Running the final transcription over the captured audio.
    Processing,
    /// Delivering transcribed text to the output sink.
    Inserting,
    /// A failure surfaced to the user; clears back to Idle automatically.
    Error(String),
}

impl fmt::Display for DictationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DictationState::Idle => write!(f, "Idle"),
            DictationState::Recording => write!(f, "Recording"),
            DictationState::Processing => write!(f, "Processing"),
            DictationState::Inserting => write!(f, "Inserting"),
            DictationState::Error(_) => write!(f, "Error"),
        }
    }
}

impl DictationState {
    /// Returns whether this is the error state.
    pub fn is_error(&self) -> bool {
        matches!(self, DictationState::Error(_))
    }

    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &DictationState) -> bool {
        // Any precondition or service failure may enter the error state.
        if target.is_error() {
            return true;
        }
        matches!(
            (self, target),
            (DictationState::Idle, DictationState::Recording)
                | (DictationState::Recording, DictationState::Processing)
                | (DictationState::Processing, DictationState::Inserting)
                | (DictationState::Inserting, DictationState::Idle)
                | (DictationState::Processing, DictationState::Idle)
                // Quiet abandon of a too-short capture
                | (DictationState::Recording, DictationState::Idle)
                | (DictationState::Error(_), DictationState::Idle)
        )
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(DictationState::Idle.to_string(), "Idle");
        assert_eq!(DictationState::Recording.to_string(), "Recording");
        assert_eq!(DictationState::Processing.to_string(), "Processing");
        assert_eq!(DictationState::Inserting.to_string(), "Inserting");
        assert_eq!(DictationState::Error("x".into()).to_string(), "Error");
    }

    #[test]
    fn test_valid_transitions() {
        // Forward path
        assert!(DictationState::Idle.can_transition_to(&DictationState::Recording));
        assert!(DictationState::Recording.can_transition_to(&DictationState::Processing));
        assert!(DictationState::Processing.can_transition_to(&DictationState::Inserting));
        assert!(DictationState::Inserting.can_transition_to(&DictationState::Idle));

        // Early exits
        assert!(DictationState::Recording.can_transition_to(&DictationState::Idle));
        assert!(DictationState::Processing.can_transition_to(&DictationState::Idle));
    }

    #[test]
    fn test_error_reachable_from_everywhere() {
        let error = DictationState::Error("failure".into());
        assert!(DictationState::Idle.can_transition_to(&error));
        assert!(DictationState::Recording.can_transition_to(&error));
        assert!(DictationState::Processing.can_transition_to(&error));
        assert!(DictationState::Inserting.can_transition_to(&error));
        assert!(DictationState::Error("earlier".into()).can_transition_to(&error));
    }

    #[test]
    fn test_error_clears_only_to_idle() {
        let error = DictationState::Error("failure".into());
        assert!(error.can_transition_to(&DictationState::Idle));
        assert!(!error.can_transition_to(&DictationState::Recording));
        assert!(!error.can_transition_to(&DictationState::Processing));
        assert!(!error.can_transition_to(&DictationState::Inserting));
    }

    #[test]
    fn test_invalid_transitions() {
        // Cannot skip states
        assert!(!DictationState::Idle.can_transition_to(&DictationState::Processing));
        assert!(!DictationState::Idle.can_transition_to(&DictationState::Inserting));
        assert!(!DictationState::Recording.can_transition_to(&DictationState::Inserting));

        // Cannot go backwards
        assert!(!DictationState::Processing.can_transition_to(&DictationState::Recording));
        assert!(!DictationState::Inserting.can_transition_to(&DictationState::Recording));
        assert!(!DictationState::Inserting.can_transition_to(&DictationState::Processing));

        // Cannot transition to self
        assert!(!DictationState::Idle.can_transition_to(&DictationState::Idle));
        assert!(!DictationState::Recording.can_transition_to(&DictationState::Recording));
    }

    #[test]
    fn test_is_error() {
        assert!(DictationState::Error("anything".into()).is_error());
        assert!(!DictationState::Idle.is_error());
        assert!(!DictationState::Recording.is_error());
    }
}
