//! Sotto Dictation crate - the dictation orchestration engine.
//!
//! Turns hotkey edges into captured audio, drives incremental and final
//! transcription, and delivers the resulting text to an output sink while
//! tracking a single observable session state. The `Orchestrator` owns the
//! session record exclusively; the streaming loop, silence watcher, and
//! duration timer are cancellable background tasks that communicate with it
//! only through guarded publish helpers, so no two state mutations ever race.

pub mod hotkey;
pub mod insert;
pub mod orchestrator;
pub mod state;

mod session;
mod silence;
mod streaming;
mod timer;

pub use hotkey::{HotkeyEvent, HotkeyMode, HotkeySignal, MockHotkey};
pub use insert::{MockTextSink, TextSink};
pub use orchestrator::{DictationOptions, Orchestrator, Tuning};
pub use state::DictationState;
