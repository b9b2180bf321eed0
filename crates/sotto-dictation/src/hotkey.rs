//! Hotkey signal capability surface.
//!
//! Start/stop edges reach the orchestrator over an mpsc channel (see
//! `Orchestrator::drive`). The trait carries the rest of the contract: the
//! current activation mode, and a `cancel` request the engine issues so an
//! external edge-triggered toggle key does not stay latched in a phantom
//! "recording" position after a failed or auto-stopped session.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

pub use sotto_core::types::HotkeyMode;

/// A start or stop edge from the hotkey source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    Start,
    Stop,
}

/// External hotkey control consumed by the orchestrator.
pub trait HotkeySignal: Send + Sync {
    /// Current activation behavior.
    fn mode(&self) -> HotkeyMode;

    /// Reset the external edge-triggered control.
    fn cancel(&self);
}

// =============================================================================
// Mock implementation
// =============================================================================

/// Mock hotkey source for testing.
#[derive(Clone)]
pub struct MockHotkey {
    shared: Arc<MockHotkeyShared>,
}

struct MockHotkeyShared {
    mode: Mutex<HotkeyMode>,
    cancels: AtomicUsize,
    tx: mpsc::UnboundedSender<HotkeyEvent>,
}

impl MockHotkey {
    /// Create a mock hotkey plus the event receiver to hand to
    /// `Orchestrator::drive`.
    pub fn new(mode: HotkeyMode) -> (Self, mpsc::UnboundedReceiver<HotkeyEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                shared: Arc::new(MockHotkeyShared {
                    mode: Mutex::new(mode),
                    cancels: AtomicUsize::new(0),
                    tx,
                }),
            },
            rx,
        )
    }

    pub fn press_start(&self) {
        let _ = self.shared.tx.send(HotkeyEvent::Start);
    }

    pub fn press_stop(&self) {
        let _ = self.shared.tx.send(HotkeyEvent::Stop);
    }

    pub fn set_mode(&self, mode: HotkeyMode) {
        *self.shared.mode.lock().expect("mock hotkey mode poisoned") = mode;
    }

    /// Number of cancel requests the engine has issued.
    pub fn cancel_count(&self) -> usize {
        self.shared.cancels.load(Ordering::Relaxed)
    }
}

impl HotkeySignal for MockHotkey {
    fn mode(&self) -> HotkeyMode {
        *self.shared.mode.lock().expect("mock hotkey mode poisoned")
    }

    fn cancel(&self) {
        self.shared.cancels.fetch_add(1, Ordering::Relaxed);
    }
}

// =============================================================================
// Tests
// =============================================================================
