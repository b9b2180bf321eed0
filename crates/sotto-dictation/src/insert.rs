//! Text sink capability surface.
//!
//! The concrete sink is host-platform machinery (accessibility APIs,
//! synthetic keystrokes); the engine only hands it finished text and asks
//! about the accessibility grant.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use sotto_core::error::{Result, SottoError};

/// Destination for finished dictation text.
pub trait TextSink: Send + Sync {
    /// Whether the host has granted the access needed to insert text.
    fn is_accessibility_granted(&self) -> bool;

    /// Open the host permission prompt.
    fn request_accessibility_permission(&self);

    /// Deliver text into the focused application.
    fn insert_text(&self, text: &str) -> impl Future<Output = Result<()>> + Send;
}

// =============================================================================
// Mock implementation
// =============================================================================

/// Mock text sink for testing. Records every insertion.
#[derive(Clone)]
pub struct MockTextSink {
    shared: Arc<MockSinkShared>,
}

struct MockSinkShared {
    granted: AtomicBool,
    fail_next: AtomicBool,
    permission_requests: AtomicUsize,
    inserted: Mutex<Vec<String>>,
}

impl MockTextSink {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(MockSinkShared {
                granted: AtomicBool::new(true),
                fail_next: AtomicBool::new(false),
                permission_requests: AtomicUsize::new(0),
                inserted: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn set_accessibility_granted(&self, granted: bool) {
        self.shared.granted.store(granted, Ordering::Relaxed);
    }

    /// Make the next `insert_text` call fail.
    pub fn fail_next_insert(&self) {
        self.shared.fail_next.store(true, Ordering::Relaxed);
    }

    /// Every text delivered so far, in order.
    pub fn inserted(&self) -> Vec<String> {
        self.shared
            .inserted
            .lock()
            .expect("mock sink inserted poisoned")
            .clone()
    }

    pub fn permission_request_count(&self) -> usize {
        self.shared.permission_requests.load(Ordering::Relaxed)
    }
}

impl Default for MockTextSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TextSink for MockTextSink {
    fn is_accessibility_granted(&self) -> bool {
        self.shared.granted.load(Ordering::Relaxed)
    }

    fn request_accessibility_permission(&self) {
        self.shared.permission_requests.fetch_add(1, Ordering::Relaxed);
    }

    async fn insert_text(&self, text: &str) -> Result<()> {
        if self.shared.fail_next.swap(false, Ordering::Relaxed) {
            return Err(SottoError::Insertion(
                "Target application rejected the text".to_string(),
            ));
        }
        self.shared
            .inserted
            .lock()
            .expect("mock sink inserted poisoned")
            .push(text.to_string());
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
