//! Test doubles shared by the service and HTTP tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::enhance::{EnhanceError, Enhancer};

/// Enhancer that upper-cases its input and counts provider calls.
pub struct CountingEnhancer {
    calls: AtomicUsize,
    configured: bool,
    fail_next: AtomicBool,
}

impl CountingEnhancer {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            configured: true,
            fail_next: AtomicBool::new(false),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Enhancer for CountingEnhancer {
    async fn enhance(&self, prompt: &str) -> Result<String, EnhanceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(EnhanceError::Provider {
                status: 503,
                body: "provider unavailable".into(),
            });
        }
        Ok(format!("ENHANCED: {}", prompt.to_uppercase()))
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}
