//! Cooperative run cancellation.
//!
//! A token is a shared flag checked by the pipeline at stage boundaries only.
//! An in-progress sandbox evaluation or network call is never interrupted; it
//! runs to completion (or its own timeout) before the next boundary check
//! observes the flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag for one pipeline run.
///
/// Clones observe the same flag. Cancellation is one-way: once set, the flag
/// stays set for the lifetime of the token.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Takes effect at the next stage boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
