//! Shutdown coordination for the proxy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Coordinator for graceful shutdown.
///
/// A shared flag the accept loop checks between connections. Cloning yields
/// another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    triggered: Arc<AtomicBool>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger the shutdown signal. Returns `true` if it was already triggered.
    pub fn trigger(&self) -> bool {
        self.triggered.swap(true, Ordering::SeqCst)
    }

    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let shutdown = Shutdown::new();
        let handle = shutdown.clone();
        assert!(!handle.is_triggered());

        assert!(!shutdown.trigger());
        assert!(handle.is_triggered());
        assert!(handle.trigger());
    }
}
