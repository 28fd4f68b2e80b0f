//! Hierarchical cooperative cancellation.
//!
//! A [`CancelScope`] is cancelled either directly or through any of its
//! ancestors. The process owns one root scope that fires on shutdown; each
//! session supervisor derives a child scope per connection cycle, so
//! cancelling a cycle never touches the root while a process shutdown
//! reaches every cycle of every session.

use std::sync::Arc;

use futures::future::select_all;
use tokio::sync::watch;

/// A cancellation scope linked to its ancestors.
///
/// Clones share the same scope.
#[derive(Debug, Clone)]
pub struct CancelScope {
    trigger: Arc<watch::Sender<bool>>,
    /// Receivers for this scope and every ancestor, root first.
    watched: Vec<watch::Receiver<bool>>,
}

impl Default for CancelScope {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelScope {
    /// Create a root scope.
    pub fn new() -> Self {
        let (trigger, receiver) = watch::channel(false);
        Self {
            trigger: Arc::new(trigger),
            watched: vec![receiver],
        }
    }

    /// Create a scope that is cancelled whenever this one is.
    ///
    /// Cancelling the child leaves this scope untouched.
    #[must_use]
    pub fn child(&self) -> Self {
        let (trigger, receiver) = watch::channel(false);
        let mut watched = self.watched.clone();
        watched.push(receiver);
        Self {
            trigger: Arc::new(trigger),
            watched,
        }
    }

    /// Cancel this scope and every scope derived from it.
    pub fn cancel(&self) {
        self.trigger.send_replace(true);
    }

    /// Whether this scope or an ancestor has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.watched.iter().any(|receiver| *receiver.borrow())
    }

    /// Wait until this scope or an ancestor is cancelled.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        let waits = self.watched.iter().cloned().map(|mut receiver| {
            Box::pin(async move {
                // A dropped trigger can never fire.
                if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
                    std::future::pending::<()>().await;
                }
            })
        });
        select_all(waits).await;
    }
}
