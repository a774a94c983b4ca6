//! Caller-driven cancellation of an in-flight bulk write.

use tokio::sync::watch;

/// Held by the caller; triggering it abandons in-flight sends
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    sender: std::sync::Arc<watch::Sender<bool>>,
}

/// Observed by the executor
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    receiver: watch::Receiver<bool>,
}

impl CancellationHandle {
    /// Create a linked handle/signal pair
    pub fn new() -> (Self, CancellationSignal) {
        let (sender, receiver) = watch::channel(false);
        (
            Self {
                sender: std::sync::Arc::new(sender),
            },
            CancellationSignal { receiver },
        )
    }

    pub fn cancel(&self) {
        // send_replace never fails, even with no live receivers
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }
}

impl CancellationSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        let (_, signal) = CancellationHandle::new();
        signal
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once cancellation is requested
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            // Handle dropped without cancelling
            std::future::pending::<()>().await;
        }
    }
}
