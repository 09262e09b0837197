//! Cooperative shutdown signal shared between engine components.

use std::future::Future;

use tokio::sync::watch;

/// One-shot shutdown flag that many tasks can wait on.
///
/// `wait` returns an owned future so listen loops can hold it across
/// `select!` arms without borrowing the signal.
#[derive(Clone)]
pub struct Shutdown {
    sender: watch::Sender<bool>,
}

impl Shutdown {
    /// Create a new, not-yet-terminated signal.
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    /// Trip the signal. Idempotent; every current and future waiter
    /// resolves.
    pub fn shutdown(&self) {
        self.sender.send_replace(true);
    }

    /// Whether the signal has been tripped.
    pub fn is_terminated(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolve once the signal trips. Resolves immediately when it
    /// already has.
    pub fn wait(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut receiver = self.sender.subscribe();
        async move {
            while !*receiver.borrow_and_update() {
                if receiver.changed().await.is_err() {
                    return;
                }
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
