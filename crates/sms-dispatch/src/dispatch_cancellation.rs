//! Cooperative cancellation for an in-flight dispatch.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

pub struct DispatchCancelHandle {
    sender: watch::Sender<bool>,
}

impl DispatchCancelHandle {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Cancels once `deadline` elapses. Abort the returned handle to disarm.
    pub fn cancel_after(self, deadline: Duration) -> JoinHandle<()> {
        self.cancel_after_or_with(deadline, DispatchCancellation::never())
    }

    /// Cancels once `deadline` elapses or `upstream` is cancelled, whichever
    /// comes first. Abort the returned handle to disarm.
    pub fn cancel_after_or_with(
        self,
        deadline: Duration,
        mut upstream: DispatchCancellation,
    ) -> JoinHandle<()> {
        if upstream.is_cancelled() {
            self.cancel();
        }
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(deadline) => {
                    tracing::debug!(
                        deadline_ms = deadline.as_millis() as u64,
                        "dispatch deadline elapsed; cancelling"
                    );
                }
                _ = upstream.cancelled() => {
                    tracing::debug!("upstream cancellation observed; cancelling dispatch");
                }
            }
            self.cancel();
        })
    }
}

#[derive(Debug, Clone)]
pub struct DispatchCancellation {
    receiver: watch::Receiver<bool>,
}

pub fn dispatch_cancellation() -> (DispatchCancelHandle, DispatchCancellation) {
    let (sender, receiver) = watch::channel(false);
    (
        DispatchCancelHandle { sender },
        DispatchCancellation { receiver },
    )
}

impl DispatchCancellation {
    /// A token that is never cancelled.
    pub fn never() -> Self {
        let (_, cancellation) = dispatch_cancellation();
        cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once cancellation is requested. Pends forever if the handle is
    /// dropped without cancelling.
    pub async fn cancelled(&mut self) {
        if self.receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
