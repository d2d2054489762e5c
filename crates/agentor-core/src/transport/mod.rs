//! Pluggable message transport between the scheduler and workers (§6).
//!
//! The scheduler never talks to a worker's channel type directly -- it
//! goes through this narrow trait so a future distributed deployment can
//! swap the default in-process `tokio::mpsc` pair for something backed by
//! an external bus without touching scheduler code.

use agentor_types::Message;
use async_trait::async_trait;

/// A bidirectional message channel endpoint.
#[async_trait]
pub trait Channel: Send + Sync {
    async fn send(&self, message: Message) -> anyhow::Result<()>;
    async fn recv(&self) -> Option<Message>;
}

/// Default in-process implementation backed by a bounded
/// `tokio::sync::mpsc` pair.
pub struct InProcessChannel {
    tx: tokio::sync::mpsc::Sender<Message>,
    rx: tokio::sync::Mutex<tokio::sync::mpsc::Receiver<Message>>,
}

impl InProcessChannel {
    pub fn pair(capacity: usize) -> (std::sync::Arc<Self>, std::sync::Arc<Self>) {
        let (tx_a, rx_a) = tokio::sync::mpsc::channel(capacity);
        let (tx_b, rx_b) = tokio::sync::mpsc::channel(capacity);
        let a = std::sync::Arc::new(Self { tx: tx_b, rx: tokio::sync::Mutex::new(rx_a) });
        let b = std::sync::Arc::new(Self { tx: tx_a, rx: tokio::sync::Mutex::new(rx_b) });
        (a, b)
    }
}

#[async_trait]
impl Channel for InProcessChannel {
    async fn send(&self, message: Message) -> anyhow::Result<()> {
        self.tx.send(message).await.map_err(|e| anyhow::anyhow!("channel closed: {e}"))
    }

    async fn recv(&self) -> Option<Message> {
        self.rx.lock().await.recv().await
    }
}

const _: () = {
    fn _assert_object_safe(_: &dyn Channel) {}
};
