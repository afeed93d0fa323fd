use crate::events::types::UploadEvent;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Fan-out point for [`UploadEvent`]s, scoped to one scheduler.
///
/// `emit` never blocks; each subscriber gets every event emitted after it
/// subscribed, in emission order. Dropped receivers are pruned on the next
/// emit.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<UploadEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<UploadEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn emit(&self, event: UploadEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
