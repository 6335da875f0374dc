use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Messages exchanged between the settings surface and the sorter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RuntimeMessage {
    /// Options were written; sort again with the new settings.
    Saved,
}

/// In-process broadcast channel for [`RuntimeMessage`]s.
#[derive(Debug, Clone)]
pub struct MessageBus {
    sender: broadcast::Sender<RuntimeMessage>,
}

impl MessageBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self { sender }
    }

    pub fn publish(&self, message: RuntimeMessage) {
        // No subscribers is fine: nobody is listening for saves.
        if self.sender.send(message).is_err() {
            debug!("No listeners for {:?}", message);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RuntimeMessage> {
        self.sender.subscribe()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}
