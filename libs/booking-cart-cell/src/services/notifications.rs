use chrono::Utc;
use tokio::sync::broadcast;
use tracing::debug;

use crate::{CartChange, CartEvent};

pub type CartEventSender = broadcast::Sender<CartEvent>;
pub type CartEventReceiver = broadcast::Receiver<CartEvent>;

/// Fan-out of "cart changed" events so badges and other views can refresh without polling.
#[derive(Clone)]
pub struct CartNotificationService {
    sender: CartEventSender,
}

impl CartNotificationService {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> CartEventReceiver {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn notify(&self, subject_id: &str, change: CartChange, item_count: usize) {
        let event = CartEvent {
            subject_id: subject_id.to_string(),
            change,
            item_count,
            timestamp: Utc::now(),
        };

        if let Err(e) = self.sender.send(event) {
            // Nobody listening is fine.
            debug!("No subscribers for cart event of subject {}: {}", subject_id, e);
        }
    }
}

impl Default for CartNotificationService {
    fn default() -> Self {
        Self::new(256)
    }
}
