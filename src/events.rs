use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::order::{OrderStatus, PaymentMethod};

/// Domain events emitted after state changes commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Cart events
    CartCreated(Uuid),
    CartUpdated(Uuid),
    CouponApplied { cart_id: Uuid, code: String },
    CouponRemoved { cart_id: Uuid },

    // Order events
    OrderPlaced(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },
    OrderCancelled(Uuid),
    CancellationRequested(Uuid),

    // Payment events
    PaymentConfirmed {
        order_id: Uuid,
        method: PaymentMethod,
    },

    // Wallet events
    WalletCredited { customer_id: Uuid, amount: Decimal },
    WalletDebited { customer_id: Uuid, amount: Decimal },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, surfacing channel failure to the caller.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event; a full or closed channel is logged, never fatal.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("event dropped: {}", e);
        }
    }
}

/// Background consumer for the event channel. Today this logs each event;
/// notification fan-out would hang off this loop.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        info!(?event, "event processed");
    }
    info!("event channel closed, processor exiting");
}

/// Convenience constructor: channel plus sender plus spawned processor.
pub fn start() -> (EventSender, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(1024);
    let handle = tokio::spawn(process_events(rx));
    (EventSender::new(tx), handle)
}
