use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Channel-backed sender handed to every service. Sending is best-effort
/// from the caller's point of view: services log a failed send and move on,
/// the core operation never fails because the sink is down.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Fire-and-forget variant: a full or closed channel is logged at warn
    /// level and otherwise ignored.
    pub async fn send_discard(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "event sink unavailable; dropping event");
        }
    }
}

// The events that can occur in the fulfillment core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Delivery note lifecycle
    DeliveryNoteCreated(Uuid),
    DeliveryNotePosted {
        delivery_note_id: Uuid,
        lines_shipped: u32,
        lines_pending: u32,
    },
    DeliveryNoteDelivered(Uuid),
    DeliveryNoteCancelled(Uuid),
    DropshipStatusAdvanced {
        delivery_note_id: Uuid,
        line_id: Uuid,
        new_status: String,
    },

    // Inbound / return documents
    GoodsReceiptPosted(Uuid),
    PurchaseReturnSettled(Uuid),
    SalesReturnSettled(Uuid),

    // Stock movements and threshold notifications
    StockMutated {
        item_id: Uuid,
        warehouse_id: Uuid,
        previous_quantity: i32,
        new_quantity: i32,
        document_kind: String,
        document_id: Uuid,
    },
    StockBelowMinimum {
        item_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
        min_stock: i32,
    },
    StockAboveMaximum {
        item_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
        max_stock: i32,
    },

    // Generic event for custom messages
    Generic {
        message: String,
        timestamp: DateTime<Utc>,
        metadata: serde_json::Value,
    },
}

impl Event {
    /// Create a generic event with string data
    pub fn with_data(data: String) -> Self {
        Event::Generic {
            message: data,
            timestamp: Utc::now(),
            metadata: serde_json::Value::Null,
        }
    }
}

// Function to process incoming events. The embedding application would wire
// real handlers (toast notifications, reorder workflows) here; the core only
// guarantees delivery into this pump.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::StockBelowMinimum {
                item_id,
                warehouse_id,
                quantity,
                min_stock,
            } => {
                warn!(
                    %item_id,
                    %warehouse_id,
                    quantity,
                    min_stock,
                    "stock dropped below minimum threshold"
                );
            }
            Event::StockAboveMaximum {
                item_id,
                warehouse_id,
                quantity,
                max_stock,
            } => {
                warn!(
                    %item_id,
                    %warehouse_id,
                    quantity,
                    max_stock,
                    "stock exceeded maximum threshold"
                );
            }
            Event::DeliveryNotePosted {
                delivery_note_id,
                lines_shipped,
                lines_pending,
            } => {
                info!(
                    %delivery_note_id,
                    lines_shipped,
                    lines_pending,
                    "delivery note posted"
                );
            }
            other => {
                info!("Received event: {:?}", other);
            }
        }
    }

    warn!("Event processing loop has ended");
}
