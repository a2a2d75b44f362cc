use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::outbound_movement::MovementKind;

/// Domain events emitted after committed mutations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// A withdrawal request was split and persisted as 1-3 sub-orders.
    AllocationCompleted {
        origin_id: Uuid,
        requester_id: Uuid,
        movement_ids: Vec<(MovementKind, Uuid)>,
        timestamp: DateTime<Utc>,
    },
    /// An inbound or outbound movement header was persisted.
    MovementCreated {
        movement_type: String,
        movement_id: Uuid,
        series: String,
        folio: String,
    },
    /// A movement header (and its lines) was deleted.
    MovementDeleted {
        movement_type: String,
        movement_id: Uuid,
        series: String,
        folio: String,
    },
    /// A product's on-hand quantity changed.
    StockAdjusted {
        product_id: Uuid,
        old_quantity: i32,
        new_quantity: i32,
        status: String,
    },
}

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

    /// Sends an event, logging instead of failing when the channel is closed.
    /// Used after a transaction has already committed.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping event after commit: {}", e);
        }
    }
}

/// Consumes events from the channel and logs them. Downstream consumers
/// (notifications, audit) subscribe here in the wider system.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::AllocationCompleted {
                origin_id,
                requester_id,
                movement_ids,
                ..
            } => {
                info!(
                    %origin_id,
                    %requester_id,
                    sub_orders = movement_ids.len(),
                    "allocation completed"
                );
            }
            Event::MovementCreated {
                movement_type,
                movement_id,
                series,
                folio,
            } => {
                info!(%movement_type, %movement_id, %series, %folio, "movement created");
            }
            Event::MovementDeleted {
                movement_type,
                movement_id,
                series,
                folio,
            } => {
                info!(%movement_type, %movement_id, %series, %folio, "movement deleted");
            }
            Event::StockAdjusted {
                product_id,
                old_quantity,
                new_quantity,
                status,
            } => {
                info!(%product_id, old_quantity, new_quantity, %status, "stock adjusted");
            }
        }
    }

    info!("Event channel closed; stopping event processing loop");
}
