use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::errors::ServiceError;

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
    pub async fn send(&self, event: Event) -> Result<(), ServiceError> {
        self.sender
            .send(event)
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))
    }

    /// Sends an event, logging instead of failing when the channel is gone.
    /// Used after a transaction has committed.
    pub async fn send_or_log(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.send(event).await {
            warn!(event = name, error = %e, "Dropping domain event");
        }
    }
}

/// Domain events emitted by the stock-update workflow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Event {
    StockUpdateRequested {
        request_id: Uuid,
        grower_id: Uuid,
        product_id: Uuid,
        variant_id: Option<Uuid>,
        current_stock: f64,
        new_stock: f64,
        occurred_at: DateTime<Utc>,
    },
    StockUpdateApproved {
        request_id: Uuid,
        grower_id: Uuid,
        product_id: Uuid,
        variant_id: Option<Uuid>,
        previous_stock: f64,
        new_stock: f64,
        approved_by: String,
        occurred_at: DateTime<Utc>,
    },
    StockUpdateRejected {
        request_id: Uuid,
        grower_id: Uuid,
        rejected_by: String,
        admin_comment: Option<String>,
        occurred_at: DateTime<Utc>,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::StockUpdateRequested { .. } => "stock_update.requested",
            Event::StockUpdateApproved { .. } => "stock_update.approved",
            Event::StockUpdateRejected { .. } => "stock_update.rejected",
        }
    }

    pub fn request_id(&self) -> Uuid {
        match self {
            Event::StockUpdateRequested { request_id, .. }
            | Event::StockUpdateApproved { request_id, .. }
            | Event::StockUpdateRejected { request_id, .. } => *request_id,
        }
    }
}

/// Drains the event channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        debug!("Received event: {:?}", event);

        match &event {
            Event::StockUpdateRequested {
                request_id,
                grower_id,
                new_stock,
                ..
            } => {
                info!(
                    event = event.name(),
                    %request_id,
                    %grower_id,
                    new_stock,
                    "Stock update awaiting validation"
                );
            }
            Event::StockUpdateApproved {
                request_id,
                previous_stock,
                new_stock,
                approved_by,
                ..
            } => {
                info!(
                    event = event.name(),
                    %request_id,
                    previous_stock,
                    new_stock,
                    approved_by = approved_by.as_str(),
                    "Stock update applied"
                );
            }
            Event::StockUpdateRejected {
                request_id,
                rejected_by,
                ..
            } => {
                info!(
                    event = event.name(),
                    %request_id,
                    rejected_by = rejected_by.as_str(),
                    "Stock update rejected"
                );
            }
        }
    }

    error!("Event channel closed; event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected() -> Event {
        Event::StockUpdateRejected {
            request_id: Uuid::new_v4(),
            grower_id: Uuid::new_v4(),
            rejected_by: "admin-1".into(),
            admin_comment: None,
            occurred_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn sender_delivers_events() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let event = rejected();

        sender.send(event.clone()).await.unwrap();
        assert_eq!(rx.recv().await, Some(event));
    }

    #[tokio::test]
    async fn send_fails_once_receiver_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        let err = sender.send(rejected()).await.unwrap_err();
        assert!(matches!(err, ServiceError::EventError(_)));

        // must not panic
        sender.send_or_log(rejected()).await;
    }

    #[tokio::test]
    async fn processing_loop_ends_when_senders_drop() {
        let (tx, rx) = mpsc::channel(4);
        let handle = tokio::spawn(process_events(rx));
        EventSender::new(tx).send(rejected()).await.unwrap();
        handle.await.unwrap();
    }
}
