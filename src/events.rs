use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::notify::{NotificationKind, NotificationSink};

/// Domain events emitted by the lifecycle engine. Consumed asynchronously so
/// that a slow or failing consumer never blocks the status persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    PackingStarted {
        order_id: Uuid,
    },
    OrderCancelled {
        order_id: Uuid,
        reason: Option<String>,
    },
    OrderGenerated {
        template_id: Uuid,
        order_id: Uuid,
        delivery_date: NaiveDate,
    },
    PaymentRecorded {
        order_id: Uuid,
        amount: Decimal,
    },
    CropStageChanged {
        crop_id: Uuid,
        order_id: Uuid,
        stage: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Best-effort publish. Callers log the error and move on; an event that
    /// cannot be queued must never undo already-committed work.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

pub fn channel(buffer: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventSender::new(tx), rx)
}

/// Drains the event queue, logging every event and surfacing the
/// UI-relevant ones through the notification sink.
pub fn spawn_consumer(
    mut receiver: mpsc::Receiver<Event>,
    notifier: Arc<dyn NotificationSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            tracing::debug!(?event, "domain event");
            match &event {
                Event::OrderStatusChanged {
                    order_id,
                    old_status,
                    new_status,
                } => notifier.notify(
                    NotificationKind::Success,
                    "Order status updated",
                    &format!("Order {order_id}: {old_status} -> {new_status}"),
                ),
                Event::PackingStarted { order_id } => notifier.notify(
                    NotificationKind::Success,
                    "Packing started",
                    &format!("Order {order_id} entered packing"),
                ),
                Event::OrderCancelled { order_id, reason } => notifier.notify(
                    NotificationKind::Warning,
                    "Order cancelled",
                    &format!(
                        "Order {order_id} cancelled{}",
                        reason
                            .as_deref()
                            .map(|r| format!(": {r}"))
                            .unwrap_or_default()
                    ),
                ),
                Event::OrderGenerated {
                    template_id,
                    order_id,
                    delivery_date,
                } => notifier.notify(
                    NotificationKind::Success,
                    "Recurring order generated",
                    &format!(
                        "Template {template_id} spawned order {order_id} for {delivery_date}"
                    ),
                ),
                Event::PaymentRecorded { order_id, amount } => notifier.notify(
                    NotificationKind::Success,
                    "Payment received",
                    &format!("Order {order_id} received {amount}"),
                ),
                Event::CropStageChanged { .. } => {}
            }
        }
    })
}
