use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderItem, OrderPackaging};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderItemRequest {
    pub product_id: Uuid,
    pub price_variation_id: Uuid,
    pub quantity: Decimal,
    /// Explicit price override; when absent the current customer price is
    /// resolved and snapshotted onto the line.
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePackagingRequest {
    pub packaging_type: String,
    pub quantity: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub customer_id: Uuid,
    pub delivery_date: NaiveDate,
    pub harvest_date: Option<NaiveDate>,
    #[serde(default)]
    pub requires_invoice: bool,
    pub order_type: Option<String>,
    pub billing_frequency: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<CreateOrderItemRequest>,
    #[serde(default)]
    pub packaging: Vec<CreatePackagingRequest>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransitionRequest {
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkTransitionRequest {
    pub order_ids: Vec<Uuid>,
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FailedTransition {
    pub id: Uuid,
    pub reason: String,
}

/// Per-order outcome of a bulk transition. Final-state and template orders
/// are skipped, not failed.
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct BulkTransitionReport {
    pub successful: Vec<Uuid>,
    pub skipped: Vec<Uuid>,
    pub failed: Vec<FailedTransition>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BusinessEventRequest {
    /// Event name, e.g. `crop.planted`, `harvest.completed`.
    pub event: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordPaymentRequest {
    pub amount: Decimal,
    pub method: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub stage: String,
    pub allowed_next: Vec<String>,
    pub items: Vec<OrderItem>,
    pub packaging: Vec<OrderPackaging>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}
