use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Order;

#[derive(Debug, Deserialize, ToSchema)]
pub struct MakeRecurringRequest {
    /// weekly | biweekly | monthly | quarterly
    pub frequency: String,
    pub interval: Option<i32>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecurrenceError {
    pub order_id: Uuid,
    pub message: String,
}

/// Outcome of one scheduler pass. Individual template failures are data,
/// not process failure.
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct RecurrenceReport {
    pub processed: u32,
    pub generated: u32,
    pub errors: Vec<RecurrenceError>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TemplateList {
    pub items: Vec<Order>,
}
