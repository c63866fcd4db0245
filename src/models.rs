use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity;

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub grams_per_tray: Decimal,
    pub grow_days: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PriceVariation {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub unit: String,
    pub unit_grams: Decimal,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: String,
    pub order_type: String,
    pub billing_frequency: String,
    pub total_amount: Decimal,
    pub requires_invoice: bool,
    pub is_recurring: bool,
    pub is_recurring_active: bool,
    pub parent_recurring_order_id: Option<Uuid>,
    pub recurring_frequency: Option<String>,
    pub recurring_interval: Option<i32>,
    pub recurring_start_date: Option<NaiveDate>,
    pub recurring_end_date: Option<NaiveDate>,
    pub next_generation_date: Option<NaiveDate>,
    pub last_generated_at: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub harvest_date: Option<NaiveDate>,
    pub invoice_id: Option<Uuid>,
    pub consolidated_invoice_id: Option<Uuid>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// A template defines a recurrence and is never delivered itself.
    pub fn is_template(&self) -> bool {
        self.is_recurring && self.parent_recurring_order_id.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub price_variation_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderPackaging {
    pub id: Uuid,
    pub order_id: Uuid,
    pub packaging_type: String,
    pub quantity: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CropPlan {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub batch_id: Option<Uuid>,
    pub status: String,
    pub trays_needed: i32,
    pub grams_needed: Decimal,
    pub plant_by_date: NaiveDate,
    pub expected_harvest_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Crop {
    pub id: Uuid,
    pub crop_plan_id: Uuid,
    pub order_id: Uuid,
    pub stage: String,
    pub planted_at: Option<DateTime<Utc>>,
    pub harvested_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Invoice {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub order_id: Option<Uuid>,
    pub status: String,
    pub total_amount: Decimal,
    pub is_consolidated: bool,
    pub issued_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount: Decimal,
    pub method: String,
    pub received_at: DateTime<Utc>,
}

/// Order total as the sum of quantity x unit price over the line items.
/// Quantities may be fractional (weight-based goods) and prices negative
/// (discount lines); `Decimal` keeps the arithmetic exact.
pub fn items_total(items: &[OrderItem]) -> Decimal {
    items.iter().map(|i| i.quantity * i.unit_price).sum()
}

impl From<entity::orders::Model> for Order {
    fn from(model: entity::orders::Model) -> Self {
        Order {
            id: model.id,
            customer_id: model.customer_id,
            status: model.status,
            order_type: model.order_type,
            billing_frequency: model.billing_frequency,
            total_amount: model.total_amount,
            requires_invoice: model.requires_invoice,
            is_recurring: model.is_recurring,
            is_recurring_active: model.is_recurring_active,
            parent_recurring_order_id: model.parent_recurring_order_id,
            recurring_frequency: model.recurring_frequency,
            recurring_interval: model.recurring_interval,
            recurring_start_date: model.recurring_start_date,
            recurring_end_date: model.recurring_end_date,
            next_generation_date: model.next_generation_date,
            last_generated_at: model.last_generated_at,
            delivery_date: model.delivery_date,
            harvest_date: model.harvest_date,
            invoice_id: model.invoice_id,
            consolidated_invoice_id: model.consolidated_invoice_id,
            confirmed_at: model.confirmed_at.map(|dt| dt.with_timezone(&Utc)),
            cancelled_at: model.cancelled_at.map(|dt| dt.with_timezone(&Utc)),
            delivered_at: model.delivered_at.map(|dt| dt.with_timezone(&Utc)),
            notes: model.notes,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<entity::order_items::Model> for OrderItem {
    fn from(model: entity::order_items::Model) -> Self {
        OrderItem {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            price_variation_id: model.price_variation_id,
            quantity: model.quantity,
            unit_price: model.unit_price,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<entity::order_packaging::Model> for OrderPackaging {
    fn from(model: entity::order_packaging::Model) -> Self {
        OrderPackaging {
            id: model.id,
            order_id: model.order_id,
            packaging_type: model.packaging_type,
            quantity: model.quantity,
            notes: model.notes,
        }
    }
}

impl From<entity::crop_plans::Model> for CropPlan {
    fn from(model: entity::crop_plans::Model) -> Self {
        CropPlan {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            batch_id: model.batch_id,
            status: model.status,
            trays_needed: model.trays_needed,
            grams_needed: model.grams_needed,
            plant_by_date: model.plant_by_date,
            expected_harvest_date: model.expected_harvest_date,
        }
    }
}

impl From<entity::crops::Model> for Crop {
    fn from(model: entity::crops::Model) -> Self {
        Crop {
            id: model.id,
            crop_plan_id: model.crop_plan_id,
            order_id: model.order_id,
            stage: model.stage,
            planted_at: model.planted_at.map(|dt| dt.with_timezone(&Utc)),
            harvested_at: model.harvested_at.map(|dt| dt.with_timezone(&Utc)),
            cancelled_at: model.cancelled_at.map(|dt| dt.with_timezone(&Utc)),
            cancel_reason: model.cancel_reason,
        }
    }
}

impl From<entity::invoices::Model> for Invoice {
    fn from(model: entity::invoices::Model) -> Self {
        Invoice {
            id: model.id,
            customer_id: model.customer_id,
            order_id: model.order_id,
            status: model.status,
            total_amount: model.total_amount,
            is_consolidated: model.is_consolidated,
            issued_at: model.issued_at.with_timezone(&Utc),
            paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
            cancelled_at: model.cancelled_at.map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

impl From<entity::payments::Model> for Payment {
    fn from(model: entity::payments::Model) -> Self {
        Payment {
            id: model.id,
            order_id: model.order_id,
            amount: model.amount,
            method: model.method,
            received_at: model.received_at.with_timezone(&Utc),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(quantity: Decimal, unit_price: Decimal) -> OrderItem {
        OrderItem {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            price_variation_id: Uuid::new_v4(),
            quantity,
            unit_price,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn total_sums_quantity_times_price() {
        let items = vec![item(dec!(5), dec!(10)), item(dec!(2), dec!(3.50))];
        assert_eq!(items_total(&items), dec!(57));
    }

    #[test]
    fn total_tolerates_negative_and_fractional_values() {
        let items = vec![
            item(dec!(0.250), dec!(48)),      // 12
            item(dec!(1), dec!(-2.50)),       // discount line
            item(dec!(0), dec!(999999.99)),   // zero quantity
        ];
        let total = items_total(&items);
        assert!((total - dec!(9.50)).abs() < dec!(0.001));
    }

    #[test]
    fn total_keeps_precision_at_large_magnitudes() {
        let items = vec![
            item(dec!(1000000), dec!(0.001)),
            item(dec!(0.001), dec!(1000000)),
        ];
        assert!((items_total(&items) - dec!(2000)).abs() < dec!(0.001));
    }

    #[test]
    fn empty_order_totals_zero() {
        assert_eq!(items_total(&[]), Decimal::ZERO);
    }
}
