use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    entity::{
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        order_packaging::{
            ActiveModel as PackagingActive, Column as PackagingCol, Entity as OrderPackaging,
        },
        orders::{ActiveModel as OrderActive, Model as OrderModel},
    },
    error::AppResult,
    events::Event,
    models::Order,
    notify::NotificationKind,
    services::pricing_service,
    state::AppState,
    status::codes,
};

/// Materialize a concrete order from a recurring template.
///
/// Line items and packaging are copied from the template, but every line is
/// re-priced against the customer's current pricing — template prices are a
/// definition from the past and must never leak into a new order. Quantities
/// are copied verbatim, zero and oversized values included.
pub async fn generate_from_template(
    state: &AppState,
    template: &OrderModel,
    harvest_date: NaiveDate,
    delivery_date: NaiveDate,
) -> AppResult<Order> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(template.id))
        .all(&state.orm)
        .await?;
    let packaging = OrderPackaging::find()
        .filter(PackagingCol::OrderId.eq(template.id))
        .all(&state.orm)
        .await?;

    let txn = state.orm.begin().await?;

    let mut priced_items = Vec::with_capacity(items.len());
    let mut total = Decimal::ZERO;
    for item in &items {
        let unit_price =
            pricing_service::price_for(&txn, template.customer_id, item.price_variation_id).await?;
        total += item.quantity * unit_price;
        priced_items.push((item, unit_price));
    }

    let order_id = Uuid::new_v4();
    let order = OrderActive {
        id: Set(order_id),
        customer_id: Set(template.customer_id),
        status: Set(codes::PENDING.to_string()),
        order_type: Set(template.order_type.clone()),
        billing_frequency: Set(template.billing_frequency.clone()),
        total_amount: Set(total),
        requires_invoice: Set(template.requires_invoice),
        is_recurring: Set(false),
        is_recurring_active: Set(false),
        parent_recurring_order_id: Set(Some(template.id)),
        recurring_frequency: Set(None),
        recurring_interval: Set(None),
        recurring_start_date: Set(None),
        recurring_end_date: Set(None),
        next_generation_date: Set(None),
        last_generated_at: Set(None),
        delivery_date: Set(Some(delivery_date)),
        harvest_date: Set(Some(harvest_date)),
        invoice_id: Set(None),
        consolidated_invoice_id: Set(None),
        confirmed_at: Set(None),
        cancelled_at: Set(None),
        delivered_at: Set(None),
        notes: Set(template.notes.clone()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    for (item, unit_price) in priced_items {
        OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(item.product_id),
            price_variation_id: Set(item.price_variation_id),
            quantity: Set(item.quantity),
            unit_price: Set(unit_price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
    }

    for pack in &packaging {
        PackagingActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            packaging_type: Set(pack.packaging_type.clone()),
            quantity: Set(pack.quantity),
            notes: Set(pack.notes.clone()),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        None,
        "order_generated",
        Some("orders"),
        Some(serde_json::json!({
            "template_id": template.id,
            "order_id": order_id,
            "delivery_date": delivery_date,
            "total_amount": total,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    if let Err(err) = state
        .events
        .send(Event::OrderGenerated {
            template_id: template.id,
            order_id,
            delivery_date,
        })
        .await
    {
        tracing::warn!(error = %err, "event publish failed");
    }

    state.notifier.notify(
        NotificationKind::Success,
        "Order generated",
        &format!("Template {} spawned order {order_id} for {delivery_date}", template.id),
    );

    Ok(order.into())
}
