use chrono::Utc;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QuerySelect, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_status_change,
    dto::orders::{BulkTransitionReport, FailedTransition},
    entity::{
        crops::{Column as CropCol, Entity as Crops},
        invoices::{ActiveModel as InvoiceActive, Entity as Invoices},
        orders::{ActiveModel as OrderActive, Entity as Orders, Model as OrderModel},
    },
    error::{AppError, AppResult},
    events::Event,
    models::Order,
    services::{crop_plan_service::crop_stages, order_service},
    state::AppState,
    status::codes,
};

#[derive(Debug, Clone, Default)]
pub struct TransitionContext {
    pub manual: bool,
    pub notes: Option<String>,
    pub actor: Option<Uuid>,
    pub source_event: Option<String>,
}

impl TransitionContext {
    pub fn manual(actor: Uuid, notes: Option<String>) -> Self {
        Self {
            manual: true,
            notes,
            actor: Some(actor),
            source_event: None,
        }
    }

    pub fn from_event(event: &str) -> Self {
        Self {
            manual: false,
            notes: None,
            actor: None,
            source_event: Some(event.to_string()),
        }
    }
}

/// Apply a validated status transition to an order.
///
/// The status row is updated atomically under a row lock; the current status
/// is re-read inside the transaction, so a transition that loses a race
/// validates against the winner's committed status rather than overwriting
/// it. Side effects run after commit, each isolated: a failing cascade is
/// logged and surfaced but never rolls back the status change.
pub async fn transition(
    state: &AppState,
    order_id: Uuid,
    target_code: &str,
    ctx: &TransitionContext,
) -> AppResult<Order> {
    let target = state.registry.resolve(target_code)?.clone();

    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(order_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let prior = state.registry.resolve(&order.status)?.clone();
    if !state.registry.is_valid_transition(&prior.code, &target.code) {
        return Err(AppError::InvalidTransition {
            from: prior.code,
            to: target.code,
        });
    }

    let now = Utc::now();
    let confirmed_at = order.confirmed_at;
    let mut active: OrderActive = order.into();
    active.status = Set(target.code.clone());
    active.updated_at = Set(now.into());
    match target.code.as_str() {
        codes::CONFIRMED => {
            if confirmed_at.is_none() {
                active.confirmed_at = Set(Some(now.into()));
            }
        }
        codes::CANCELLED => {
            active.cancelled_at = Set(Some(now.into()));
        }
        codes::DELIVERED => {
            active.delivered_at = Set(Some(now.into()));
        }
        _ => {}
    }

    let updated = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(
        order_id = %updated.id,
        from = %prior.code,
        to = %target.code,
        manual = ctx.manual,
        source_event = ctx.source_event.as_deref().unwrap_or("-"),
        "order status transition"
    );

    apply_side_effects(state, &updated, &prior.code, ctx).await;

    if let Err(err) = log_status_change(
        &state.pool,
        ctx.actor,
        updated.id,
        &prior.code,
        prior.stage,
        &target.code,
        target.stage,
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    if let Err(err) = state
        .events
        .send(Event::OrderStatusChanged {
            order_id: updated.id,
            old_status: prior.code.clone(),
            new_status: target.code.clone(),
        })
        .await
    {
        tracing::warn!(error = %err, "event publish failed");
    }

    Ok(updated.into())
}

/// Status-specific cascades. Best-effort and mutually independent.
async fn apply_side_effects(
    state: &AppState,
    order: &OrderModel,
    prior_code: &str,
    ctx: &TransitionContext,
) {
    match order.status.as_str() {
        codes::CANCELLED => {
            if let Err(err) = cascade_cancel_crops(state, order, ctx).await {
                tracing::warn!(order_id = %order.id, error = %err, "crop cancellation cascade failed");
            }
            if let Err(err) = cancel_pending_invoice(state, order).await {
                tracing::warn!(order_id = %order.id, error = %err, "invoice cancellation failed");
            }
            if let Err(err) = state
                .events
                .send(Event::OrderCancelled {
                    order_id: order.id,
                    reason: ctx.notes.clone(),
                })
                .await
            {
                tracing::warn!(error = %err, "event publish failed");
            }
        }
        codes::DELIVERED => {
            if let Err(err) = settle_invoice_if_paid(state, order).await {
                tracing::warn!(order_id = %order.id, error = %err, "invoice settlement failed");
            }
        }
        codes::PACKING => {
            // exactly once per entry into packing
            if prior_code != codes::PACKING {
                if let Err(err) = state
                    .events
                    .send(Event::PackingStarted { order_id: order.id })
                    .await
                {
                    tracing::warn!(error = %err, "event publish failed");
                }
            }
        }
        codes::HARVESTING => {
            if let Err(err) = advance_ready_crops(state, order).await {
                tracing::warn!(order_id = %order.id, error = %err, "crop harvest advance failed");
            }
        }
        _ => {}
    }
}

/// Cancel every crop on the order that has not been harvested, recording the
/// reason. Already-cancelled and harvested crops are untouched.
async fn cascade_cancel_crops(
    state: &AppState,
    order: &OrderModel,
    ctx: &TransitionContext,
) -> AppResult<()> {
    let reason = ctx
        .notes
        .clone()
        .unwrap_or_else(|| "Order cancelled".to_string());
    let now = Utc::now();
    Crops::update_many()
        .col_expr(CropCol::Stage, Expr::value(crop_stages::CANCELLED))
        .col_expr(
            CropCol::CancelledAt,
            Expr::value(sea_orm::prelude::DateTimeWithTimeZone::from(now)),
        )
        .col_expr(CropCol::CancelReason, Expr::value(reason))
        .filter(
            Condition::all()
                .add(CropCol::OrderId.eq(order.id))
                .add(CropCol::Stage.ne(crop_stages::HARVESTED))
                .add(CropCol::Stage.ne(crop_stages::CANCELLED)),
        )
        .exec(&state.orm)
        .await?;
    Ok(())
}

/// A pending invoice on a cancelled order is cancelled; a paid one is left
/// untouched.
async fn cancel_pending_invoice(state: &AppState, order: &OrderModel) -> AppResult<()> {
    let Some(invoice_id) = order.invoice_id else {
        return Ok(());
    };
    let Some(invoice) = Invoices::find_by_id(invoice_id).one(&state.orm).await? else {
        return Ok(());
    };
    if invoice.status != "pending" {
        return Ok(());
    }
    let mut active: InvoiceActive = invoice.into();
    active.status = Set("cancelled".to_string());
    active.cancelled_at = Set(Some(Utc::now().into()));
    active.update(&state.orm).await?;
    Ok(())
}

async fn settle_invoice_if_paid(state: &AppState, order: &OrderModel) -> AppResult<()> {
    let Some(invoice_id) = order.invoice_id else {
        return Ok(());
    };
    if !order_service::fully_paid(&state.orm, order).await? {
        return Ok(());
    }
    let Some(invoice) = Invoices::find_by_id(invoice_id).one(&state.orm).await? else {
        return Ok(());
    };
    if invoice.status != "pending" {
        return Ok(());
    }
    let mut active: InvoiceActive = invoice.into();
    active.status = Set("paid".to_string());
    active.paid_at = Set(Some(Utc::now().into()));
    active.update(&state.orm).await?;
    Ok(())
}

/// Every crop on the order that is individually ready to harvest moves to
/// the harvesting stage together with the order.
async fn advance_ready_crops(state: &AppState, order: &OrderModel) -> AppResult<()> {
    Crops::update_many()
        .col_expr(CropCol::Stage, Expr::value(crop_stages::HARVESTING))
        .filter(
            Condition::all()
                .add(CropCol::OrderId.eq(order.id))
                .add(CropCol::Stage.eq(crop_stages::READY_TO_HARVEST)),
        )
        .exec(&state.orm)
        .await?;
    Ok(())
}

/// Evaluate each order independently. Orders already in a final state and
/// template orders are skipped, not failed; a bad target status fails the
/// whole request.
pub async fn bulk_transition(
    state: &AppState,
    order_ids: Vec<Uuid>,
    target_code: &str,
    ctx: &TransitionContext,
) -> AppResult<BulkTransitionReport> {
    state.registry.resolve(target_code)?;

    let mut report = BulkTransitionReport::default();
    for order_id in order_ids {
        let order = Orders::find_by_id(order_id).one(&state.orm).await?;
        let Some(order) = order else {
            report.failed.push(FailedTransition {
                id: order_id,
                reason: "order not found".to_string(),
            });
            continue;
        };

        let is_final = state
            .registry
            .get(&order.status)
            .map(|def| def.is_final)
            .unwrap_or(false);
        if order.status == codes::TEMPLATE || is_final {
            report.skipped.push(order_id);
            continue;
        }

        match transition(state, order_id, target_code, ctx).await {
            Ok(_) => report.successful.push(order_id),
            Err(err) => report.failed.push(FailedTransition {
                id: order_id,
                reason: err.to_string(),
            }),
        }
    }
    Ok(report)
}
