use chrono::{Days, Utc};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{CreateOrderRequest, OrderList, OrderWithItems, RecordPaymentRequest},
    dto::recurring::TemplateList,
    entity::{
        customers::Entity as Customers,
        invoices::{ActiveModel as InvoiceActive, Entity as Invoices},
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        order_packaging::{
            ActiveModel as PackagingActive, Column as PackagingCol, Entity as OrderPackaging,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        payments::{ActiveModel as PaymentActive, Column as PaymentCol, Entity as Payments},
    },
    error::{AppError, AppResult},
    events::Event,
    models::{Invoice, Order, Payment},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::pricing_service,
    state::AppState,
    status::codes,
};

/// The paid/unpaid signal consumed by the state machine: the sum of recorded
/// payments covers the order total.
pub async fn fully_paid<C: ConnectionTrait>(conn: &C, order: &OrderModel) -> AppResult<bool> {
    let payments = Payments::find()
        .filter(PaymentCol::OrderId.eq(order.id))
        .all(conn)
        .await?;
    let paid: Decimal = payments.iter().map(|p| p.amount).sum();
    Ok(paid >= order.total_amount)
}

pub async fn list_orders(
    state: &AppState,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }
    if let Some(stage) = query.stage.as_ref().filter(|s| !s.is_empty()) {
        // stage filters expand to the set of codes in that stage
        let codes_in_stage: Vec<String> = state
            .registry
            .codes()
            .filter(|code| {
                state
                    .registry
                    .get(code)
                    .map(|def| def.stage.as_str() == stage)
                    .unwrap_or(false)
            })
            .map(|c| c.to_string())
            .collect();
        condition = condition.add(OrderCol::Status.is_in(codes_in_stage));
    }
    if let Some(customer_id) = query.customer_id {
        condition = condition.add(OrderCol::CustomerId.eq(customer_id));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Orders",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(state: &AppState, id: Uuid) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let details = assemble_order(state, order).await?;
    Ok(ApiResponse::success("Order", details, Some(Meta::empty())))
}

async fn assemble_order(state: &AppState, order: OrderModel) -> AppResult<OrderWithItems> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    let packaging = OrderPackaging::find()
        .filter(PackagingCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let stage = state
        .registry
        .get(&order.status)
        .map(|def| def.stage.as_str().to_string())
        .unwrap_or_default();
    let mut allowed_next: Vec<String> = state.registry.allowed_next(&order.status).into_iter().collect();
    allowed_next.sort();

    Ok(OrderWithItems {
        order: order.into(),
        stage,
        allowed_next,
        items,
        packaging,
    })
}

/// Create a standalone order. Line prices default to the customer's current
/// pricing unless the request carries an explicit override.
pub async fn create_order(
    state: &AppState,
    actor: Uuid,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("Order has no line items".into()));
    }
    Customers::find_by_id(payload.customer_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::BadRequest("Unknown customer".into()))?;

    let harvest_date = match payload.harvest_date {
        Some(d) => d,
        None => payload
            .delivery_date
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| AppError::BadRequest("Delivery date out of range".into()))?,
    };

    let txn = state.orm.begin().await?;

    let mut total = Decimal::ZERO;
    let mut priced = Vec::with_capacity(payload.items.len());
    for item in &payload.items {
        let unit_price = match item.unit_price {
            Some(price) => price,
            None => {
                pricing_service::price_for(&txn, payload.customer_id, item.price_variation_id)
                    .await?
            }
        };
        total += item.quantity * unit_price;
        priced.push((item, unit_price));
    }

    let order_id = Uuid::new_v4();
    let order = OrderActive {
        id: Set(order_id),
        customer_id: Set(payload.customer_id),
        status: Set(codes::PENDING.to_string()),
        order_type: Set(payload
            .order_type
            .clone()
            .unwrap_or_else(|| "standard".to_string())),
        billing_frequency: Set(payload
            .billing_frequency
            .clone()
            .unwrap_or_else(|| "per_order".to_string())),
        total_amount: Set(total),
        requires_invoice: Set(payload.requires_invoice),
        is_recurring: Set(false),
        is_recurring_active: Set(false),
        parent_recurring_order_id: Set(None),
        recurring_frequency: Set(None),
        recurring_interval: Set(None),
        recurring_start_date: Set(None),
        recurring_end_date: Set(None),
        next_generation_date: Set(None),
        last_generated_at: Set(None),
        delivery_date: Set(Some(payload.delivery_date)),
        harvest_date: Set(Some(harvest_date)),
        invoice_id: Set(None),
        consolidated_invoice_id: Set(None),
        confirmed_at: Set(None),
        cancelled_at: Set(None),
        delivered_at: Set(None),
        notes: Set(payload.notes.clone()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    for (item, unit_price) in priced {
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

    for pack in &payload.packaging {
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
        Some(actor),
        "order_create",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order_id, "total_amount": total })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let details = assemble_order(state, order).await?;
    Ok(ApiResponse::success(
        "Order created",
        details,
        Some(Meta::empty()),
    ))
}

/// Record a payment against an order. Routing the resulting
/// `payment.received` business event is the caller's concern.
pub async fn record_payment(
    state: &AppState,
    actor: Uuid,
    order_id: Uuid,
    payload: RecordPaymentRequest,
) -> AppResult<Payment> {
    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if order.status == codes::TEMPLATE {
        return Err(AppError::BadRequest(
            "Payments cannot be recorded against a template".into(),
        ));
    }

    let payment = PaymentActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        amount: Set(payload.amount),
        method: Set(payload.method.unwrap_or_else(|| "transfer".to_string())),
        received_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = state
        .events
        .send(Event::PaymentRecorded {
            order_id,
            amount: payment.amount,
        })
        .await
    {
        tracing::warn!(error = %err, "event publish failed");
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(actor),
        "payment_recorded",
        Some("payments"),
        Some(serde_json::json!({ "order_id": order_id, "amount": payment.amount })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(payment.into())
}

/// Issue the pending invoice for an order.
pub async fn issue_invoice(state: &AppState, actor: Uuid, order_id: Uuid) -> AppResult<Invoice> {
    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if order.status == codes::TEMPLATE {
        return Err(AppError::BadRequest("Templates are not invoiced".into()));
    }
    if order.invoice_id.is_some() {
        return Err(AppError::BadRequest("Order already has an invoice".into()));
    }

    let txn = state.orm.begin().await?;

    let invoice = InvoiceActive {
        id: Set(Uuid::new_v4()),
        customer_id: Set(order.customer_id),
        order_id: Set(Some(order.id)),
        status: Set("pending".to_string()),
        total_amount: Set(order.total_amount),
        is_consolidated: Set(false),
        issued_at: NotSet,
        paid_at: Set(None),
        cancelled_at: Set(None),
    }
    .insert(&txn)
    .await?;

    let mut active: OrderActive = order.into();
    active.invoice_id = Set(Some(invoice.id));
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(actor),
        "invoice_issued",
        Some("invoices"),
        Some(serde_json::json!({ "order_id": order_id, "invoice_id": invoice.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(invoice.into())
}

pub async fn list_templates(state: &AppState) -> AppResult<ApiResponse<TemplateList>> {
    let templates = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::IsRecurring.eq(true))
                .add(OrderCol::ParentRecurringOrderId.is_null()),
        )
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();
    Ok(ApiResponse::success(
        "Recurring templates",
        TemplateList { items: templates },
        Some(Meta::empty()),
    ))
}
