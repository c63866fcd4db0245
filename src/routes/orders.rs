use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::crop_plans::CropPlanList,
    dto::orders::{
        BulkTransitionReport, BulkTransitionRequest, BusinessEventRequest, CreateOrderRequest,
        OrderList, OrderWithItems, RecordPaymentRequest, TransitionRequest,
    },
    dto::recurring::MakeRecurringRequest,
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    models::{Invoice, Order, Payment},
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    services::{crop_plan_service, event_service, order_service, recurrence_service, status_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/bulk-status", post(bulk_update_status))
        .route("/{id}", get(get_order))
        .route("/{id}/status", post(update_status))
        .route("/{id}/events", post(submit_business_event))
        .route("/{id}/payments", post(record_payment))
        .route("/{id}/invoice", post(issue_invoice))
        .route("/{id}/make-recurring", post(make_recurring))
        .route("/{id}/crop-plans", post(generate_crop_plans))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status code"),
        ("stage" = Option<String>, Query, description = "Filter by stage"),
        ("customer_id" = Option<Uuid>, Query, description = "Filter by customer"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "List orders", body = ApiResponse<OrderList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_orders(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Create order", body = ApiResponse<OrderWithItems>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    ensure_admin(&user)?;
    let resp = order_service::create_order(&state, user.user_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with items", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = order_service::get_order(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Order transitioned", body = ApiResponse<Order>),
        (status = 422, description = "Invalid transition"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransitionRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    ensure_admin(&user)?;
    let ctx = status_service::TransitionContext::manual(user.user_id, payload.notes);
    let order = status_service::transition(&state, id, &payload.status, &ctx).await?;
    Ok(Json(ApiResponse::success(
        "Order status updated",
        order,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/api/orders/bulk-status",
    request_body = BulkTransitionRequest,
    responses(
        (status = 200, description = "Bulk transition report", body = ApiResponse<BulkTransitionReport>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn bulk_update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<BulkTransitionRequest>,
) -> AppResult<Json<ApiResponse<BulkTransitionReport>>> {
    ensure_admin(&user)?;
    let ctx = status_service::TransitionContext::manual(user.user_id, payload.notes);
    let report =
        status_service::bulk_transition(&state, payload.order_ids, &payload.status, &ctx).await?;
    Ok(Json(ApiResponse::success(
        "Bulk transition finished",
        report,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/events",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = BusinessEventRequest,
    responses(
        (status = 200, description = "Event routed; data is the order when it advanced", body = ApiResponse<Order>),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn submit_business_event(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<BusinessEventRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let advanced = event_service::handle_business_event(&state, id, &payload.event).await?;
    let message = if advanced.is_some() {
        "Order advanced"
    } else {
        "Event acknowledged; order unchanged"
    };
    Ok(Json(ApiResponse {
        message: message.to_string(),
        data: advanced,
        meta: Some(Meta::empty()),
    }))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/payments",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = RecordPaymentRequest,
    responses(
        (status = 200, description = "Payment recorded", body = ApiResponse<Payment>),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn record_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordPaymentRequest>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let payment = order_service::record_payment(&state, user.user_id, id, payload).await?;
    // a payment may release an order waiting in packing
    event_service::handle_business_event(&state, id, "payment.received").await?;
    Ok(Json(ApiResponse::success(
        "Payment recorded",
        payment,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/invoice",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Invoice issued", body = ApiResponse<Invoice>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn issue_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Invoice>>> {
    ensure_admin(&user)?;
    let invoice = order_service::issue_invoice(&state, user.user_id, id).await?;
    Ok(Json(ApiResponse::success(
        "Invoice issued",
        invoice,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/make-recurring",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = MakeRecurringRequest,
    responses(
        (status = 200, description = "Template created", body = ApiResponse<Order>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Recurring"
)]
pub async fn make_recurring(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<MakeRecurringRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    ensure_admin(&user)?;
    let template = recurrence_service::make_recurring(&state, user.user_id, id, payload).await?;
    Ok(Json(ApiResponse::success(
        "Recurring template created",
        template,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/crop-plans",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Draft crop plans generated", body = ApiResponse<CropPlanList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "CropPlans"
)]
pub async fn generate_crop_plans(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CropPlanList>>> {
    ensure_admin(&user)?;
    let plans = crop_plan_service::generate_plans_for_order(&state, user.user_id, id).await?;
    Ok(Json(ApiResponse::success(
        "Crop plans generated",
        CropPlanList { items: plans },
        Some(Meta::empty()),
    )))
}
