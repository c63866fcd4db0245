use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::crop_plans::CropPlanList,
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    models::CropPlan,
    response::{ApiResponse, Meta},
    routes::params::CropPlanListQuery,
    services::crop_plan_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_crop_plans))
        .route("/{id}/approve", post(approve_crop_plan))
        .route("/{id}/cancel", post(cancel_crop_plan))
}

#[utoipa::path(
    get,
    path = "/api/crop-plans",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("order_id" = Option<Uuid>, Query, description = "Filter by order"),
        ("status" = Option<String>, Query, description = "Filter by plan status")
    ),
    responses(
        (status = 200, description = "Crop plans", body = ApiResponse<CropPlanList>),
    ),
    security(("bearer_auth" = [])),
    tag = "CropPlans"
)]
pub async fn list_crop_plans(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<CropPlanListQuery>,
) -> AppResult<Json<ApiResponse<CropPlanList>>> {
    let resp = crop_plan_service::list_plans(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/crop-plans/{id}/approve",
    params(("id" = Uuid, Path, description = "Crop plan ID")),
    responses(
        (status = 200, description = "Plan approved; crops created", body = ApiResponse<CropPlan>),
        (status = 400, description = "Plan is not a draft"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "CropPlans"
)]
pub async fn approve_crop_plan(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CropPlan>>> {
    ensure_admin(&user)?;
    let plan = crop_plan_service::approve_plan(&state, user.user_id, id).await?;
    Ok(Json(ApiResponse::success(
        "Crop plan approved",
        plan,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/api/crop-plans/{id}/cancel",
    params(("id" = Uuid, Path, description = "Crop plan ID")),
    responses(
        (status = 200, description = "Plan cancelled", body = ApiResponse<CropPlan>),
        (status = 400, description = "Plan has crops attached"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "CropPlans"
)]
pub async fn cancel_crop_plan(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CropPlan>>> {
    ensure_admin(&user)?;
    let plan = crop_plan_service::cancel_plan(&state, user.user_id, id).await?;
    Ok(Json(ApiResponse::success(
        "Crop plan cancelled",
        plan,
        Some(Meta::empty()),
    )))
}
