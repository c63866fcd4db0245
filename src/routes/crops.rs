use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    dto::crop_plans::{CropList, UpdateCropStageRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Crop,
    response::{ApiResponse, Meta},
    routes::params::CropListQuery,
    services::crop_plan_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_crops))
        .route("/{id}/stage", patch(update_crop_stage))
}

#[utoipa::path(
    get,
    path = "/api/crops",
    params(("order_id" = Option<Uuid>, Query, description = "Filter by order")),
    responses(
        (status = 200, description = "Crops", body = ApiResponse<CropList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Crops"
)]
pub async fn list_crops(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<CropListQuery>,
) -> AppResult<Json<ApiResponse<CropList>>> {
    let resp = crop_plan_service::list_crops(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/crops/{id}/stage",
    params(("id" = Uuid, Path, description = "Crop ID")),
    request_body = UpdateCropStageRequest,
    responses(
        (status = 200, description = "Crop stage updated", body = ApiResponse<Crop>),
        (status = 400, description = "Unknown stage"),
    ),
    security(("bearer_auth" = [])),
    tag = "Crops"
)]
pub async fn update_crop_stage(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCropStageRequest>,
) -> AppResult<Json<ApiResponse<Crop>>> {
    let crop =
        crop_plan_service::update_crop_stage(&state, user.user_id, id, &payload.stage).await?;
    Ok(Json(ApiResponse::success(
        "Crop stage updated",
        crop,
        Some(Meta::empty()),
    )))
}
