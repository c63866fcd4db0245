use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

use crate::{
    dto::recurring::{RecurrenceReport, TemplateList},
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    response::{ApiResponse, Meta},
    services::{order_service, recurrence_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_templates))
        .route("/run", post(run_scheduler))
}

#[utoipa::path(
    get,
    path = "/api/recurring",
    responses(
        (status = 200, description = "Recurring templates", body = ApiResponse<TemplateList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Recurring"
)]
pub async fn list_templates(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<ApiResponse<TemplateList>>> {
    let resp = order_service::list_templates(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/recurring/run",
    responses(
        (status = 200, description = "One scheduler pass; per-template errors are data", body = ApiResponse<RecurrenceReport>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Recurring"
)]
pub async fn run_scheduler(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<RecurrenceReport>>> {
    ensure_admin(&user)?;
    let report = recurrence_service::process_recurring_orders(&state).await?;
    Ok(Json(ApiResponse::success(
        "Recurrence pass finished",
        report,
        Some(Meta::empty()),
    )))
}
