use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod crop_plans;
pub mod crops;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod recurring;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/orders", orders::router())
        .nest("/recurring", recurring::router())
        .nest("/crop-plans", crop_plans::router())
        .nest("/crops", crops::router())
}
