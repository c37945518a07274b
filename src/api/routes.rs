use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::api::handlers::{health_check, list_services};
use crate::core::service_cache::ServiceCache;

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<ServiceCache>,
}

/// PagerDuty plugin router, exposing `/services`.
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/services", get(list_services))
        .with_state(state)
}

/// Host application: the plugin mounted at `/api/pagerduty`, plus `/health`.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/pagerduty", create_routes(state))
        .layer(TraceLayer::new_for_http())
}
