use crate::api::error::ApiError;
use crate::api::routes::AppState;
use crate::domain::model::ServiceRecord;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Shares the cached list with the snapshot instead of copying it per request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ServicesResponse {
    pub services: Arc<Vec<ServiceRecord>>,
}

/// 回傳最近一次成功的快照；上次輪詢失敗時回傳 500
pub async fn list_services(
    State(state): State<AppState>,
) -> Result<Json<ServicesResponse>, ApiError> {
    let snapshot = state.cache.snapshot().await;

    if let Some(message) = snapshot.error_message {
        return Err(ApiError::Upstream(message));
    }

    Ok(Json(ServicesResponse {
        services: snapshot.services,
    }))
}

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": "portal-plugins",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
