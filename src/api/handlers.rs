use axum::{extract::State, http::StatusCode, Json};

use crate::error::AppResult;
use crate::models::{RecommendationRequest, RecommendationResponse};
use crate::services::{OrchestratorConfig, OrchestratorConfigPatch};

use super::AppState;

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Submits a recommendation request to the agent orchestrator
pub async fn recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    let response = state.orchestrator.submit(request).await?;
    Ok(Json(response))
}

/// Returns the current orchestrator configuration
pub async fn get_config(State(state): State<AppState>) -> Json<OrchestratorConfig> {
    Json(state.orchestrator.config().await)
}

/// Merges a partial update over the orchestrator configuration
pub async fn update_config(
    State(state): State<AppState>,
    Json(patch): Json<OrchestratorConfigPatch>,
) -> Json<OrchestratorConfig> {
    Json(state.orchestrator.update_config(patch).await)
}
