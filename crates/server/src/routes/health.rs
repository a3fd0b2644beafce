use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use services::services::health::HealthStatus;
use utils::response::ApiResponse;

use crate::Deployment;

pub async fn health(State(deployment): State<Deployment>) -> ResponseJson<ApiResponse<HealthStatus>> {
    ResponseJson(ApiResponse::success(deployment.health().check().await))
}

pub fn router() -> Router<Deployment> {
    Router::new().route("/health", get(health))
}
