use std::collections::HashMap;

use axum::{
    Extension, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::audit::Audit;
use services::services::{audit::AuditService, auth::AuthUser, entity::DEFAULT_LIMIT};
use utils::response::ApiResponse;

use super::entities::{authorize, page_request};
use crate::{Deployment, error::ApiError};

/// GET /api/v1/audits/history/{entity_name}
pub async fn entity_history(
    State(deployment): State<Deployment>,
    Extension(caller): Extension<AuthUser>,
    Path(entity_name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<ResponseJson<ApiResponse<Vec<Audit>>>, ApiError> {
    authorize(&caller, "audits", "read")?;
    let page = page_request(&params)?;
    let (entries, meta) = AuditService::entity_history(
        &deployment.db().pool,
        &entity_name,
        page.page.unwrap_or(1),
        page.limit.unwrap_or(DEFAULT_LIMIT),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::paginated(entries, meta)))
}

pub fn router() -> Router<Deployment> {
    Router::new().route("/history/{entity_name}", get(entity_history))
}
