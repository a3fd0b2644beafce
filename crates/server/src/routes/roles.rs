use axum::{
    Extension, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::role::Role;
use serde::Serialize;
use services::services::auth::AuthUser;
use utils::response::ApiResponse;

use super::entities::{authorize, parse_id};
use crate::{Deployment, error::ApiError};

#[derive(Debug, Serialize)]
pub struct RoleRemoval {
    pub removed: bool,
}

/// POST /api/v1/roles/users/{user_id}/roles/{role_id}
pub async fn assign_role(
    State(deployment): State<Deployment>,
    Extension(caller): Extension<AuthUser>,
    Path((user_id, role_id)): Path<(String, String)>,
) -> Result<ResponseJson<ApiResponse<Role>>, ApiError> {
    authorize(&caller, "roles", "update")?;
    let role = deployment
        .roles()
        .assign_role_to_user(&caller.context(), parse_id(&user_id)?, parse_id(&role_id)?)
        .await?;
    Ok(ResponseJson(ApiResponse::success(role)))
}

/// DELETE /api/v1/roles/users/{user_id}/roles/{role_id}
pub async fn remove_role(
    State(deployment): State<Deployment>,
    Extension(caller): Extension<AuthUser>,
    Path((user_id, role_id)): Path<(String, String)>,
) -> Result<ResponseJson<ApiResponse<RoleRemoval>>, ApiError> {
    authorize(&caller, "roles", "update")?;
    let removed = deployment
        .roles()
        .remove_role_from_user(&caller.context(), parse_id(&user_id)?, parse_id(&role_id)?)
        .await?;
    Ok(ResponseJson(ApiResponse::success(RoleRemoval { removed })))
}

/// GET /api/v1/roles/users/{user_id}/roles
pub async fn user_roles(
    State(deployment): State<Deployment>,
    Extension(caller): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<ResponseJson<ApiResponse<Vec<Role>>>, ApiError> {
    authorize(&caller, "roles", "read")?;
    let roles = deployment
        .roles()
        .get_user_roles(&caller.context(), parse_id(&user_id)?)
        .await?;
    Ok(ResponseJson(ApiResponse::success(roles)))
}

pub fn router() -> Router<Deployment> {
    Router::new()
        .route("/users/{user_id}/roles", get(user_roles))
        .route(
            "/users/{user_id}/roles/{role_id}",
            post(assign_role).delete(remove_role),
        )
}
