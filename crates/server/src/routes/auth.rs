use axum::{
    Extension, Json, Router,
    extract::{State, rejection::JsonRejection},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{role::Role, user::User};
use serde::{Deserialize, Serialize};
use services::services::auth::{AuthUser, LoginResponse};
use utils::response::ApiResponse;

use crate::{Deployment, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct Me {
    #[serde(flatten)]
    pub user: User,
    pub role: Option<Role>,
}

/// POST /api/v1/auth/login
pub async fn login(
    State(deployment): State<Deployment>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<ResponseJson<ApiResponse<LoginResponse>>, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "Email and password are required".to_string(),
        ));
    }
    let response = deployment
        .auth()
        .login(&payload.email, &payload.password)
        .await?;
    Ok(ResponseJson(ApiResponse::success(response)))
}

/// GET /api/v1/auth/me
pub async fn me(Extension(caller): Extension<AuthUser>) -> ResponseJson<ApiResponse<Me>> {
    ResponseJson(ApiResponse::success(Me {
        user: caller.user,
        role: caller.role,
    }))
}

pub fn public_router() -> Router<Deployment> {
    Router::new().route("/auth/login", post(login))
}

pub fn protected_router() -> Router<Deployment> {
    Router::new().route("/auth/me", get(me))
}
