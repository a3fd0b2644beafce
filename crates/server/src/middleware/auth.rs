use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::{Deployment, error::ApiError};

fn bearer_token(request: &Request) -> Result<String, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".to_string()))?;
    header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::Unauthorized("Invalid authorization header".to_string()))
}

/// Resolve the bearer token and attach the caller as an `AuthUser` extension
pub async fn require_auth(
    State(deployment): State<Deployment>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&request)?;
    let caller = deployment.auth().authenticate(&token).await?;
    tracing::debug!(user_id = caller.user.id, "Authenticated request");
    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}
