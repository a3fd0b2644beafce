use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use services::services::rate_limit::RateLimitDecision;

use crate::{Deployment, error::ApiError};

/// Connection address, falling back to the first `x-forwarded-for` hop
fn client_key(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

pub async fn rate_limit(
    State(deployment): State<Deployment>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = client_key(&request);
    match deployment.rate_limiter().check(&key).await {
        RateLimitDecision::Allowed { .. } => Ok(next.run(request).await),
        RateLimitDecision::Limited { wait_for } => {
            tracing::warn!(client = %key, "Rate limit exceeded");
            Err(ApiError::TooManyRequests {
                wait_for: wait_for.as_secs_f64().ceil() as u64,
            })
        }
    }
}
