use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{
    auth::AuthError, entity::EntityError, report::ReportError, role::RoleError,
};
use thiserror::Error;
use utils::{i18n::Message, response::ApiResponse};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Entity(#[from] EntityError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Role(#[from] RoleError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{}", Message::TooManyRequests)]
    TooManyRequests { wait_for: u64 },
}

enum Kind {
    Validation,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    TooManyRequests,
    Internal,
}

impl Kind {
    fn status(&self) -> StatusCode {
        match self {
            Kind::Validation => StatusCode::BAD_REQUEST,
            Kind::Unauthorized => StatusCode::UNAUTHORIZED,
            Kind::Forbidden => StatusCode::FORBIDDEN,
            Kind::NotFound => StatusCode::NOT_FOUND,
            Kind::Conflict => StatusCode::CONFLICT,
            Kind::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Kind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Kind::Validation => "VALIDATION_ERROR",
            Kind::Unauthorized => "UNAUTHORIZED",
            Kind::Forbidden => "FORBIDDEN",
            Kind::NotFound => "NOT_FOUND",
            Kind::Conflict => "CONFLICT",
            Kind::TooManyRequests => "TOO_MANY_REQUESTS",
            Kind::Internal => "INTERNAL_ERROR",
        }
    }
}

impl ApiError {
    fn kind(&self) -> Kind {
        match self {
            ApiError::Entity(e) => entity_kind(e),
            ApiError::Auth(e) => match e {
                AuthError::InvalidCredentials => Kind::Validation,
                AuthError::Unauthorized(_) => Kind::Unauthorized,
                AuthError::Database(_) | AuthError::Token(_) | AuthError::Password(_) => {
                    Kind::Internal
                }
            },
            ApiError::Role(e) => match e {
                RoleError::UserNotFound(_) | RoleError::RoleNotFound(_) => Kind::Validation,
                RoleError::Database(_) => Kind::Internal,
            },
            ApiError::Report(e) => match e {
                ReportError::Entity(e) => entity_kind(e),
                ReportError::Io(_) | ReportError::Serialize(_) => Kind::Internal,
            },
            ApiError::Database(_) => Kind::Internal,
            ApiError::Validation(_) => Kind::Validation,
            ApiError::Unauthorized(_) => Kind::Unauthorized,
            ApiError::Forbidden(_) => Kind::Forbidden,
            ApiError::TooManyRequests { .. } => Kind::TooManyRequests,
        }
    }
}

fn entity_kind(e: &EntityError) -> Kind {
    match e {
        EntityError::Validation(_) | EntityError::Value(_) => Kind::Validation,
        EntityError::NotFound(_) => Kind::NotFound,
        EntityError::Conflict(_) => Kind::Conflict,
        EntityError::Forbidden(_) | EntityError::ReadOnly(_) => Kind::Forbidden,
        EntityError::Database(_) | EntityError::Hash(_) => Kind::Internal,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let body = match (&kind, &self) {
            (Kind::Internal, _) => {
                tracing::error!(error = %self, "Request failed");
                ApiResponse::<()>::error(kind.code(), "Internal server error")
            }
            (_, ApiError::TooManyRequests { wait_for }) => ApiResponse::<()>::error_with_details(
                kind.code(),
                self.to_string(),
                Some(serde_json::json!({ "waitFor": wait_for })),
            ),
            _ => ApiResponse::<()>::error(kind.code(), self.to_string()),
        };
        (kind.status(), Json(body)).into_response()
    }
}
