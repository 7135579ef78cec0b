use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use catalog::{FeedError, NormalizeError, OrderError, QueryError, ValidationError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{auth::AuthError, store::StoreError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Feed(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Feed(_) => StatusCode::BAD_GATEWAY,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{self}");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<QueryError> for AppError {
    fn from(e: QueryError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl From<OrderError> for AppError {
    fn from(e: OrderError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl From<FeedError> for AppError {
    fn from(e: FeedError) -> Self {
        AppError::Feed(e.to_string())
    }
}

impl From<NormalizeError> for AppError {
    fn from(e: NormalizeError) -> Self {
        AppError::Feed(e.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingToken | AuthError::InvalidToken(_) => {
                AppError::Unauthorized(e.to_string())
            }
            AuthError::NotAdmin => AppError::Forbidden(e.to_string()),
            AuthError::UnknownUser(_) => AppError::NotFound(e.to_string()),
            AuthError::NotConfigured => AppError::Unavailable(e.to_string()),
            AuthError::Provider(_) => AppError::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors_map_to_status() {
        let cases = [
            (AuthError::MissingToken, StatusCode::UNAUTHORIZED),
            (AuthError::InvalidToken("expired".into()), StatusCode::UNAUTHORIZED),
            (AuthError::NotAdmin, StatusCode::FORBIDDEN),
            (AuthError::UnknownUser("u".into()), StatusCode::NOT_FOUND),
            (AuthError::NotConfigured, StatusCode::SERVICE_UNAVAILABLE),
        ];

        for (error, status) in cases {
            assert_eq!(AppError::from(error).status(), status);
        }
    }

    #[test]
    fn test_query_error_is_bad_request() {
        let error = AppError::from(QueryError::InvalidSort("x".into()));
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.to_string(), "Unknown sort order: x");
    }
}
