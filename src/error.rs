//! Error taxonomy shared by the store and the HTTP layer.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, BookstoreError>;

#[derive(Debug, Error)]
pub enum BookstoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} does not belong to this user")]
    Forbidden(&'static str),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error("cart is empty")]
    EmptyCart,

    #[error("cart references book {0} which no longer exists")]
    Inconsistent(Uuid),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<validator::ValidationErrors> for BookstoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::InvalidArgument(errors.to_string())
    }
}

impl IntoResponse for BookstoreError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::InvalidArgument(_) | Self::EmptyCart => StatusCode::BAD_REQUEST,
            Self::Conflict(_) | Self::Inconsistent(_) => StatusCode::CONFLICT,
            Self::Database(err) => {
                tracing::error!(error = %err, "storage failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
