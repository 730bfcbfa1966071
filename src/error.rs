use axum::http::StatusCode;
use axum::Json;
use serde_json::json;
use std::fmt;

use crate::model::SCHEMA_ERROR;

/// Error taxonomy shared by the filter engine, every store implementation,
/// and the PATCH interpreter (§7). Handlers perform the single translation
/// to HTTP; nothing below this layer knows about status codes.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    AlreadyExists(String),
    Unauthorized(String),
    FilterParse(String),
    UnsupportedAttribute(String),
    Validation(String),
    Backend(String),
    Configuration(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(e) => write!(f, "{}", e),
            AppError::AlreadyExists(e) => write!(f, "{}", e),
            AppError::Unauthorized(e) => write!(f, "{}", e),
            AppError::FilterParse(e) => write!(f, "{}", e),
            AppError::UnsupportedAttribute(e) => write!(f, "{}", e),
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Backend(e) => write!(f, "{}", e),
            AppError::Configuration(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for AppError {}

// Driver errors are wrapped into Backend at the store boundary and never
// leaked with driver-specific types past it (§7).
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyExists(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::FilterParse(_) => StatusCode::BAD_REQUEST,
            AppError::UnsupportedAttribute(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Render the SCIM error envelope (§6) for this error.
    pub fn to_response(&self) -> (StatusCode, Json<serde_json::Value>) {
        let status = self.status_code();
        if matches!(self, AppError::Backend(_) | AppError::Configuration(_)) {
            tracing::error!(error = %self, "request failed");
        }
        (
            status,
            Json(json!({
                "schemas": [SCHEMA_ERROR],
                "status": status.as_u16().to_string(),
                "detail": self.to_string(),
            })),
        )
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = self.to_response();
        (status, body).into_response()
    }
}
