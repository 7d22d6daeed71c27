use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::validation::FieldError;

/// ApiError
///
/// The application-wide error taxonomy. Every failure a handler or service can
/// produce is one of these variants; each variant carries its HTTP status
/// mapping, and conversion to the uniform `{success: false, message, errors?}`
/// response body happens in exactly one place (`IntoResponse`).
///
/// All variants except `Internal` are operational: their messages are safe,
/// intentional, user-facing explanations and are always shown to the client.
/// `Internal` messages are logged server-side and only echoed to the client
/// outside production.
#[derive(Debug)]
pub enum ApiError {
    /// 400: request shape violations, with field-level detail.
    Validation(Vec<FieldError>),
    /// 400: uploaded file exceeds the configured size cap.
    PayloadTooLarge(String),
    /// 400: uploaded file is not an accepted image type.
    UnsupportedMediaType(String),
    /// 401: missing, malformed or invalid credentials.
    Unauthenticated(String),
    /// 401: structurally valid token past its expiry window.
    TokenExpired,
    /// 403: role or ownership failure.
    Forbidden(String),
    /// 404
    NotFound(String),
    /// 409: uniqueness violation.
    Conflict(String),
    /// 500: catch-all; message is not client-safe.
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedMediaType(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::TokenExpired => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the message is intended for direct client display.
    pub fn is_operational(&self) -> bool {
        !matches!(self, ApiError::Internal(_))
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::Validation(_) => "Validation error",
            ApiError::PayloadTooLarge(msg) => msg,
            ApiError::UnsupportedMediaType(msg) => msg,
            ApiError::Unauthenticated(msg) => msg,
            ApiError::TokenExpired => "Token has expired.",
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::Internal(msg) => msg,
        }
    }

    pub fn validation(errors: Vec<FieldError>) -> Self {
        ApiError::Validation(errors)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError::Unauthenticated(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

/// Classifies persistence failures. Unique-constraint violations surface as
/// 409 Conflict; everything else is logged and genericized so SQL details
/// never reach a client.
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ApiError::not_found("Record not found."),
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                ApiError::conflict("A record with this value already exists.")
            }
            _ => {
                tracing::error!("database error: {:?}", err);
                ApiError::internal(err.to_string())
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();

        let message = if self.is_operational() {
            self.message().to_string()
        } else {
            tracing::error!("internal error: {}", self.message());
            // Mirror the original deployment split: echo the underlying
            // message only outside production to aid debugging.
            let dev = std::env::var("APP_ENV").map(|v| v != "production").unwrap_or(true);
            if dev {
                self.message().to_string()
            } else {
                "Internal server error".to_string()
            }
        };

        let mut body = json!({
            "success": false,
            "message": message,
        });

        if let ApiError::Validation(errors) = &self {
            body["errors"] = json!(errors);
        }

        (status, Json(body)).into_response()
    }
}
