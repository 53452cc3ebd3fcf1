use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use glasslead_core::error::CoreError;
use glasslead_core::lead::WireErrors;
use glasslead_db::store::StoreError;

/// Errors returned by HTTP handlers.
///
/// Every variant renders as the lead failure envelope
/// `{ "ok": false, "error": ..., "code": ... }` that the funnel client
/// already parses; field validation adds `validationErrors`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Keyed by payload field name (`zip`, `phoneE164`, ...).
    #[error("Validation failed")]
    LeadValidation(WireErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Request body is too large")]
    PayloadTooLarge,

    #[error("No route for {0}")]
    RouteNotFound(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) => Self::Database(e),
            StoreError::Conflict { constraint } => Self::Core(CoreError::Conflict(format!(
                "Duplicate value violates unique constraint: {constraint}"
            ))),
            StoreError::Unavailable => Self::InternalError("Lead store is unavailable".into()),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    ok: bool,
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    validation_errors: Option<&'a WireErrors>,
}

const INTERNAL_MESSAGE: &str = "An internal error occurred";

impl AppError {
    /// Status, machine-readable code and client-safe message.
    ///
    /// Internal details are logged here and never reach the response.
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            Self::Core(CoreError::NotFound { entity, id }) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{entity} {id} not found"),
            ),
            Self::Core(CoreError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            Self::Core(CoreError::Conflict(msg)) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            Self::Core(CoreError::RateLimited(msg)) => {
                (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED", msg.clone())
            }
            Self::Core(e @ CoreError::InvalidTransition { .. }) => {
                (StatusCode::CONFLICT, "INVALID_TRANSITION", e.to_string())
            }
            Self::Core(CoreError::Internal(msg)) | Self::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
            Self::Database(sqlx::Error::RowNotFound) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "Resource not found".to_string(),
            ),
            Self::Database(e) => {
                tracing::error!(error = %e, "Database error");
                internal()
            }
            Self::LeadValidation(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
                self.to_string(),
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            Self::PayloadTooLarge => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", self.to_string())
            }
            Self::RouteNotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),
        }
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        INTERNAL_MESSAGE.to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error) = self.parts();
        let validation_errors = match &self {
            Self::LeadValidation(errors) => Some(errors),
            _ => None,
        };

        let body = ErrorBody {
            ok: false,
            error,
            code,
            validation_errors,
        };
        (status, Json(body)).into_response()
    }
}
