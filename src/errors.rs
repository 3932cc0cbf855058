use axum::response::{IntoResponse, Response};
use axum::Json;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use http::StatusCode;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Errors coming out of the pool manager.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("{0}")]
    Query(#[from] DieselError),
}

const TRANSIENT_MESSAGES: &[&str] = &[
    "database is locked",
    "database table is locked",
    "busy",
    "too many connections",
    "timeout",
    "timed out",
    "connection lost",
    "connection refused",
    "connection reset",
];

impl DbError {
    /// Connection-class failures that are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            DbError::Pool(_) => true,
            DbError::Query(DieselError::DatabaseError(kind, info)) => match kind {
                DatabaseErrorKind::ClosedConnection | DatabaseErrorKind::UnableToSendCommand => true,
                DatabaseErrorKind::UniqueViolation
                | DatabaseErrorKind::ForeignKeyViolation
                | DatabaseErrorKind::NotNullViolation
                | DatabaseErrorKind::CheckViolation => false,
                _ => {
                    let message = info.message().to_lowercase();
                    TRANSIENT_MESSAGES.iter().any(|m| message.contains(m))
                }
            },
            DbError::Query(_) => false,
        }
    }
}

/// Handler-boundary error, rendered as the `{success: false, error}` envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Database(DbError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ApiError::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::Internal(msg.into())
    }

    pub fn missing(field: &str) -> Self {
        ApiError::BadRequest(format!("{} is required", field))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Database(e) => match e {
                DbError::Query(DieselError::NotFound) => StatusCode::NOT_FOUND,
                DbError::Query(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                    StatusCode::CONFLICT
                }
                DbError::Query(DieselError::DatabaseError(
                    DatabaseErrorKind::ForeignKeyViolation,
                    _,
                )) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        ApiError::Database(e)
    }
}

impl From<crate::short_code::LinkError> for ApiError {
    fn from(e: crate::short_code::LinkError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Database(DbError::Query(DieselError::NotFound)) => "Not found".to_string(),
            ApiError::Database(DbError::Query(DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                _,
            ))) => "Resource already exists".to_string(),
            ApiError::Database(DbError::Query(DieselError::DatabaseError(
                DatabaseErrorKind::ForeignKeyViolation,
                _,
            ))) => "Referenced resource not found".to_string(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            error!(status = status.as_u16(), "{:?}", self);
        } else {
            warn!(status = status.as_u16(), "{}", message);
        }

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}
