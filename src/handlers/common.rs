use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequestParts, Path, Query};
use axum::Json;
use http::request::Parts;
use http::StatusCode;
use serde::de::DeserializeOwned;

use crate::errors::ApiError;

/// `Path` whose rejection is rendered in the error envelope.
#[derive(Debug)]
pub struct ApiPath<T>(pub T);

/// `Query` whose rejection is rendered in the error envelope.
#[derive(Debug)]
pub struct ApiQuery<T>(pub T);

fn rejected(status: StatusCode, message: String) -> ApiError {
    if status.is_server_error() {
        ApiError::internal(message)
    } else {
        ApiError::bad_request(message)
    }
}

// axum already words these as "Invalid URL: ...".
pub fn path_rejection(e: PathRejection) -> ApiError {
    rejected(e.status(), e.body_text())
}

pub fn query_rejection(e: QueryRejection) -> ApiError {
    rejected(e.status(), format!("Invalid query string: {}", e.body_text()))
}

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(v)| ApiPath(v))
            .map_err(path_rejection)
    }
}

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(v)| ApiQuery(v))
            .map_err(query_rejection)
    }
}

/// Result of a guarded write inside a transaction: the row is gone, or live
/// rows still depend on it, or the write went through.
#[derive(Debug)]
pub enum Guarded<T> {
    Missing,
    InUse(i64),
    Done(T),
}

/// Unwrap a JSON body, turning axum's rejection into the usual 400 envelope.
pub fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(v)| v)
        .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e.body_text())))
}

/// A required text field: absent or blank is a 400.
pub fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::missing(field)),
    }
}

/// Optional text: blanks become `None`.
pub fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Text for a nullable column in an update: absent keeps the stored value,
/// blank clears it.
pub fn clearable(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| optional(Some(v)))
}

/// Caller-supplied identifiers are lowercase slugs.
pub fn required_id(value: Option<String>, field: &str) -> Result<String, ApiError> {
    let id = required(value, field)?;
    if !crate::post_util::is_valid_slug(&id) {
        return Err(ApiError::bad_request(format!(
            "{} must contain only lowercase letters, digits and hyphens",
            field
        )));
    }
    Ok(id)
}

pub fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
