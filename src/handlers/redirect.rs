use axum::extract::{RawQuery, State};
use axum::response::{IntoResponse, Response};
use http::header::LOCATION;
use http::StatusCode;
use tracing::debug;

use crate::errors::ApiError;
use crate::handler::WithDB;
use crate::handlers::common::ApiPath;
use crate::handlers::short_links::{spawn_click, ClickTarget};
use crate::models::ShortLink;
use crate::short_code;
use crate::state::AppState;

fn found(target: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, target.to_string())]).into_response()
}

/// The decoded `link` parameter of a raw query string.
fn link_param(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == "link")
        .map(|(_, value)| value.into_owned())
}

/// `GET /redirect?link=<url>`: validate the target and send the client there,
/// counting the click on the side.
pub async fn redirect(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    let link = link_param(query.as_deref()).ok_or_else(|| ApiError::missing("link"))?;
    let target = short_code::redirect_target(&link)?;

    let normalized = short_code::normalize_url(&link)?;
    spawn_click(&state, ClickTarget::Url(normalized));

    debug!(target = %target, "redirecting");
    Ok(found(target.as_str()))
}

/// `GET /s/:code`
pub async fn follow_short_link(
    State(state): State<AppState>,
    ApiPath(code): ApiPath<String>,
) -> Result<Response, ApiError> {
    if !short_code::is_valid_code(&code) {
        return Err(ApiError::not_found("Short link not found"));
    }

    let lookup = code.clone();
    let link = state
        .db
        .query("SELECT short_link BY code", move |conn| ShortLink::by_code(conn, &lookup))
        .await?
        .ok_or_else(|| ApiError::not_found("Short link not found"))?;

    spawn_click(&state, ClickTarget::Code(code));
    Ok(found(&link.original_url))
}
