use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::auth::AuthUser;
use crate::errors::{ApiError, DbError};
use crate::handler::WithDB;
use crate::handlers::common::{optional, parse_body, ApiPath, ApiQuery};
use crate::models::{NewShortLink, ShortLink};
use crate::schema::short_links;
use crate::short_code;
use crate::state::AppState;
use crate::view_models::{created, ok, paginated, PageParams};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortLinkBody {
    pub original_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackBody {
    pub url: Option<String>,
    pub short_code: Option<String>,
}

/// What a click should be counted against.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickTarget {
    Url(String),
    Code(String),
}

/// Bump the click counter of every live link matching `target`. Returns
/// whether anything was counted.
pub async fn record_click<D: WithDB>(db: &D, target: ClickTarget) -> Result<bool, DbError> {
    let statement = match &target {
        ClickTarget::Url(_) => "UPDATE short_links SET clicks = clicks + 1 WHERE original_url = ?",
        ClickTarget::Code(_) => "UPDATE short_links SET clicks = clicks + 1 WHERE short_code = ?",
    };
    let affected = db
        .query(statement, move |conn| {
            let live = short_links::table.filter(short_links::deleted.eq(false));
            match &target {
                ClickTarget::Url(url) => diesel::update(live.filter(short_links::original_url.eq(url.as_str())))
                    .set(short_links::clicks.eq(short_links::clicks + 1))
                    .execute(conn),
                ClickTarget::Code(code) => diesel::update(live.filter(short_links::short_code.eq(code.as_str())))
                    .set(short_links::clicks.eq(short_links::clicks + 1))
                    .execute(conn),
            }
        })
        .await?;
    Ok(affected > 0)
}

/// Count a click without making the caller wait for it or care whether it
/// worked.
pub fn spawn_click(state: &AppState, target: ClickTarget) {
    let db = state.db.clone();
    tokio::spawn(async move {
        match record_click(db.as_ref(), target.clone()).await {
            Ok(true) => debug!(?target, "click recorded"),
            Ok(false) => debug!(?target, "click for unknown link"),
            Err(e) => warn!(?target, "could not record click: {}", e),
        }
    });
}

pub async fn list_short_links(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(page): ApiQuery<PageParams>,
) -> Result<Response, ApiError> {
    user.require_editor()?;
    let (limit, offset) = (page.limit(), page.offset());
    let (rows, total) = state
        .db
        .query("SELECT short_links WHERE deleted = 0", move |conn| {
            let live = short_links::table.filter(short_links::deleted.eq(false));
            let total: i64 = live.clone().count().get_result(conn)?;
            let rows = live
                .order(short_links::id.desc())
                .limit(limit)
                .offset(offset)
                .select(ShortLink::as_select())
                .load(conn)?;
            Ok((rows, total))
        })
        .await?;

    Ok(paginated(rows, page.with_total(total)))
}

pub async fn get_short_link(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Response, ApiError> {
    user.require_editor()?;
    let link = state
        .db
        .query("SELECT short_link BY id", move |conn| ShortLink::find_live(conn, id))
        .await?
        .ok_or_else(|| ApiError::not_found("Short link not found"))?;
    Ok(ok(link))
}

pub async fn create_short_link(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<ShortLinkBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    user.require_editor()?;
    let body = parse_body(body)?;
    let original_url = short_code::normalize_url(body.original_url.as_deref().unwrap_or(""))?;

    let code = state
        .db
        .query("SELECT EXISTS short_link BY code", |conn| {
            short_code::find_free_code(|code| ShortLink::code_taken(conn, code))
        })
        .await?
        .ok_or_else(|| {
            ApiError::internal(format!(
                "Could not generate a unique short code after {} attempts",
                crate::MAX_SHORT_CODE_ATTEMPTS
            ))
        })?;

    let link = state
        .db
        .query("INSERT INTO short_links", move |conn| {
            diesel::insert_into(short_links::table)
                .values(NewShortLink {
                    original_url: &original_url,
                    short_code: &code,
                })
                .execute(conn)?;
            ShortLink::by_code(conn, &code)
        })
        .await?
        .ok_or_else(|| ApiError::internal("Short link vanished after insert"))?;

    info!(id = link.id, code = %link.short_code, "created short link");
    Ok(created(link))
}

pub async fn delete_short_link(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Response, ApiError> {
    user.require_editor()?;
    let affected = state
        .db
        .query("UPDATE short_links SET deleted = 1", move |conn| ShortLink::soft_delete(conn, id))
        .await?;
    if affected == 0 {
        return Err(ApiError::not_found("Short link not found"));
    }

    info!(id, "soft-deleted short link");
    Ok(ok(serde_json::json!({ "id": id, "deleted": true })))
}

/// Public click tracking. Unknown links are not an error.
pub async fn track_click(
    State(state): State<AppState>,
    body: Result<Json<TrackBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let body = parse_body(body)?;
    let target = match (optional(body.short_code), optional(body.url)) {
        (Some(code), _) => ClickTarget::Code(code),
        (None, Some(url)) => ClickTarget::Url(short_code::normalize_url(&url).unwrap_or(url)),
        (None, None) => return Err(ApiError::bad_request("url or shortCode is required")),
    };

    let tracked = match record_click(state.db.as_ref(), target).await {
        Ok(tracked) => tracked,
        Err(e) => {
            warn!("click tracking failed: {}", e);
            false
        }
    };
    Ok(ok(serde_json::json!({ "tracked": tracked })))
}
