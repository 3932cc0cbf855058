use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use tracing::info;

use crate::auth::AuthUser;
use crate::errors::ApiError;
use crate::handler::WithDB;
use crate::handlers::common::{
    clearable, optional, parse_body, required, required_id, ApiPath, ApiQuery,
};
use crate::models::{now_timestamp, Author, AuthorChanges, NewAuthor};
use crate::schema::authors;
use crate::state::AppState;
use crate::view_models::{created, ok, paginated, PageParams};

#[derive(Debug, Default, Deserialize)]
pub struct AuthorBody {
    pub id: Option<String>,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub bio: Option<String>,
}

pub async fn list_authors(
    State(state): State<AppState>,
    ApiQuery(page): ApiQuery<PageParams>,
) -> Result<Response, ApiError> {
    let (limit, offset) = (page.limit(), page.offset());
    let (rows, total) = state
        .db
        .query("SELECT authors WHERE deleted = 0", move |conn| {
            let live = authors::table.filter(authors::deleted.eq(false));
            let total: i64 = live.clone().count().get_result(conn)?;
            let rows = live
                .order(authors::name.asc())
                .limit(limit)
                .offset(offset)
                .select(Author::as_select())
                .load(conn)?;
            Ok((rows, total))
        })
        .await?;

    Ok(paginated(rows, page.with_total(total)))
}

pub async fn get_author(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Response, ApiError> {
    let author = state
        .db
        .query("SELECT author BY id", move |conn| Author::find_live(conn, &id))
        .await?
        .ok_or_else(|| ApiError::not_found("Author not found"))?;
    Ok(ok(author))
}

pub async fn create_author(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<AuthorBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    user.require_editor()?;
    let body = parse_body(body)?;
    let id = required_id(body.id, "id")?;
    let name = required(body.name, "name")?;
    let avatar = optional(body.avatar);
    let bio = optional(body.bio);

    let lookup_id = id.clone();
    if state
        .db
        .query("SELECT EXISTS author BY id", move |conn| Author::exists_any(conn, &lookup_id))
        .await?
    {
        return Err(ApiError::conflict(format!("Author '{}' already exists", id)));
    }

    let author = state
        .db
        .query("INSERT INTO authors", move |conn| {
            diesel::insert_into(authors::table)
                .values(NewAuthor {
                    id: &id,
                    name: &name,
                    avatar: avatar.as_deref(),
                    bio: bio.as_deref(),
                })
                .execute(conn)?;
            Author::find_any(conn, &id)
        })
        .await?
        .ok_or_else(|| ApiError::internal("Author vanished after insert"))?;

    info!(id = %author.id, "created author");
    Ok(created(author))
}

pub async fn update_author(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
    body: Result<Json<AuthorBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    user.require_editor()?;
    let body = parse_body(body)?;
    let changes = AuthorChanges {
        name: optional(body.name),
        avatar: clearable(body.avatar),
        bio: clearable(body.bio),
        updated_at: now_timestamp(),
    };

    let author = state
        .db
        .query("UPDATE authors", move |conn| {
            if Author::find_live(conn, &id)?.is_none() {
                return Ok(None);
            }
            diesel::update(authors::table.find(id.as_str()))
                .set(&changes)
                .execute(conn)?;
            Author::find_live(conn, &id)
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Author not found"))?;

    Ok(ok(author))
}

pub async fn delete_author(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> Result<Response, ApiError> {
    user.require_editor()?;
    let target = id.clone();
    let affected = state
        .db
        .query("UPDATE authors SET deleted = 1", move |conn| Author::soft_delete(conn, &target))
        .await?;
    if affected == 0 {
        return Err(ApiError::not_found("Author not found"));
    }

    info!(id = %id, "soft-deleted author");
    Ok(ok(serde_json::json!({ "id": id, "deleted": true })))
}
