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
use crate::handlers::common::{looks_like_email, optional, parse_body, required, ApiPath, ApiQuery};
use crate::models::{ContactMessage, NewContactMessage};
use crate::schema::contact_messages;
use crate::state::AppState;
use crate::view_models::{created, ok, paginated, PageParams};

#[derive(Debug, Default, Deserialize)]
pub struct ContactBody {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactUpdate {
    pub is_read: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub unread: Option<bool>,
}

fn find(conn: &mut SqliteConnection, id: i32) -> QueryResult<Option<ContactMessage>> {
    contact_messages::table
        .find(id)
        .select(ContactMessage::as_select())
        .first(conn)
        .optional()
}

pub async fn submit_message(
    State(state): State<AppState>,
    body: Result<Json<ContactBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let body = parse_body(body)?;
    let name = required(body.name, "name")?;
    let email = required(body.email, "email")?;
    let message = required(body.message, "message")?;
    if !looks_like_email(&email) {
        return Err(ApiError::bad_request(format!("Invalid email '{}'", email)));
    }
    let subject = optional(body.subject);

    let saved = state
        .db
        .run_txn("INSERT INTO contact_messages", move |conn| {
            diesel::insert_into(contact_messages::table)
                .values(NewContactMessage {
                    name: &name,
                    email: &email,
                    subject: subject.as_deref(),
                    message: &message,
                })
                .execute(conn)?;
            contact_messages::table
                .order(contact_messages::id.desc())
                .select(ContactMessage::as_select())
                .first(conn)
        })
        .await?;

    info!(id = saved.id, "contact message received");
    Ok(created(saved))
}

pub async fn list_messages(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(params): ApiQuery<ContactQuery>,
) -> Result<Response, ApiError> {
    user.require_editor()?;
    let page = PageParams {
        page: params.page,
        limit: params.limit,
    };
    let (limit, offset) = (page.limit(), page.offset());
    let unread = params.unread;

    let (rows, total) = state
        .db
        .query("SELECT contact_messages [WHERE is_read = 0]", move |conn| {
            let filtered = || {
                let mut q = contact_messages::table.into_boxed();
                if unread == Some(true) {
                    q = q.filter(contact_messages::is_read.eq(false));
                }
                q
            };
            let total: i64 = filtered().count().get_result(conn)?;
            let rows = filtered()
                .order(contact_messages::id.desc())
                .limit(limit)
                .offset(offset)
                .select(ContactMessage::as_select())
                .load(conn)?;
            Ok((rows, total))
        })
        .await?;

    Ok(paginated(rows, page.with_total(total)))
}

pub async fn get_message(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Response, ApiError> {
    user.require_editor()?;
    let message = state
        .db
        .query("SELECT contact_message BY id", move |conn| find(conn, id))
        .await?
        .ok_or_else(|| ApiError::not_found("Message not found"))?;
    Ok(ok(message))
}

pub async fn update_message(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i32>,
    body: Result<Json<ContactUpdate>, JsonRejection>,
) -> Result<Response, ApiError> {
    user.require_editor()?;
    let is_read = parse_body(body)?
        .is_read
        .ok_or_else(|| ApiError::missing("isRead"))?;

    let message = state
        .db
        .query("UPDATE contact_messages SET is_read", move |conn| {
            diesel::update(contact_messages::table.find(id))
                .set(contact_messages::is_read.eq(is_read))
                .execute(conn)?;
            find(conn, id)
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Message not found"))?;
    Ok(ok(message))
}

pub async fn delete_message(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Response, ApiError> {
    user.require_editor()?;
    let affected = state
        .db
        .query("DELETE FROM contact_messages", move |conn| {
            diesel::delete(contact_messages::table.find(id)).execute(conn)
        })
        .await?;
    if affected == 0 {
        return Err(ApiError::not_found("Message not found"));
    }

    info!(id, "deleted contact message");
    Ok(ok(serde_json::json!({ "id": id, "deleted": true })))
}
