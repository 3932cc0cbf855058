use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use tracing::info;

use crate::auth::{self, AuthUser, Role, UserStatus};
use crate::errors::ApiError;
use crate::handler::WithDB;
use crate::handlers::common::{
    clearable, looks_like_email, optional, parse_body, required, ApiPath, ApiQuery,
};
use crate::models::{now_timestamp, NewUser, User, UserChanges};
use crate::schema::users;
use crate::state::AppState;
use crate::view_models::{created, ok, paginated, PageParams};

#[derive(Debug, Default, Deserialize)]
pub struct UserBody {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub avatar: Option<String>,
}

fn checked_email(email: String) -> Result<String, ApiError> {
    let email = email.to_lowercase();
    if looks_like_email(&email) {
        Ok(email)
    } else {
        Err(ApiError::bad_request(format!("Invalid email '{}'", email)))
    }
}

fn checked_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < crate::MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "password must be at least {} characters",
            crate::MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

async fn email_taken(state: &AppState, email: &str, except: Option<i32>) -> Result<bool, ApiError> {
    let email = email.to_string();
    let existing = state
        .db
        .query("SELECT user BY email", move |conn| User::by_email(conn, &email))
        .await?;
    Ok(matches!(existing, Some(u) if Some(u.id) != except))
}

pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(page): ApiQuery<PageParams>,
) -> Result<Response, ApiError> {
    user.require_admin()?;
    let (limit, offset) = (page.limit(), page.offset());
    let (rows, total) = state
        .db
        .query("SELECT users WHERE deleted = 0", move |conn| {
            let live = users::table.filter(users::deleted.eq(false));
            let total: i64 = live.clone().count().get_result(conn)?;
            let rows = live
                .order(users::id.asc())
                .limit(limit)
                .offset(offset)
                .select(User::as_select())
                .load(conn)?;
            Ok((rows, total))
        })
        .await?;

    Ok(paginated(rows, page.with_total(total)))
}

pub async fn get_user(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Response, ApiError> {
    user.require_admin()?;
    let found = state
        .db
        .query("SELECT user BY id", move |conn| User::find_live(conn, id))
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(ok(found))
}

pub async fn create_user(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<UserBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    user.require_admin()?;
    let body = parse_body(body)?;
    let name = required(body.name, "name")?;
    let email = checked_email(required(body.email, "email")?)?;
    let password = required(body.password, "password")?;
    checked_password(&password)?;
    let role = match optional(body.role) {
        Some(r) => r.parse::<Role>()?,
        None => Role::Viewer,
    };
    let status = match optional(body.status) {
        Some(s) => s.parse::<UserStatus>()?,
        None => UserStatus::Active,
    };
    let avatar = optional(body.avatar);

    if email_taken(&state, &email, None).await? {
        return Err(ApiError::conflict(format!("A user with email '{}' already exists", email)));
    }

    let password_hash = auth::hash_password(&password)?;
    let created_user = state
        .db
        .query("INSERT INTO users", move |conn| {
            diesel::insert_into(users::table)
                .values(NewUser {
                    name: &name,
                    email: &email,
                    password_hash: &password_hash,
                    role: role.as_str(),
                    status: status.as_str(),
                    avatar: avatar.as_deref(),
                })
                .execute(conn)?;
            User::by_email(conn, &email)
        })
        .await?
        .ok_or_else(|| ApiError::internal("User vanished after insert"))?;

    info!(id = created_user.id, role = %created_user.role, "created user");
    Ok(created(created_user))
}

pub async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i32>,
    body: Result<Json<UserBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    user.require_admin()?;
    let body = parse_body(body)?;

    let email = optional(body.email).map(checked_email).transpose()?;
    let role = optional(body.role).map(|r| r.parse::<Role>()).transpose()?;
    let status = optional(body.status).map(|s| s.parse::<UserStatus>()).transpose()?;
    let password_hash = match optional(body.password) {
        Some(password) => {
            checked_password(&password)?;
            Some(auth::hash_password(&password)?)
        }
        None => None,
    };

    state
        .db
        .query("SELECT user BY id", move |conn| User::find_live(conn, id))
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if let Some(email) = &email {
        if email_taken(&state, email, Some(id)).await? {
            return Err(ApiError::conflict(format!("A user with email '{}' already exists", email)));
        }
    }

    let changes = UserChanges {
        name: optional(body.name),
        email,
        password_hash,
        role: role.map(|r| r.as_str().to_string()),
        status: status.map(|s| s.as_str().to_string()),
        avatar: clearable(body.avatar),
        updated_at: now_timestamp(),
    };

    let updated = state
        .db
        .query("UPDATE users", move |conn| {
            diesel::update(users::table.find(id))
                .set(&changes)
                .execute(conn)?;
            User::find_live(conn, id)
        })
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(ok(updated))
}

pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Response, ApiError> {
    user.require_admin()?;
    if user.0.id == id {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }

    let affected = state
        .db
        .query("UPDATE users SET deleted = 1", move |conn| User::soft_delete(conn, id))
        .await?;
    if affected == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    info!(id, "soft-deleted user");
    Ok(ok(serde_json::json!({ "id": id, "deleted": true })))
}
