use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{self, Claims, MaybeAuthUser, Role, UserStatus};
use crate::errors::ApiError;
use crate::handler::WithDB;
use crate::handlers::common::{parse_body, required};
use crate::models::{now_timestamp, User};
use crate::schema::users;
use crate::state::AppState;
use crate::view_models::ok;

#[derive(Debug, Default, Deserialize)]
pub struct LoginBody {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
}

/// Which outcome a login attempt gets for a stored account. Blocked accounts
/// are refused before the password is looked at.
fn check_login(user: &User, password: &str) -> Result<(), ApiError> {
    match user.status.parse::<UserStatus>() {
        Ok(UserStatus::Active) => {}
        Ok(UserStatus::Suspended) => {
            return Err(ApiError::Forbidden("This account has been suspended".into()))
        }
        Ok(UserStatus::Invited) => {
            return Err(ApiError::Forbidden("This account has not been activated yet".into()))
        }
        Err(_) => return Err(ApiError::Forbidden("This account is not active".into())),
    }

    if !auth::verify_password(password, &user.password_hash) {
        return Err(ApiError::Unauthorized("Invalid email or password".into()));
    }
    Ok(())
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<Json<LoginBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let body = parse_body(body)?;
    let email = required(body.email, "email")?.to_lowercase();
    let password = body
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::missing("password"))?;

    let lookup = email.clone();
    let user = state
        .db
        .query("SELECT user BY email", move |conn| User::by_email(conn, &lookup))
        .await?
        .ok_or_else(|| {
            warn!(email = %email, "login for unknown account");
            ApiError::Unauthorized("Invalid email or password".into())
        })?;

    check_login(&user, &password)?;

    let role = user.role.parse::<Role>().map_err(|_| {
        let msg = format!("stored role '{}' for user {} is invalid", user.role, user.id);
        ApiError::internal(msg)
    })?;
    let token = auth::issue_token(&Claims::new(user.id, &user.email, role), &state.config.jwt_secret)?;

    let user_id = user.id;
    let user = state
        .db
        .query("UPDATE users SET last_login_at", move |conn| {
            let now = now_timestamp();
            diesel::update(users::table.find(user_id))
                .set(users::last_login_at.eq(Some(now)))
                .execute(conn)?;
            User::find_live(conn, user_id)
        })
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".into()))?;

    info!(id = user.id, role = %role, "user logged in");
    let jar = jar.add(auth::auth_cookie(token.clone(), state.config.cookie_secure));
    Ok((jar, ok(LoginResponse { user, token })).into_response())
}

pub async fn logout(
    State(state): State<AppState>,
    MaybeAuthUser(claims): MaybeAuthUser,
    jar: CookieJar,
) -> Response {
    if auth::is_authenticated(claims.as_ref()) {
        info!(id = claims.as_ref().map(|c| c.id), "user logged out");
    }
    let jar = jar.add(auth::removal_cookie(state.config.cookie_secure));
    (jar, ok(serde_json::json!({ "loggedOut": true }))).into_response()
}

pub async fn me(
    State(state): State<AppState>,
    MaybeAuthUser(claims): MaybeAuthUser,
) -> Result<Response, ApiError> {
    let id = match claims {
        Some(claims) => claims.id,
        None => return Err(ApiError::Unauthorized("Authentication required".into())),
    };
    let current = state
        .db
        .query("SELECT user BY id", move |conn| User::find_live(conn, id))
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))?;
    Ok(ok(current))
}
