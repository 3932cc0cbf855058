use std::fmt;
use std::str::FromStr;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use http::header::AUTHORIZATION;
use http::request::Parts;
use http::HeaderMap;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        }
    }
}

impl FromStr for Role {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            "viewer" => Ok(Role::Viewer),
            other => Err(ApiError::bad_request(format!(
                "Invalid role '{}', expected one of admin, editor, viewer",
                other
            ))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Invited,
    Suspended,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Invited => "invited",
            UserStatus::Suspended => "suspended",
        }
    }
}

impl FromStr for UserStatus {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(UserStatus::Active),
            "invited" => Ok(UserStatus::Invited),
            "suspended" => Ok(UserStatus::Suspended),
            other => Err(ApiError::bad_request(format!(
                "Invalid status '{}', expected one of active, invited, suspended",
                other
            ))),
        }
    }
}

/// Decoded token payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub id: i32,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(id: i32, email: &str, role: Role) -> Self {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::days(crate::TOKEN_TTL_DAYS);
        Self {
            id,
            email: email.to_string(),
            role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        }
    }
}

pub fn issue_token(claims: &Claims, secret: &str) -> Result<String, ApiError> {
    encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| ApiError::internal(format!("could not sign token: {}", e)))
}

/// `None` for a bad signature, a malformed token or an expired one.
pub fn verify_token(token: &str, secret: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| debug!("rejected auth token: {}", e))
    .ok()
}

fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(crate::AUTH_COOKIE) {
        return Some(cookie.value().to_string());
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
}

/// Reads the session token from the cookie (or a bearer header) and returns
/// its claims. Every failure collapses to `None`.
pub fn get_auth_user(headers: &HeaderMap, secret: &str) -> Option<Claims> {
    token_from_headers(headers).and_then(|token| verify_token(&token, secret))
}

pub fn is_authenticated(user: Option<&Claims>) -> bool {
    user.is_some()
}

pub fn is_admin(user: Option<&Claims>) -> bool {
    matches!(user, Some(c) if c.role == Role::Admin)
}

pub fn is_editor(user: Option<&Claims>) -> bool {
    matches!(user, Some(c) if c.role == Role::Admin || c.role == Role::Editor)
}

pub fn auth_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((crate::AUTH_COOKIE, token))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(cookie::time::Duration::days(crate::TOKEN_TTL_DAYS))
        .build()
}

/// Expired, empty auth cookie. Sent on logout whether or not the request
/// carried a session.
pub fn removal_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((crate::AUTH_COOKIE, ""))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(cookie::time::Duration::ZERO)
        .expires(cookie::time::OffsetDateTime::UNIX_EPOCH)
        .build()
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())
        .map_err(|e| ApiError::internal(format!("could not create salt: {}", e)))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::internal(format!("could not hash password: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            debug!("stored password hash is unreadable: {}", e);
            false
        }
    }
}

/// Possibly-anonymous caller.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<Claims>);

/// Authenticated caller; rejects with 401 otherwise.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn require_editor(&self) -> Result<(), ApiError> {
        if is_editor(Some(&self.0)) {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Editor access required".into()))
        }
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if is_admin(Some(&self.0)) {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Admin access required".into()))
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(get_auth_user(&parts.headers, &state.config.jwt_secret)))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        get_auth_user(&parts.headers, &state.config.jwt_secret)
            .map(AuthUser)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))
    }
}
