//! Session authentication, role authorization, and CSRF protection.
//!
//! Every page handler consumes this module through the [`Identity`] extractor
//! and its guard methods. Guard order is authentication, then role, then CSRF
//! (the CSRF check runs as middleware on state-changing methods only).

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Method, Request},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::api::error::ApiError;
use crate::db::{self, Role, Session, User, UserStatus};
use crate::AppState;

/// Name of the browser-held session cookie.
pub const SESSION_COOKIE: &str = "callscope_session";

/// Header carrying the CSRF token on state-changing submissions. One name,
/// used consistently by every form in the frontend.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Generate a random 256-bit token, hex-encoded
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash a session token for storage
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare a submitted CSRF token against the session's stored value without
/// leaking how long a matching prefix was.
pub fn validate_csrf(expected: &str, submitted: &str) -> bool {
    let expected = expected.as_bytes();
    let submitted = submitted.as_bytes();
    expected.len() == submitted.len() && expected.ct_eq(submitted).into()
}

/// Timestamp format comparable to SQLite's datetime('now')
fn sql_timestamp(ts: chrono::DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

// -------------------------------------------------------------------------
// Credential verification and session lifecycle
// -------------------------------------------------------------------------

/// Verify a username/password pair against the user store.
///
/// Unknown usernames and wrong passwords are indistinguishable to the caller;
/// an inactive account with valid credentials is the one visible branch.
pub async fn authenticate(
    pool: &SqlitePool,
    username: &str,
    password: &str,
) -> Result<User, ApiError> {
    let user = db::get_user_by_username(pool, username)
        .await?
        .ok_or_else(ApiError::invalid_credentials)?;

    if !verify_password(password, &user.password_hash) {
        return Err(ApiError::invalid_credentials());
    }

    if user.status != UserStatus::Active {
        return Err(ApiError::account_inactive());
    }

    Ok(user)
}

/// Establish a new session for a user. A fresh token and CSRF token are
/// issued on every login, so an anonymous pre-login identifier can never be
/// fixated into an authenticated one.
pub async fn create_session(
    pool: &SqlitePool,
    user: &User,
    ttl_hours: i64,
) -> Result<(String, Session), ApiError> {
    let token = generate_token();
    let token_hash = hash_token(&token);
    let csrf_token = generate_token();

    let session_id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now();
    let expires_at = sql_timestamp(now + Duration::hours(ttl_hours));

    sqlx::query(
        "INSERT INTO sessions
         (id, user_id, token_hash, csrf_token, username, role, first_name, last_name, expires_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&session_id)
    .bind(&user.id)
    .bind(&token_hash)
    .bind(&csrf_token)
    .bind(&user.username)
    .bind(user.role)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&expires_at)
    .execute(pool)
    .await?;

    let session = Session {
        id: session_id,
        user_id: user.id.clone(),
        token_hash,
        csrf_token,
        username: user.username.clone(),
        role: user.role,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        expires_at,
        created_at: sql_timestamp(now),
    };

    Ok((token, session))
}

/// Look up a live session by its browser-held token.
pub async fn session_from_token(
    pool: &SqlitePool,
    token: &str,
) -> Result<Option<Session>, sqlx::Error> {
    let token_hash = hash_token(token);
    sqlx::query_as("SELECT * FROM sessions WHERE token_hash = ? AND expires_at > datetime('now')")
        .bind(&token_hash)
        .fetch_optional(pool)
        .await
}

/// Destroy a session unconditionally.
pub async fn destroy_session(pool: &SqlitePool, session_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Keep the session's name snapshot in step with profile updates.
pub async fn refresh_session_names(
    pool: &SqlitePool,
    session_id: &str,
    first_name: &str,
    last_name: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE sessions SET first_name = ?, last_name = ? WHERE id = ?")
        .bind(first_name)
        .bind(last_name)
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Validate a new-password submission against policy.
pub fn validate_new_password(
    new_password: &str,
    confirm_password: &str,
    min_length: usize,
) -> Result<(), ApiError> {
    if new_password != confirm_password {
        return Err(ApiError::validation_field(
            "confirm_password",
            "New passwords do not match",
        ));
    }
    if new_password.len() < min_length {
        return Err(ApiError::validation_field(
            "new_password",
            format!("New password must be at least {min_length} characters long"),
        ));
    }
    Ok(())
}

/// Change a user's password after re-proving the current one.
pub async fn change_password(
    pool: &SqlitePool,
    user: &User,
    current_password: &str,
    new_password: &str,
    confirm_password: &str,
    min_length: usize,
) -> Result<(), ApiError> {
    validate_new_password(new_password, confirm_password, min_length)?;

    if !verify_password(current_password, &user.password_hash) {
        return Err(ApiError::validation_field(
            "current_password",
            "Current password is incorrect",
        ));
    }

    let new_hash = hash_password(new_password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {e}")))?;
    db::update_user_password(pool, &user.id, &new_hash).await?;
    Ok(())
}

/// Ensure a default admin account exists, seeding one on first start.
pub async fn ensure_admin_user(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    password: &str,
) -> anyhow::Result<()> {
    if db::username_exists(pool, username).await? {
        return Ok(());
    }

    let password_hash =
        hash_password(password).map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;
    let id = uuid::Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO users (id, username, email, password_hash, role, first_name, last_name)
         VALUES (?, ?, ?, ?, 'admin', 'System', 'Admin')",
    )
    .bind(&id)
    .bind(username)
    .bind(email)
    .bind(&password_hash)
    .execute(pool)
    .await?;

    tracing::info!(username = username, "Created default admin user");
    Ok(())
}

// -------------------------------------------------------------------------
// Guards
// -------------------------------------------------------------------------

/// Identity of the authenticated caller, extracted from the session cookie.
/// Extracting it is the authentication guard: handlers that take an
/// `Identity` argument cannot run without a live session.
#[derive(Debug, Clone)]
pub struct Identity {
    pub session_id: String,
    pub user_id: String,
    pub username: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub csrf_token: String,
}

impl From<Session> for Identity {
    fn from(session: Session) -> Self {
        Self {
            session_id: session.id,
            user_id: session.user_id,
            username: session.username,
            role: session.role,
            first_name: session.first_name,
            last_name: session.last_name,
            csrf_token: session.csrf_token,
        }
    }
}

impl Identity {
    /// Role guard: the caller's role must be in the allow-set. Each call site
    /// names its set explicitly; there is no privilege ranking.
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), ApiError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::unauthorized("You are not permitted to do this"))
        }
    }

    /// Ownership guard: owners see their own records; admin and supervisor
    /// sessions see everyone's. Callers surface a denial as NotFound so a
    /// record's existence never leaks.
    pub fn can_access_owned(&self, owner_id: &str) -> bool {
        self.role.is_elevated() || self.user_id == owner_id
    }
}

fn session_token_from_parts(parts: &Parts) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token_from_parts(parts).ok_or_else(ApiError::unauthenticated)?;
        let session = session_from_token(&state.db, &token)
            .await?
            .ok_or_else(ApiError::unauthenticated)?;
        Ok(Identity::from(session))
    }
}

/// CSRF middleware for state-changing methods. Read-only requests pass
/// through; everything else must carry the session's token in the
/// `x-csrf-token` header. A missing session here is an authentication
/// failure, not a CSRF one.
pub async fn csrf_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if matches!(
        *request.method(),
        Method::GET | Method::HEAD | Method::OPTIONS
    ) {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let token = session_token_from_parts(&parts).ok_or_else(ApiError::unauthenticated)?;
    let session = session_from_token(&state.db, &token)
        .await?
        .ok_or_else(ApiError::unauthenticated)?;

    let submitted = parts
        .headers
        .get(CSRF_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    if !validate_csrf(&session.csrf_token, submitted) {
        // Deliberately generic: do not reveal whether the token was missing,
        // stale, or wrong.
        return Err(ApiError::invalid_request());
    }

    let request = Request::from_parts(parts, body);
    Ok(next.run(request).await)
}
