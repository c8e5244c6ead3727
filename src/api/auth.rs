//! Login, logout, and current-session endpoints.

use axum::{extract::State, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use std::sync::Arc;

use crate::auth::{self, Identity, SESSION_COOKIE};
use crate::db::{self, LoginRequest, LoginResponse, Role, UserResponse};
use crate::AppState;

use super::error::ApiError;

/// Current-session response: identity plus the CSRF token the frontend must
/// echo on every state-changing submission.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user_id: String,
    pub username: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub csrf_token: String,
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Login endpoint
///
/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    if request.username.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::validation_field(
            "username",
            "Please enter both username and password",
        ));
    }

    let user = auth::authenticate(&state.db, &request.username, &request.password).await?;

    // A brand-new session token on every login; any token the browser held
    // before is simply replaced.
    let (token, session) =
        auth::create_session(&state.db, &user, state.config.auth.session_ttl_hours).await?;

    tracing::info!(username = %user.username, "User logged in");

    let jar = jar.add(session_cookie(token));
    Ok((
        jar,
        Json(LoginResponse {
            user: UserResponse::from(user),
            csrf_token: session.csrf_token,
        }),
    ))
}

/// Logout endpoint. Destroys the session unconditionally.
///
/// POST /api/auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    identity: Identity,
) -> Result<(CookieJar, Json<serde_json::Value>), ApiError> {
    auth::destroy_session(&state.db, &identity.session_id).await?;

    tracing::info!(username = %identity.username, "User logged out");

    let jar = jar.remove(Cookie::from(SESSION_COOKIE));
    Ok((jar, Json(serde_json::json!({ "logged_out": true }))))
}

/// Current identity for the frontend.
///
/// GET /api/auth/session
pub async fn session(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<SessionResponse>, ApiError> {
    // The session snapshot is authoritative for names; re-check the account
    // still exists so a deleted user cannot keep an identity alive.
    if db::get_user_by_id(&state.db, &identity.user_id)
        .await?
        .is_none()
    {
        return Err(ApiError::unauthenticated());
    }

    Ok(Json(SessionResponse {
        user_id: identity.user_id,
        username: identity.username,
        role: identity.role,
        first_name: identity.first_name,
        last_name: identity.last_name,
        csrf_token: identity.csrf_token,
    }))
}
