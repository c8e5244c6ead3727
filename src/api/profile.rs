//! Own-profile endpoints: view, update, change password.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::auth::{self, Identity};
use crate::db::{self, ChangePasswordRequest, UpdateProfileRequest, UserResponse};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation;

/// GET /api/profile
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<UserResponse>, ApiError> {
    let user = db::get_user_by_id(&state.db, &identity.user_id)
        .await?
        .ok_or_else(ApiError::unauthenticated)?;
    Ok(Json(UserResponse::from(user)))
}

/// Update the caller's own profile. Role and status are not touchable here.
///
/// PUT /api/profile
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validation::validate_required(&request.first_name, "First name") {
        errors.add("first_name", e);
    }
    if let Err(e) = validation::validate_required(&request.last_name, "Last name") {
        errors.add("last_name", e);
    }
    if let Err(e) = validation::validate_email(&request.email) {
        errors.add("email", e);
    }
    errors.finish()?;

    let first_name = request.first_name.trim();
    let last_name = request.last_name.trim();

    db::update_user_profile(
        &state.db,
        &identity.user_id,
        first_name,
        last_name,
        request.email.trim(),
        request.department.trim(),
    )
    .await?;

    // The session carries a name snapshot for rendering; keep it current.
    auth::refresh_session_names(&state.db, &identity.session_id, first_name, last_name).await?;

    let user = db::get_user_by_id(&state.db, &identity.user_id)
        .await?
        .ok_or_else(ApiError::unauthenticated)?;

    Ok(Json(UserResponse::from(user)))
}

/// Change the caller's password. Requires re-proof of the current password
/// on top of the new/confirm pair matching and meeting the length policy.
///
/// POST /api/profile/password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if request.current_password.is_empty()
        || request.new_password.is_empty()
        || request.confirm_password.is_empty()
    {
        return Err(ApiError::validation_field(
            "current_password",
            "All fields are required",
        ));
    }

    let user = db::get_user_by_id(&state.db, &identity.user_id)
        .await?
        .ok_or_else(ApiError::unauthenticated)?;

    auth::change_password(
        &state.db,
        &user,
        &request.current_password,
        &request.new_password,
        &request.confirm_password,
        state.config.auth.min_password_length,
    )
    .await?;

    tracing::info!(username = %identity.username, "Password changed");

    Ok(Json(serde_json::json!({ "changed": true })))
}
