//! User management endpoints.
//!
//! Listing is open to admin and supervisor sessions; mutations are a strictly
//! narrower set, admin only.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::auth::{self, Identity};
use crate::db::{self, CreateUserRequest, Role, UpdateUserRequest, UserResponse};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation;

/// Users grouped by role, mirroring the management page layout.
#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub admins: Vec<UserResponse>,
    pub supervisors: Vec<UserResponse>,
    pub users: Vec<UserResponse>,
    pub clients: Vec<UserResponse>,
}

/// List all users grouped by role
///
/// GET /api/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<UserListResponse>, ApiError> {
    identity.require_role(&[Role::Admin, Role::Supervisor])?;

    let mut grouped = UserListResponse {
        admins: Vec::new(),
        supervisors: Vec::new(),
        users: Vec::new(),
        clients: Vec::new(),
    };

    for role in Role::ALL {
        let users = db::list_users_by_role(&state.db, role)
            .await?
            .into_iter()
            .map(UserResponse::from)
            .collect();
        match role {
            Role::Admin => grouped.admins = users,
            Role::Supervisor => grouped.supervisors = users,
            Role::User => grouped.users = users,
            Role::Client => grouped.clients = users,
        }
    }

    Ok(Json(grouped))
}

/// Create a new user
///
/// POST /api/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    identity.require_role(&[Role::Admin])?;

    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validation::validate_username(&request.username) {
        errors.add("username", e);
    }
    if let Err(e) = validation::validate_email(&request.email) {
        errors.add("email", e);
    }
    if request.password.len() < state.config.auth.min_password_length {
        errors.add(
            "password",
            format!(
                "Password must be at least {} characters long",
                state.config.auth.min_password_length
            ),
        );
    }
    errors.finish()?;

    // Advisory pre-check for a friendly message; the UNIQUE constraint on
    // username is what actually closes the race between concurrent creates.
    if db::username_exists(&state.db, &request.username).await? {
        return Err(ApiError::conflict("Username already exists"));
    }

    let password_hash = auth::hash_password(&request.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {e}")))?;
    let id = uuid::Uuid::new_v4().to_string();

    match db::create_user(&state.db, &id, &request, &password_hash).await {
        Ok(()) => {}
        Err(e) => {
            let err = ApiError::from(e);
            if err.code() == super::error::ErrorCode::Conflict {
                return Err(ApiError::conflict("Username already exists"));
            }
            return Err(err);
        }
    }

    tracing::info!(username = %request.username, role = %request.role, "User created");

    let user = db::get_user_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::internal("User vanished after insert"))?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Update another user's profile fields and role
///
/// PUT /api/users/:id
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    // Role changes are an escalation path, so this whole endpoint is
    // admin-only even though supervisors can see the listing.
    identity.require_role(&[Role::Admin])?;

    let user = db::get_user_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    db::update_user_profile(
        &state.db,
        &user.id,
        request.first_name.trim(),
        request.last_name.trim(),
        &user.email,
        request.department.trim(),
    )
    .await?;
    db::update_user_role(&state.db, &user.id, request.role).await?;

    tracing::info!(username = %user.username, role = %request.role, "User updated");

    let updated = db::get_user_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(UserResponse::from(updated)))
}

#[cfg(test)]
mod tests {
    use crate::api::error::{ApiError, ErrorCode};
    use crate::db::{self, CreateUserRequest, Role};

    fn request(username: &str) -> CreateUserRequest {
        CreateUserRequest {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: "hunter22".to_string(),
            role: Role::User,
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            department: "QA".to_string(),
        }
    }

    #[tokio::test]
    async fn duplicate_username_loses_the_race() {
        let pool = db::init_in_memory().await.unwrap();
        let req = request("dupe");
        let hash = crate::auth::hash_password("hunter22").unwrap();

        db::create_user(&pool, "u1", &req, &hash).await.unwrap();

        // Second insert with the same username must be stopped by the UNIQUE
        // constraint even though it skipped the advisory existence check.
        let err = db::create_user(&pool, "u2", &req, &hash).await.unwrap_err();
        assert_eq!(ApiError::from(err).code(), ErrorCode::Conflict);

        assert!(db::username_exists(&pool, "dupe").await.unwrap());
        assert!(db::get_user_by_id(&pool, "u2").await.unwrap().is_none());
    }
}
