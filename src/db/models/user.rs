//! User and session models, plus the user-store queries.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// Closed set of user roles. Guards match on explicit allow-sets, never on a
/// rank comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Supervisor,
    User,
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Supervisor => "supervisor",
            Role::User => "user",
            Role::Client => "client",
        }
    }

    /// Admins and supervisors bypass per-record ownership restrictions.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Role::Admin | Role::Supervisor)
    }

    pub const ALL: [Role; 4] = [Role::Admin, Role::Supervisor, Role::User, Role::Client];
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "supervisor" => Ok(Role::Supervisor),
            "user" => Ok(Role::User),
            "client" => Ok(Role::Client),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account status. Only active accounts may authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub department: String,
    pub status: UserStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// User shape returned by the API; never includes the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub department: String,
    pub status: UserStatus,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            first_name: user.first_name,
            last_name: user.last_name,
            department: user.department,
            status: user.status,
        }
    }
}

/// Server-side session record. The browser holds only the raw token; the
/// stored value is its SHA-256 hash. The identity snapshot mirrors what the
/// login flow captured, and the name fields are refreshed by profile updates.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub csrf_token: String,
    pub username: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub expires_at: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub csrf_token: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub department: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub department: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub department: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

// -------------------------------------------------------------------------
// User store queries
// -------------------------------------------------------------------------

pub async fn get_user_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await
}

pub async fn get_user_by_id(pool: &SqlitePool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_users_by_role(pool: &SqlitePool, role: Role) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE role = ? ORDER BY created_at DESC")
        .bind(role)
        .fetch_all(pool)
        .await
}

pub async fn username_exists(pool: &SqlitePool, username: &str) -> Result<bool, sqlx::Error> {
    let row: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

/// Insert a new user row. The UNIQUE constraint on username is the real
/// uniqueness guarantee; any pre-check is advisory only.
pub async fn create_user(
    pool: &SqlitePool,
    id: &str,
    req: &CreateUserRequest,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO users (id, username, email, password_hash, role, first_name, last_name, department)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(&req.username)
    .bind(&req.email)
    .bind(password_hash)
    .bind(req.role)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(&req.department)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update_user_profile(
    pool: &SqlitePool,
    id: &str,
    first_name: &str,
    last_name: &str,
    email: &str,
    department: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users SET first_name = ?, last_name = ?, email = ?, department = ?,
         updated_at = datetime('now') WHERE id = ?",
    )
    .bind(first_name)
    .bind(last_name)
    .bind(email)
    .bind(department)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update_user_role(pool: &SqlitePool, id: &str, role: Role) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET role = ?, updated_at = datetime('now') WHERE id = ?")
        .bind(role)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_user_password(
    pool: &SqlitePool,
    id: &str,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET password_hash = ?, updated_at = datetime('now') WHERE id = ?")
        .bind(password_hash)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn only_admin_and_supervisor_are_elevated() {
        assert!(Role::Admin.is_elevated());
        assert!(Role::Supervisor.is_elevated());
        assert!(!Role::User.is_elevated());
        assert!(!Role::Client.is_elevated());
    }

    #[test]
    fn user_response_drops_password_hash() {
        let serialized = serde_json::to_string(&UserResponse {
            id: "u1".into(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            role: Role::User,
            first_name: "Alice".into(),
            last_name: "Reed".into(),
            department: "Support".into(),
            status: UserStatus::Active,
        })
        .unwrap();
        assert!(!serialized.contains("password"));
        assert!(serialized.contains("\"role\":\"user\""));
    }
}
