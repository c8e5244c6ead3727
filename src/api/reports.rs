//! Report endpoints. Read-only: report generation itself happens elsewhere,
//! this service only lists and shows whatever rows exist.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::auth::Identity;
use crate::db::{self, ReportWithAuthor};
use crate::AppState;

use super::error::ApiError;

#[derive(Debug, Serialize)]
pub struct ReportListResponse {
    pub reports: Vec<ReportWithAuthor>,
}

/// List reports visible to the caller: all of them for elevated roles, own
/// ones otherwise.
///
/// GET /api/reports
pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<ReportListResponse>, ApiError> {
    let reports = if identity.role.is_elevated() {
        db::list_all_reports(&state.db, 100).await?
    } else {
        db::list_reports_by_user(&state.db, &identity.user_id).await?
    };
    Ok(Json(ReportListResponse { reports }))
}

/// Report detail, ownership-checked against generated_by
///
/// GET /api/reports/:id
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<ReportWithAuthor>, ApiError> {
    let report = db::get_report_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Report not found"))?;

    if !identity.can_access_owned(&report.generated_by) {
        return Err(ApiError::not_found("Report not found"));
    }

    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ErrorCode;
    use crate::config::Config;
    use crate::db::{CreateUserRequest, Role};

    async fn seed_user(pool: &db::DbPool, id: &str, username: &str, role: Role) {
        let req = CreateUserRequest {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: String::new(),
            role,
            first_name: String::new(),
            last_name: String::new(),
            department: String::new(),
        };
        db::create_user(pool, id, &req, "x").await.unwrap();
    }

    fn identity(user_id: &str, role: Role) -> Identity {
        Identity {
            session_id: "s1".to_string(),
            user_id: user_id.to_string(),
            username: "whoever".to_string(),
            role,
            first_name: String::new(),
            last_name: String::new(),
            csrf_token: String::new(),
        }
    }

    #[tokio::test]
    async fn foreign_report_reads_as_missing() {
        let pool = db::init_in_memory().await.unwrap();
        seed_user(&pool, "u1", "alice", Role::User).await;
        seed_user(&pool, "u2", "bob", Role::User).await;
        sqlx::query(
            "INSERT INTO reports (id, title, report_type, generated_by)
             VALUES ('rep1', 'Weekly sentiment', 'sentiment', 'u1')",
        )
        .execute(&pool)
        .await
        .unwrap();
        let state = Arc::new(crate::AppState::new(Config::default(), pool));

        // Someone else's report and a nonexistent id are indistinguishable
        let denied = get_report(
            State(state.clone()),
            identity("u2", Role::User),
            Path("rep1".to_string()),
        )
        .await
        .unwrap_err();
        let missing = get_report(
            State(state.clone()),
            identity("u2", Role::User),
            Path("nope".to_string()),
        )
        .await
        .unwrap_err();
        assert_eq!(denied.code(), ErrorCode::NotFound);
        assert_eq!(denied.code(), missing.code());
        assert_eq!(denied.message(), missing.message());

        // The author and elevated roles all see it
        for ident in [
            identity("u1", Role::User),
            identity("sup", Role::Supervisor),
            identity("adm", Role::Admin),
        ] {
            let Json(report) = get_report(State(state.clone()), ident, Path("rep1".to_string()))
                .await
                .unwrap();
            assert_eq!(report.username, "alice");
        }
    }
}
