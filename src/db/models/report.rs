//! Report models and queries. Reports are read-only through the API; nothing
//! in this service generates report files.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Report {
    pub id: String,
    pub title: String,
    pub description: String,
    pub report_type: String,
    pub generated_by: String,
    pub filters: Option<String>,
    pub report_data: Option<String>,
    pub report_file_path: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReportWithAuthor {
    pub id: String,
    pub title: String,
    pub description: String,
    pub report_type: String,
    pub generated_by: String,
    pub filters: Option<String>,
    pub report_data: Option<String>,
    pub report_file_path: Option<String>,
    pub created_at: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

pub async fn get_report_by_id(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<ReportWithAuthor>, sqlx::Error> {
    sqlx::query_as(
        "SELECT r.*, u.username, u.first_name, u.last_name
         FROM reports r
         JOIN users u ON r.generated_by = u.id
         WHERE r.id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn list_reports_by_user(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<ReportWithAuthor>, sqlx::Error> {
    sqlx::query_as(
        "SELECT r.*, u.username, u.first_name, u.last_name
         FROM reports r
         JOIN users u ON r.generated_by = u.id
         WHERE r.generated_by = ?
         ORDER BY r.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn list_all_reports(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<ReportWithAuthor>, sqlx::Error> {
    sqlx::query_as(
        "SELECT r.*, u.username, u.first_name, u.last_name
         FROM reports r
         JOIN users u ON r.generated_by = u.id
         ORDER BY r.created_at DESC
         LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}
