//! Dashboard stats: row counts and the most recent uploads.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::auth::Identity;
use crate::db::{self, RecordingWithUploader};
use crate::AppState;

use super::error::ApiError;

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub recording_count: i64,
    pub transcription_count: i64,
    pub analysis_count: i64,
    pub recent_recordings: Vec<RecordingWithUploader>,
}

/// GET /api/dashboard
pub async fn stats(
    State(state): State<Arc<AppState>>,
    _identity: Identity,
) -> Result<Json<DashboardResponse>, ApiError> {
    let (recording_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audio_recordings")
        .fetch_one(&state.db)
        .await?;
    let (transcription_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM transcriptions")
        .fetch_one(&state.db)
        .await?;
    let (analysis_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sentiment_analysis")
        .fetch_one(&state.db)
        .await?;

    let recent_recordings = db::list_all_recordings(&state.db, 5).await?;

    Ok(Json(DashboardResponse {
        recording_count,
        transcription_count,
        analysis_count,
        recent_recordings,
    }))
}
