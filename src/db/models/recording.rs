//! Audio recording, transcription, and sentiment models with their queries.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AudioRecording {
    pub id: String,
    pub user_id: String,
    pub filename: String,
    pub original_filename: String,
    pub file_path: String,
    pub duration_seconds: i64,
    pub file_size_bytes: i64,
    pub transcription_status: String,
    pub analysis_status: String,
    pub created_at: String,
}

/// Recording row joined with the uploader's name, for listings visible to
/// elevated roles.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecordingWithUploader {
    pub id: String,
    pub user_id: String,
    pub filename: String,
    pub original_filename: String,
    pub file_path: String,
    pub duration_seconds: i64,
    pub file_size_bytes: i64,
    pub transcription_status: String,
    pub analysis_status: String,
    pub created_at: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transcription {
    pub id: String,
    pub audio_recording_id: String,
    pub transcription_text: String,
    pub confidence_score: Option<f64>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SentimentAnalysis {
    pub id: String,
    pub audio_recording_id: String,
    pub sentiment_label: String,
    pub sentiment_score: Option<f64>,
    pub emotions: Option<String>,
    pub key_phrases: Option<String>,
    pub topics: Option<String>,
    pub analysis_summary: Option<String>,
    pub created_at: String,
}

/// Full view of one recording: the row plus whatever analysis rows exist.
/// Nothing here is computed; absent rows simply serialize as null.
#[derive(Debug, Serialize)]
pub struct RecordingDetail {
    pub recording: AudioRecording,
    pub transcription: Option<Transcription>,
    pub sentiment: Option<SentimentAnalysis>,
}

pub async fn get_recording_by_id(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<AudioRecording>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM audio_recordings WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_recordings_by_user(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<AudioRecording>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM audio_recordings WHERE user_id = ? ORDER BY created_at DESC")
        .bind(user_id)
        .fetch_all(pool)
        .await
}

pub async fn list_all_recordings(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<RecordingWithUploader>, sqlx::Error> {
    sqlx::query_as(
        "SELECT ar.*, u.username, u.first_name, u.last_name
         FROM audio_recordings ar
         JOIN users u ON ar.user_id = u.id
         ORDER BY ar.created_at DESC
         LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn create_recording(
    pool: &SqlitePool,
    recording: &AudioRecording,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO audio_recordings
         (id, user_id, filename, original_filename, file_path, duration_seconds,
          file_size_bytes, transcription_status, analysis_status)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&recording.id)
    .bind(&recording.user_id)
    .bind(&recording.filename)
    .bind(&recording.original_filename)
    .bind(&recording.file_path)
    .bind(recording.duration_seconds)
    .bind(recording.file_size_bytes)
    .bind(&recording.transcription_status)
    .bind(&recording.analysis_status)
    .execute(pool)
    .await?;
    Ok(())
}

/// Dependent transcription/sentiment rows go with the recording (ON DELETE
/// CASCADE).
pub async fn delete_recording(pool: &SqlitePool, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM audio_recordings WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn get_transcription_for_recording(
    pool: &SqlitePool,
    recording_id: &str,
) -> Result<Option<Transcription>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM transcriptions WHERE audio_recording_id = ?")
        .bind(recording_id)
        .fetch_optional(pool)
        .await
}

pub async fn get_sentiment_for_recording(
    pool: &SqlitePool,
    recording_id: &str,
) -> Result<Option<SentimentAnalysis>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM sentiment_analysis WHERE audio_recording_id = ?")
        .bind(recording_id)
        .fetch_optional(pool)
        .await
}
