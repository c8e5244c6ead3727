//! Recording endpoints: upload, listing, detail, delete.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::auth::Identity;
use crate::db::{self, AudioRecording, RecordingDetail, RecordingWithUploader};
use crate::uploads;
use crate::AppState;

use super::error::ApiError;

/// Elevated sessions see every recording with its uploader; everyone else
/// sees only their own rows.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RecordingListResponse {
    All { recordings: Vec<RecordingWithUploader> },
    Own { recordings: Vec<AudioRecording> },
}

/// List recordings visible to the caller
///
/// GET /api/recordings
pub async fn list_recordings(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<RecordingListResponse>, ApiError> {
    let response = if identity.role.is_elevated() {
        RecordingListResponse::All {
            recordings: db::list_all_recordings(&state.db, 100).await?,
        }
    } else {
        RecordingListResponse::Own {
            recordings: db::list_recordings_by_user(&state.db, &identity.user_id).await?,
        }
    };
    Ok(Json(response))
}

/// Upload an audio file
///
/// POST /api/recordings (multipart, field name `audio_file`)
pub async fn upload_recording(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<AudioRecording>), ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::invalid_request())?
    {
        if field.name() != Some("audio_file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(|f| f.to_string())
            .ok_or_else(ApiError::invalid_request)?;
        let bytes = field
            .bytes()
            .await
            .map_err(|_| ApiError::invalid_request())?;
        upload = Some((filename, bytes.to_vec()));
        break;
    }

    let Some((original_filename, bytes)) = upload else {
        return Err(ApiError::validation_field(
            "audio_file",
            "Please select an audio file to upload",
        ));
    };

    if !uploads::is_allowed_audio(&original_filename) {
        return Err(ApiError::validation_field(
            "audio_file",
            "Invalid file type. Only audio files are allowed",
        ));
    }

    let max_bytes = state.config.uploads.max_upload_bytes();
    if bytes.len() as u64 > max_bytes {
        return Err(ApiError::validation_field(
            "audio_file",
            format!(
                "File too large. Maximum size is {} MB",
                state.config.uploads.max_upload_mb
            ),
        ));
    }
    if bytes.is_empty() {
        return Err(ApiError::validation_field("audio_file", "File is empty"));
    }

    let upload_dir = state.config.uploads.dir(&state.config.server.data_dir);
    let stored_filename = uploads::unique_filename(&original_filename);
    let path = uploads::save_upload(&upload_dir, &stored_filename, &bytes)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to store upload: {e}")))?;

    let duration_seconds = uploads::probe_duration(&path).await;

    let recording = AudioRecording {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: identity.user_id.clone(),
        filename: stored_filename,
        original_filename,
        file_path: path.display().to_string(),
        duration_seconds,
        file_size_bytes: bytes.len() as i64,
        transcription_status: "pending".to_string(),
        analysis_status: "pending".to_string(),
        created_at: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    };

    if let Err(e) = db::create_recording(&state.db, &recording).await {
        // Do not leave an orphaned file behind if the row never landed
        uploads::remove_upload(&path).await;
        return Err(e.into());
    }

    tracing::info!(
        username = %identity.username,
        filename = %recording.original_filename,
        size = recording.file_size_bytes,
        "Audio file uploaded"
    );

    Ok((StatusCode::CREATED, Json(recording)))
}

async fn fetch_owned_recording(
    pool: &crate::DbPool,
    identity: &Identity,
    id: &str,
) -> Result<AudioRecording, ApiError> {
    let recording = db::get_recording_by_id(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Recording not found"))?;

    // Same response whether the recording is missing or merely someone
    // else's.
    if !identity.can_access_owned(&recording.user_id) {
        return Err(ApiError::not_found("Recording not found"));
    }
    Ok(recording)
}

/// Recording detail with whatever analysis rows exist
///
/// GET /api/recordings/:id
pub async fn get_recording(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<RecordingDetail>, ApiError> {
    let recording = fetch_owned_recording(&state.db, &identity, &id).await?;

    let transcription = db::get_transcription_for_recording(&state.db, &recording.id).await?;
    let sentiment = db::get_sentiment_for_recording(&state.db, &recording.id).await?;

    Ok(Json(RecordingDetail {
        recording,
        transcription,
        sentiment,
    }))
}

/// Delete a recording, its file, and its dependent analysis rows
///
/// DELETE /api/recordings/:id
pub async fn delete_recording(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let recording = fetch_owned_recording(&state.db, &identity, &id).await?;

    db::delete_recording(&state.db, &recording.id).await?;
    uploads::remove_upload(std::path::Path::new(&recording.file_path)).await;

    tracing::info!(
        username = %identity.username,
        filename = %recording.original_filename,
        "Recording deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::error::ErrorCode;
    use crate::auth::Identity;
    use crate::db::{self, AudioRecording, CreateUserRequest, Role};

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

    fn recording(id: &str, user_id: &str) -> AudioRecording {
        AudioRecording {
            id: id.to_string(),
            user_id: user_id.to_string(),
            filename: format!("{id}.wav"),
            original_filename: "call.wav".to_string(),
            file_path: format!("/tmp/{id}.wav"),
            duration_seconds: 30,
            file_size_bytes: 1024,
            transcription_status: "pending".to_string(),
            analysis_status: "pending".to_string(),
            created_at: String::new(),
        }
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
    async fn foreign_recording_reads_as_missing() {
        let pool = db::init_in_memory().await.unwrap();
        seed_user(&pool, "u1", "alice", Role::User).await;
        seed_user(&pool, "u2", "bob", Role::User).await;
        db::create_recording(&pool, &recording("r1", "u1"))
            .await
            .unwrap();

        // Someone else's recording and a nonexistent one must produce the
        // exact same error, so existence never leaks.
        let denied = super::fetch_owned_recording(&pool, &identity("u2", Role::User), "r1")
            .await
            .unwrap_err();
        let missing = super::fetch_owned_recording(&pool, &identity("u2", Role::User), "nope")
            .await
            .unwrap_err();
        assert_eq!(denied.code(), ErrorCode::NotFound);
        assert_eq!(denied.code(), missing.code());
        assert_eq!(denied.message(), missing.message());

        // The owner and elevated roles all get through
        for ident in [
            identity("u1", Role::User),
            identity("sup", Role::Supervisor),
            identity("adm", Role::Admin),
        ] {
            let found = super::fetch_owned_recording(&pool, &ident, "r1")
                .await
                .unwrap();
            assert_eq!(found.id, "r1");
        }
    }

    #[tokio::test]
    async fn listing_is_scoped_to_the_owner() {
        let pool = db::init_in_memory().await.unwrap();
        seed_user(&pool, "u1", "alice", Role::User).await;
        seed_user(&pool, "u2", "bob", Role::User).await;
        db::create_recording(&pool, &recording("r1", "u1"))
            .await
            .unwrap();
        db::create_recording(&pool, &recording("r2", "u2"))
            .await
            .unwrap();

        let own = db::list_recordings_by_user(&pool, "u1").await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].id, "r1");

        let all = db::list_all_recordings(&pool, 100).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|r| r.username == "bob"));
    }

    #[tokio::test]
    async fn delete_cascades_to_analysis_rows() {
        let pool = db::init_in_memory().await.unwrap();
        seed_user(&pool, "u1", "alice", Role::User).await;
        db::create_recording(&pool, &recording("r1", "u1"))
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO transcriptions (id, audio_recording_id, transcription_text)
             VALUES ('t1', 'r1', 'hello world')",
        )
        .execute(&pool)
        .await
        .unwrap();

        db::delete_recording(&pool, "r1").await.unwrap();

        assert!(db::get_recording_by_id(&pool, "r1")
            .await
            .unwrap()
            .is_none());
        assert!(db::get_transcription_for_recording(&pool, "r1")
            .await
            .unwrap()
            .is_none());
    }
}
