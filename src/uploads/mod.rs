//! Audio upload plumbing: allow-list checks, unique stored filenames, the
//! move-to-disk step, and an optional duration probe via ffprobe.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Accepted audio file extensions. `audio/mpeg` content arrives as `.mp3`;
/// a bare `.mpeg` extension means the video container and is not accepted.
pub const ALLOWED_EXTENSIONS: &[&str] = &["wav", "mp3", "wma", "aac", "flac", "ogg"];

/// Extract the lowercase extension of an uploaded filename.
pub fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Whether an uploaded file looks like audio we accept. The extension must be
/// on the allow-list and its guessed MIME type must be in the audio family.
/// Content sniffing is not attempted; this mirrors the MIME check the upload
/// form performs.
pub fn is_allowed_audio(filename: &str) -> bool {
    let Some(ext) = file_extension(filename) else {
        return false;
    };
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return false;
    }
    mime_guess::from_ext(&ext)
        .iter()
        .any(|m| m.type_() == mime_guess::mime::AUDIO)
}

/// Generate a unique stored filename preserving the original extension.
pub fn unique_filename(original: &str) -> String {
    let ext = file_extension(original).unwrap_or_else(|| "bin".to_string());
    let stamp = chrono::Utc::now().timestamp();
    format!("{}_{}.{}", uuid::Uuid::new_v4().simple(), stamp, ext)
}

/// Write uploaded bytes to the upload directory. Returns the full path.
pub async fn save_upload(upload_dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(upload_dir)
        .await
        .with_context(|| format!("Failed to create upload dir {}", upload_dir.display()))?;
    let path = upload_dir.join(filename);
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("Failed to write upload {}", path.display()))?;
    Ok(path)
}

/// Remove a stored upload, ignoring a file that is already gone.
pub async fn remove_upload(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove upload");
        }
    }
}

fn ffprobe_binary() -> Option<&'static str> {
    ["/usr/bin/ffprobe", "/usr/local/bin/ffprobe"]
        .into_iter()
        .find(|p| Path::new(p).exists())
}

/// Probe audio duration in whole seconds with ffprobe, when it is installed.
/// Any failure degrades to 0 rather than failing the upload.
pub async fn probe_duration(path: &Path) -> i64 {
    let Some(ffprobe) = ffprobe_binary() else {
        return 0;
    };

    let output = tokio::process::Command::new(ffprobe)
        .args(["-v", "quiet", "-show_entries", "format=duration", "-of", "csv=p=0"])
        .arg(path)
        .output()
        .await;

    match output {
        Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout)
            .trim()
            .parse::<f64>()
            .map(|d| d as i64)
            .unwrap_or(0),
        _ => 0,
    }
}
