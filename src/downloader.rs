//! Streaming download of an archived capture to a collision-safe local file.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::{header, Client, StatusCode};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::Config;
use crate::log_sink::{LogSink, Severity};
use crate::resolver::ArchiveRecord;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("request to archive failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("download failed with status {0}")]
    BadStatus(StatusCode),
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
    #[error("download cancelled")]
    Cancelled,
}

/// Fetch `record.archive_url` into `config.download_dir`.
///
/// The body streams to `<id>-<epochMillis>.tmp` first and the final name
/// commits only after the transfer completes, so a failed or cancelled
/// transfer never leaves a half-written file under a final name. The CDX
/// listing only reveals which probed filename existed historically; the bytes
/// served now are authoritative for the real media type, so a recognized
/// `Content-Type` overrides the probed fallback extension.
///
/// # Errors
///
/// Returns an error when the transfer fails, the playback endpoint answers
/// with a non-success status, a filesystem step fails, or cancellation is
/// requested.
pub async fn download(
    client: &Client,
    config: &Config,
    record: &ArchiveRecord,
    id: &str,
    cancel: &CancellationToken,
    sink: &dyn LogSink,
) -> Result<PathBuf, DownloadError> {
    if cancel.is_cancelled() {
        return Err(DownloadError::Cancelled);
    }

    let temp_path = config.download_dir.join(format!(
        "{id}-{}.tmp",
        chrono::Utc::now().timestamp_millis()
    ));

    let request = client.get(&record.archive_url).send();
    let response = tokio::select! {
        () = cancel.cancelled() => return Err(DownloadError::Cancelled),
        result = request => result?,
    };

    // Headers are available before the body; reconcile the extension now so
    // the final name is ready the moment the transfer completes.
    let mut final_ext = record.fallback_ext.clone();
    if let Some(mapped) = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(extension_for_mime)
    {
        sink.log(
            &format!("Server reports file type '{mapped}'."),
            Severity::Blue,
        );
        final_ext = mapped.to_string();
    }

    let status = response.status();
    if !status.is_success() {
        warn!(id, %status, "Archive playback returned an error status");
        return Err(DownloadError::BadStatus(status));
    }

    let mut file = tokio::fs::File::create(&temp_path).await?;
    let mut body = response.bytes_stream();
    loop {
        let chunk = tokio::select! {
            () = cancel.cancelled() => {
                drop(file);
                let _ = tokio::fs::remove_file(&temp_path).await;
                return Err(DownloadError::Cancelled);
            }
            chunk = body.next() => chunk,
        };
        let Some(chunk) = chunk else { break };
        match chunk {
            Ok(bytes) => file.write_all(&bytes).await?,
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(&temp_path).await;
                return Err(e.into());
            }
        }
    }
    file.flush().await?;
    drop(file);

    let final_path = free_final_path(&config.download_dir, id, &final_ext).await?;
    tokio::fs::rename(&temp_path, &final_path).await?;
    debug!(id, path = %final_path.display(), "Download committed");

    Ok(final_path)
}

/// First free of `<id><ext>`, `<id>_2<ext>`, `<id>_3<ext>`, ...
///
/// Deterministic and contiguous; safe because exactly one worker writes to the
/// destination directory at a time.
async fn free_final_path(dir: &Path, id: &str, ext: &str) -> Result<PathBuf, std::io::Error> {
    let unsuffixed = dir.join(format!("{id}{ext}"));
    if !tokio::fs::try_exists(&unsuffixed).await? {
        return Ok(unsuffixed);
    }

    let mut counter: u32 = 2;
    loop {
        let candidate = dir.join(format!("{id}_{counter}{ext}"));
        if !tokio::fs::try_exists(&candidate).await? {
            return Ok(candidate);
        }
        counter += 1;
    }
}

/// Map a declared content type to a known media extension.
fn extension_for_mime(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next().unwrap_or("").trim();
    match mime {
        "image/jpeg" => Some(".jpg"),
        "image/png" => Some(".png"),
        "image/gif" => Some(".gif"),
        "video/mp4" => Some(".mp4"),
        "video/webm" => Some(".webm"),
        "video/mpeg" => Some(".mpeg"),
        _ => None,
    }
}
