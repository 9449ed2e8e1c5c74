//! Streaming downloads of result files to the local disk.

use std::env;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder, StatusCode};
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::redact_sensitive;

/// Upper bound on a single download, including the body transfer.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to build download client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("download request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("download failed with status {status}")]
    Status { status: StatusCode },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The directory downloads land in when nothing else is configured: the
/// user's documents directory, or the working directory when there is none.
pub fn default_download_dir() -> PathBuf {
    dirs_next::document_dir()
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Fetches `url` without authentication and writes the body to `destination`.
///
/// Returns the number of bytes written.
pub async fn download_url(url: &str, destination: &Path) -> Result<u64, DownloadError> {
    let client = Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .build()
        .map_err(DownloadError::Client)?;
    download_request(client.get(url), destination).await
}

/// Sends a prepared request and streams its body into `destination`.
///
/// Parent directories are created as needed. A non-success status leaves no
/// file behind.
pub async fn download_request(request: RequestBuilder, destination: &Path) -> Result<u64, DownloadError> {
    let started = Instant::now();
    let response = request.send().await.map_err(DownloadError::Transport)?;
    let status = response.status();
    let source = redact_sensitive(response.url().as_str());
    if !status.is_success() {
        warn!(url = %source, status = status.as_u16(), "download rejected");
        return Err(DownloadError::Status { status });
    }

    if let Some(parent) = destination.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).await.map_err(|source| DownloadError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let partial = partial_path(destination);
    let written = match write_body(response, &partial).await {
        Ok(written) => written,
        Err(error) => {
            let _ = fs::remove_file(&partial).await;
            return Err(error);
        }
    };
    fs::rename(&partial, destination).await.map_err(|source| DownloadError::Io {
        path: destination.to_path_buf(),
        source,
    })?;

    debug!(url = %source, bytes = written, duration_ms = started.elapsed().as_millis() as u64, "download complete");
    info!(path = %destination.display(), bytes = written, "downloaded");
    Ok(written)
}

/// Sibling of `destination` the body is streamed into before the final rename.
fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.file_name().map(|name| name.to_os_string()).unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}

async fn write_body(response: reqwest::Response, path: &Path) -> Result<u64, DownloadError> {
    let io_error = |source| DownloadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::create(path).await.map_err(io_error)?;
    let mut written = 0u64;
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(DownloadError::Transport)?;
        file.write_all(&chunk).await.map_err(io_error)?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(io_error)?;
    Ok(written)
}
