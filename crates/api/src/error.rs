use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Failures surfaced by the HTTP client and the resource facades.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("authentication failed: {reason}")]
    Authentication { reason: String },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{message} (HTTP {status})")]
    Status {
        message: String,
        status: StatusCode,
        body: String,
    },
    #[error(transparent)]
    Response(#[from] ResponseError),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("failed to build request: {0}")]
    Request(#[source] reqwest::Error),
}

/// Problems reading a response body that arrived with a usable status.
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("response body is not a JSON object: {reason}")]
    Unparsable { reason: String },
    #[error("response is missing field '{0}'")]
    MissingField(String),
    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;
