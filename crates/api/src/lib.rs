//! HTTP access to the automation and storage services.
//!
//! [`ApiClient`] handles base URL validation, credential exchange and request
//! logging. [`AutomationClient`] and [`StorageClient`] expose one method per
//! service operation and hand back an [`ApiResponse`] for the caller to judge.

pub mod auth;
pub mod automation;
pub mod client;
pub mod error;
pub mod response;
pub mod storage;

pub use auth::{AUTOMATION_SCOPE, Credential, STORAGE_SCOPE, TokenProvider};
pub use automation::AutomationClient;
pub use client::{ApiClient, is_local_host, validate_base_url};
pub use error::{ApiError, ApiResult, ResponseError};
pub use response::ApiResponse;
pub use storage::StorageClient;
