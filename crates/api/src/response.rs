//! Uniform view over a completed HTTP exchange.

use da_util::redact_sensitive;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::error;

use crate::error::{ApiError, ResponseError};

/// Status code and body text of a response, read to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    status: StatusCode,
    body: String,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// True for any status in `200..=299`.
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status.as_u16())
    }

    /// Looks up a top-level field of a JSON object body.
    ///
    /// Strings come back without quotes; numbers, booleans, arrays and objects
    /// come back as their JSON text. Returns `None` when the body is not a JSON
    /// object or the field is absent or null. Use [`ApiResponse::field`] to tell
    /// those cases apart.
    pub fn get_field(&self, key: &str) -> Option<String> {
        self.field(key).ok().flatten()
    }

    /// Like [`ApiResponse::get_field`], but an unparsable body is an error
    /// while an absent field is `Ok(None)`.
    pub fn field(&self, key: &str) -> Result<Option<String>, ResponseError> {
        let value: Value = serde_json::from_str(&self.body).map_err(|error| ResponseError::Unparsable {
            reason: error.to_string(),
        })?;
        let Value::Object(map) = value else {
            return Err(ResponseError::Unparsable {
                reason: "top-level value is not an object".to_string(),
            });
        };
        Ok(match map.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(text.clone()),
            Some(other) => Some(other.to_string()),
        })
    }

    /// A field that must be present and non-empty.
    pub fn require_field(&self, key: &str) -> Result<String, ResponseError> {
        self.field(key)?
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ResponseError::MissingField(key.to_string()))
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ResponseError> {
        serde_json::from_str(&self.body).map_err(ResponseError::Decode)
    }

    /// Logs `message` together with the status and the (redacted) body.
    pub fn report_error(&self, message: &str) {
        error!(
            status = self.status.as_u16(),
            body = %redact_sensitive(&self.body),
            "{message}"
        );
    }

    /// Reports the response when it is not a success. Returns whether it was an error.
    pub fn report_if_error(&self, message: &str) -> bool {
        if self.is_success() {
            return false;
        }
        self.report_error(message);
        true
    }

    /// Passes successful responses through and turns anything else into
    /// [`ApiError::Status`] after reporting it.
    pub fn ensure_success(self, message: &str) -> Result<Self, ApiError> {
        if !self.report_if_error(message) {
            return Ok(self);
        }
        Err(ApiError::Status {
            message: message.to_string(),
            status: self.status,
            body: self.body,
        })
    }
}
