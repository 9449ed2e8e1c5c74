//! Request and response bodies for the automation service (app bundles,
//! activities, aliases and work items).
//!
//! Argument and parameter maps use `IndexMap` so payloads serialize in the
//! order they were declared, which keeps logged payloads readable and makes
//! the generated command line line up with the parameter schema.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Content type attached to every work-item output destination.
pub const OUTPUT_CONTENT_TYPE: &str = "application/octet-stream";

/// Build a fully qualified resource name of the form `<nickname>.<id>+<alias>`.
pub fn qualified_name(nickname: &str, id: &str, alias: &str) -> String {
    format!("{nickname}.{id}+{alias}")
}

/// One page of a listing endpoint (`appbundles`, `activities`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    /// Opaque continuation token; absent or empty on the last page.
    #[serde(default)]
    pub pagination_token: Option<String>,
}

impl<T> Page<T> {
    /// Continuation token for the next page, if any.
    pub fn next_page(&self) -> Option<&str> {
        self.pagination_token.as_deref().filter(|token| !token.is_empty())
    }
}

/// Body for creating an app bundle or one of its versions.
///
/// `id` is only sent when creating the bundle itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppBundlePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub engine: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Where and how to upload the archive of a freshly created app bundle version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadParameters {
    #[serde(rename = "endpointURL")]
    pub endpoint_url: String,
    /// Server-issued form fields that must precede the file part, in order.
    #[serde(rename = "formData", default)]
    pub form_data: IndexMap<String, Value>,
}

impl UploadParameters {
    /// Form fields rendered as text, in the order the server sent them.
    pub fn form_fields(&self) -> Vec<(String, String)> {
        self.form_data
            .iter()
            .map(|(key, value)| {
                let text = match value {
                    Value::String(text) => text.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                (key.clone(), text)
            })
            .collect()
    }
}

/// Response from creating an app bundle, an activity, or a version of either.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VersionResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub version: u64,
    #[serde(default)]
    pub upload_parameters: Option<UploadParameters>,
}

/// Body for creating (`id` set) or updating (`id` unset) an alias.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AliasPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub version: u64,
}

impl AliasPayload {
    pub fn create(alias: impl Into<String>, version: u64) -> Self {
        Self {
            id: Some(alias.into()),
            version,
        }
    }

    pub fn update(version: u64) -> Self {
        Self { id: None, version }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AliasResponse {
    pub id: String,
    pub version: u64,
}

/// Transfer verb of an activity parameter or work-item argument.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParameterVerb {
    Get,
    Head,
    Put,
    Post,
    Patch,
    Read,
}

/// Declaration of one named argument in an activity's parameter schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityParameter {
    pub verb: ParameterVerb,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ondemand: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ActivityParameter {
    /// An input the engine downloads before the job starts.
    pub fn input() -> Self {
        Self {
            verb: ParameterVerb::Get,
            zip: None,
            ondemand: None,
            optional: None,
            local_name: None,
            description: None,
        }
    }

    /// An input the plugin fetches itself while running.
    pub fn on_demand_input() -> Self {
        Self {
            ondemand: Some(true),
            ..Self::input()
        }
    }

    /// An optional result uploaded after the job finishes.
    pub fn output(local_name: impl Into<String>) -> Self {
        Self {
            verb: ParameterVerb::Post,
            zip: Some(false),
            ondemand: Some(false),
            optional: Some(true),
            local_name: Some(local_name.into()),
            description: None,
        }
    }

    pub fn with_local_name(mut self, local_name: impl Into<String>) -> Self {
        self.local_name = Some(local_name.into());
        self
    }
}

/// Body for creating an activity or one of its versions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub engine: String,
    pub appbundles: Vec<String>,
    pub command_line: Vec<String>,
    #[serde(default)]
    pub settings: IndexMap<String, Value>,
    pub parameters: IndexMap<String, ActivityParameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One resolved argument of a work item.
///
/// Sources only carry a URL (signed URL or `data:` literal) plus optional
/// unpacking hints. Destinations also carry the verb and headers the service
/// uses when delivering the result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemArgument {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verb: Option<ParameterVerb>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<IndexMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_in_zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_name: Option<String>,
}

impl WorkItemArgument {
    pub fn source(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            verb: None,
            headers: None,
            zip: None,
            path_in_zip: None,
            local_name: None,
        }
    }

    /// A literal JSON payload passed as a `data:` URL.
    pub fn inline_json(payload: &Value) -> Self {
        Self::source(format!("data:application/json,{payload}"))
    }

    /// A result delivered with `PUT` to `url`, authorized with `authorization`.
    pub fn destination(url: impl Into<String>, authorization: Option<&str>) -> Self {
        let mut headers = IndexMap::new();
        if let Some(authorization) = authorization {
            headers.insert("Authorization".to_string(), authorization.to_string());
        }
        headers.insert("Content-type".to_string(), OUTPUT_CONTENT_TYPE.to_string());
        Self {
            verb: Some(ParameterVerb::Put),
            headers: Some(headers),
            ..Self::source(url)
        }
    }

    /// Marks a zipped source that the engine should leave packed, opening `path_in_zip`.
    pub fn packed(mut self, path_in_zip: impl Into<String>, local_name: impl Into<String>) -> Self {
        self.zip = Some(false);
        self.path_in_zip = Some(path_in_zip.into());
        self.local_name = Some(local_name.into());
        self
    }
}

/// Body for submitting a work item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemRequest {
    pub activity_id: String,
    pub arguments: IndexMap<String, WorkItemArgument>,
}

/// Lifecycle state of a work item as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WorkItemStatus {
    Pending,
    InProgress,
    Cancelled,
    FailedLimitDataSize,
    FailedLimitProcessingTime,
    FailedDownload,
    FailedInstructions,
    FailedUpload,
    FailedUploadOptional,
    Success,
    /// A status this client does not know; treated as terminal.
    Other(String),
}

impl WorkItemStatus {
    /// True while the service has not finished with the work item.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, WorkItemStatus::Pending | WorkItemStatus::InProgress)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, WorkItemStatus::Success)
    }

    pub fn as_str(&self) -> &str {
        match self {
            WorkItemStatus::Pending => "pending",
            WorkItemStatus::InProgress => "inprogress",
            WorkItemStatus::Cancelled => "cancelled",
            WorkItemStatus::FailedLimitDataSize => "failedLimitDataSize",
            WorkItemStatus::FailedLimitProcessingTime => "failedLimitProcessingTime",
            WorkItemStatus::FailedDownload => "failedDownload",
            WorkItemStatus::FailedInstructions => "failedInstructions",
            WorkItemStatus::FailedUpload => "failedUpload",
            WorkItemStatus::FailedUploadOptional => "failedUploadOptional",
            WorkItemStatus::Success => "success",
            WorkItemStatus::Other(raw) => raw.as_str(),
        }
    }
}

impl From<String> for WorkItemStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "pending" => WorkItemStatus::Pending,
            "inprogress" => WorkItemStatus::InProgress,
            "cancelled" => WorkItemStatus::Cancelled,
            "failedLimitDataSize" => WorkItemStatus::FailedLimitDataSize,
            "failedLimitProcessingTime" => WorkItemStatus::FailedLimitProcessingTime,
            "failedDownload" => WorkItemStatus::FailedDownload,
            "failedInstructions" => WorkItemStatus::FailedInstructions,
            "failedUpload" => WorkItemStatus::FailedUpload,
            "failedUploadOptional" => WorkItemStatus::FailedUploadOptional,
            "success" => WorkItemStatus::Success,
            _ => WorkItemStatus::Other(raw),
        }
    }
}

impl From<WorkItemStatus> for String {
    fn from(status: WorkItemStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for WorkItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status document returned when submitting or querying a work item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemResponse {
    pub id: String,
    pub status: WorkItemStatus,
    #[serde(default)]
    pub progress: Option<String>,
    #[serde(default)]
    pub report_url: Option<String>,
    #[serde(default)]
    pub stats: Option<Value>,
}
