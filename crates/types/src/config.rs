//! Workflow configuration record.
//!
//! The record is loaded once from a JSON document with PascalCase keys and is
//! treated as immutable for the duration of a run. Older key spellings
//! (`InventorIOBaseUrl`, `ForgeDMBaseUrl`, `partReport`, `assemblyReport`) are
//! accepted as aliases so existing configuration files keep working.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::storage::BucketPolicy;

/// How declared outputs are fetched once a work item succeeds.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum OutputRetrieval {
    /// Request a fresh signed URL per output and download it anonymously.
    #[default]
    SignedUrl,
    /// Download the object URL the work item delivered to, with bearer auth.
    Direct,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("configuration field '{0}' must not be empty")]
    MissingField(&'static str),
    #[error("configuration field '{field}' is invalid: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct WorkflowConfig {
    /// App bundle identifier, unqualified.
    pub app_id: String,
    /// Engine identifier, e.g. `Autodesk.Inventor+2024`.
    pub engine_name: String,
    /// Executable launched by the activity's command line.
    #[serde(default = "default_engine_executable")]
    pub engine_executable: String,
    /// Packaged app bundle archive. A leading `~` is expanded; relative paths
    /// resolve against the working directory.
    pub local_app_package: PathBuf,
    /// Directory holding the local input files, resolved like `local_app_package`.
    pub input_path: PathBuf,
    pub input_part_file: String,
    /// Zipped assembly input; the assembly work item only runs when this is set.
    #[serde(default)]
    pub input_assembly_zip_file: Option<String>,
    /// Top-level assembly document inside the zipped assembly.
    #[serde(default)]
    pub input_top_level_assembly: Option<String>,
    pub output_part_small_file: String,
    pub output_part_large_file: String,
    pub output_part_small_thumb: String,
    pub output_part_large_thumb: String,
    pub output_image_small_file: String,
    pub output_image_large_file: String,
    pub output_zip_assembly_file: String,
    pub part_assembly_activity_id: String,
    #[serde(alias = "InventorIOBaseUrl")]
    pub automation_base_url: String,
    #[serde(alias = "ForgeDMBaseUrl")]
    pub storage_base_url: String,
    pub req_input_arg_name: String,
    pub output_part_small_arg_name: String,
    pub output_part_large_arg_name: String,
    pub output_part_small_thumb_arg_name: String,
    pub output_part_large_thumb_arg_name: String,
    pub output_assembly_arg_name: String,
    pub output_image_small_arg_name: String,
    pub output_image_large_arg_name: String,
    pub error_report: String,
    #[serde(alias = "partReport")]
    pub part_report: String,
    #[serde(alias = "assemblyReport")]
    pub assembly_report: String,
    pub param_file_small: String,
    pub param_file_large: String,
    pub param_arg_name_small: String,
    pub param_arg_name_large: String,
    pub light_file: String,
    pub heavy_file: String,
    #[serde(default = "default_light_arg_name")]
    pub light_arg_name: String,
    #[serde(default = "default_heavy_arg_name")]
    pub heavy_arg_name: String,
    /// Inline parameters passed to the part work item.
    #[serde(default = "default_part_parameters")]
    pub part_parameters: Value,
    /// Inline parameters passed to the assembly work item.
    #[serde(default = "default_assembly_parameters")]
    pub assembly_parameters: Value,
    /// Deployment alias shared by the app bundle and the activity.
    #[serde(default = "default_alias")]
    pub alias: String,
    /// Overrides the `<client id>input` bucket key.
    #[serde(default)]
    pub input_bucket_key: Option<String>,
    /// Overrides the `<client id>output` bucket key.
    #[serde(default)]
    pub output_bucket_key: Option<String>,
    #[serde(default)]
    pub bucket_policy: BucketPolicy,
    #[serde(default)]
    pub output_retrieval: OutputRetrieval,
    /// Download directory; falls back to the user's documents directory.
    #[serde(default)]
    pub output_directory: Option<PathBuf>,
}

fn default_engine_executable() -> String {
    "InventorCoreConsole.exe".to_string()
}

fn default_light_arg_name() -> String {
    "ImageLight".to_string()
}

fn default_heavy_arg_name() -> String {
    "ImageHeavy".to_string()
}

fn default_part_parameters() -> Value {
    json!({"height": "16 in", "width": "10 in"})
}

fn default_assembly_parameters() -> Value {
    json!({"handleOffset": "9 in", "height": "16 in"})
}

fn default_alias() -> String {
    "prod".to_string()
}

impl WorkflowConfig {
    /// Bucket holding the uploaded inputs.
    pub fn input_bucket_key(&self, client_id: &str) -> String {
        self.input_bucket_key
            .clone()
            .unwrap_or_else(|| format!("{}input", client_id.to_lowercase()))
    }

    /// Bucket receiving the work item results.
    pub fn output_bucket_key(&self, client_id: &str) -> String {
        self.output_bucket_key
            .clone()
            .unwrap_or_else(|| format!("{}output", client_id.to_lowercase()))
    }

    /// Local inputs uploaded before any work item runs, in upload order.
    pub fn required_inputs(&self) -> Vec<&str> {
        let mut inputs = vec![
            self.input_part_file.as_str(),
            self.param_file_large.as_str(),
            self.light_file.as_str(),
            self.heavy_file.as_str(),
        ];
        if let Some(assembly) = self.input_assembly_zip_file.as_deref() {
            inputs.push(assembly);
        }
        inputs
    }

    /// Outputs produced by the part work item as `(argument name, file name)` pairs.
    pub fn part_outputs(&self) -> Vec<(&str, &str)> {
        vec![
            (self.output_part_small_arg_name.as_str(), self.output_part_small_file.as_str()),
            (self.output_part_large_arg_name.as_str(), self.output_part_large_file.as_str()),
            (self.output_part_small_thumb_arg_name.as_str(), self.output_part_small_thumb.as_str()),
            (self.output_part_large_thumb_arg_name.as_str(), self.output_part_large_thumb.as_str()),
            (self.output_image_small_arg_name.as_str(), self.output_image_small_file.as_str()),
            (self.output_image_large_arg_name.as_str(), self.output_image_large_file.as_str()),
        ]
    }

    /// Every output declared in the activity's parameter schema.
    pub fn activity_outputs(&self) -> Vec<(&str, &str)> {
        let mut outputs = self.part_outputs();
        outputs.insert(
            4,
            (self.output_assembly_arg_name.as_str(), self.output_zip_assembly_file.as_str()),
        );
        outputs
    }

    /// Checks required identifiers before any remote call is made.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required: [(&'static str, &str); 12] = [
            ("AppId", self.app_id.as_str()),
            ("EngineName", self.engine_name.as_str()),
            ("EngineExecutable", self.engine_executable.as_str()),
            ("InputPartFile", self.input_part_file.as_str()),
            ("PartAssemblyActivityId", self.part_assembly_activity_id.as_str()),
            ("AutomationBaseUrl", self.automation_base_url.as_str()),
            ("StorageBaseUrl", self.storage_base_url.as_str()),
            ("ReqInputArgName", self.req_input_arg_name.as_str()),
            ("ParamArgNameSmall", self.param_arg_name_small.as_str()),
            ("ParamArgNameLarge", self.param_arg_name_large.as_str()),
            ("ErrorReport", self.error_report.as_str()),
            ("Alias", self.alias.as_str()),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField(field));
            }
        }
        if self.app_id.contains(['.', '+']) {
            return Err(ConfigError::InvalidValue {
                field: "AppId",
                reason: "must not contain '.' or '+'".into(),
            });
        }
        if self.input_assembly_zip_file.is_some() && self.input_top_level_assembly.is_none() {
            return Err(ConfigError::MissingField("InputTopLevelAssembly"));
        }
        Ok(())
    }
}
