//! State shared by every workflow step.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use da_api::{AutomationClient, StorageClient};
use da_types::{ClientCredentials, WorkflowConfig, qualified_name};
use da_util::default_download_dir;

/// Delay between two status fetches of a running work item.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Caller-controlled knobs that are not part of the configuration file.
#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    /// Stop after the part work item even when an assembly input is configured.
    pub skip_assembly: bool,
    /// Overrides both the configured and the default download directory.
    pub output_dir: Option<PathBuf>,
    pub poll_interval: Duration,
    /// Give up polling after this many status fetches. `None` polls until the
    /// service reports a terminal state.
    pub max_poll_attempts: Option<u32>,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            skip_assembly: false,
            output_dir: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_attempts: None,
        }
    }
}

/// Configuration, clients and resolved identity for one run.
#[derive(Debug)]
pub struct WorkflowContext {
    pub config: WorkflowConfig,
    pub credentials: ClientCredentials,
    pub automation: AutomationClient,
    pub storage: StorageClient,
    pub options: WorkflowOptions,
    nickname: Option<String>,
}

impl WorkflowContext {
    pub fn new(config: WorkflowConfig, credentials: ClientCredentials, options: WorkflowOptions) -> Result<Self> {
        let automation = AutomationClient::new(&config.automation_base_url, credentials.clone())
            .context("create automation client")?;
        let storage = StorageClient::new(&config.storage_base_url, credentials.clone()).context("create storage client")?;
        Ok(Self::from_parts(config, credentials, automation, storage, options))
    }

    pub fn from_parts(
        config: WorkflowConfig,
        credentials: ClientCredentials,
        automation: AutomationClient,
        storage: StorageClient,
        options: WorkflowOptions,
    ) -> Self {
        Self {
            config,
            credentials,
            automation,
            storage,
            options,
            nickname: None,
        }
    }

    pub fn alias(&self) -> &str {
        &self.config.alias
    }

    pub fn nickname(&self) -> Result<&str> {
        self.nickname.as_deref().context("nickname has not been resolved yet")
    }

    pub fn set_nickname(&mut self, nickname: impl Into<String>) {
        self.nickname = Some(nickname.into());
    }

    /// `<nickname>.<id>+<alias>` for an app bundle or activity id.
    pub fn qualified(&self, id: &str) -> Result<String> {
        Ok(qualified_name(self.nickname()?, id, self.alias()))
    }

    pub fn input_bucket(&self) -> String {
        self.config.input_bucket_key(&self.credentials.client_id)
    }

    pub fn output_bucket(&self) -> String {
        self.config.output_bucket_key(&self.credentials.client_id)
    }

    /// Local path of an input file named in the configuration.
    pub fn input_file(&self, file_name: &str) -> PathBuf {
        self.config.input_path.join(file_name)
    }

    /// Where downloaded reports and outputs are written.
    pub fn output_dir(&self) -> PathBuf {
        self.options
            .output_dir
            .clone()
            .or_else(|| self.config.output_directory.clone())
            .unwrap_or_else(default_download_dir)
    }
}
