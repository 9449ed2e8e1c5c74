//! Loading of the workflow configuration file and the client credentials.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use da_types::{ClientCredentials, WorkflowConfig};
use tracing::debug;

use crate::{expand_config_path, expand_tilde};

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "DA_CONFIG_PATH";
/// Environment variable holding the client identifier.
pub const CLIENT_ID_ENV: &str = "FORGE_CLIENT_ID";
/// Environment variable holding the client secret.
pub const CLIENT_SECRET_ENV: &str = "FORGE_CLIENT_SECRET";

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Returns the configuration path, honoring `DA_CONFIG_PATH`.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var(CONFIG_PATH_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }
    PathBuf::from(CONFIG_FILE_NAME)
}

/// Reads, parses, and validates the configuration at `path`.
pub fn load_config_from_path(path: &Path) -> Result<WorkflowConfig> {
    let content = fs::read_to_string(path).with_context(|| format!("read configuration file {}", path.display()))?;
    let mut config: WorkflowConfig =
        serde_json::from_str(&content).with_context(|| format!("parse configuration file {}", path.display()))?;
    config.validate()?;
    config.local_app_package = expand_config_path(&config.local_app_package);
    config.input_path = expand_config_path(&config.input_path);
    config.output_directory = config.output_directory.as_deref().map(expand_config_path);
    debug!(path = %path.display(), app_id = %config.app_id, "configuration loaded");
    Ok(config)
}

/// Reads the client id and secret from the environment.
pub fn credentials_from_env() -> Result<ClientCredentials> {
    let client_id = env::var(CLIENT_ID_ENV).ok().filter(|value| !value.trim().is_empty());
    let client_secret = env::var(CLIENT_SECRET_ENV).ok().filter(|value| !value.trim().is_empty());
    match (client_id, client_secret) {
        (Some(client_id), Some(client_secret)) => Ok(ClientCredentials::new(client_id, client_secret)),
        _ => bail!("environment variables {CLIENT_ID_ENV} and {CLIENT_SECRET_ENV} must both be set"),
    }
}
