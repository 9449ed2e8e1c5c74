pub mod config;
pub mod download;
pub mod package;
pub mod path_processing;

pub use config::{CLIENT_ID_ENV, CLIENT_SECRET_ENV, CONFIG_PATH_ENV, credentials_from_env, default_config_path, load_config_from_path};
pub use download::{DownloadError, default_download_dir, download_request, download_url};
pub use package::{PackageError, package_directory};
pub use path_processing::{expand_config_path, expand_tilde};

use once_cell::sync::Lazy;
use regex::Regex;

static SENSITIVE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(authorization: )([\w\-\.=:/+ ]+)",
        r#"(?i)("authorization"\s*:\s*")([^"]+)"#,
        r#"(?i)("access_token"\s*:\s*")([^"]+)"#,
        r"(?i)([A-Z0-9_]*?(KEY|TOKEN|SECRET|PASSWORD))=([^\s&]+)",
        r"(?i)([?&](?:signature|sig|token)=)([^\s&]+)",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Redacts values that look like secrets in a string.
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for re in SENSITIVE_PATTERNS.iter() {
        redacted = re
            .replace_all(&redacted, |caps: &regex::Captures| {
                let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                format!("{}<redacted>", prefix)
            })
            .to_string();
    }
    redacted
}
