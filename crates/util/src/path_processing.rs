use std::path::{Path, PathBuf};

use dirs_next::home_dir;

/// Replaces a leading `~` (alone, or followed by either separator) with the
/// home directory. Anything else is returned trimmed but otherwise untouched.
pub fn expand_tilde(path: &str) -> PathBuf {
    let trimmed = path.trim();
    let rest = match trimmed.strip_prefix('~') {
        Some("") => "",
        Some(rest) if rest.starts_with('/') || rest.starts_with('\\') => &rest[1..],
        _ => return PathBuf::from(trimmed),
    };
    match home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => PathBuf::from(trimmed),
    }
}

/// [`expand_tilde`] for paths read from the configuration file.
pub fn expand_config_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(raw) => expand_tilde(raw),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paths_are_returned_trimmed() {
        assert_eq!(expand_tilde(" inputs/box.ipt "), PathBuf::from("inputs/box.ipt"));
        assert_eq!(expand_tilde("~user/box.ipt"), PathBuf::from("~user/box.ipt"));
    }

    #[test]
    fn leading_tilde_points_at_home() {
        let Some(home) = home_dir() else { return };
        assert_eq!(expand_tilde("~"), home);
        assert_eq!(expand_tilde("~/bundles/app.zip"), home.join("bundles/app.zip"));
        assert_eq!(expand_config_path(Path::new("~/inputFiles")), home.join("inputFiles"));
    }
}
