use anyhow::Context;
use quill_editor::EditorConfig;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "quill.config.json";

/// Resolve the editor configuration for a command
///
/// An explicit `--config` path must exist. Otherwise `quill.config.json` in
/// `cwd` is used when present, and defaults when it is not.
pub fn load(cwd: &Path, explicit: Option<&Path>) -> anyhow::Result<EditorConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = default_path(cwd);
            if !path.exists() {
                tracing::debug!("no {} found, using defaults", DEFAULT_CONFIG_NAME);
                return Ok(EditorConfig::default());
            }
            path
        }
    };

    EditorConfig::load(&path).with_context(|| format!("Failed to load config from {}", path.display()))
}

pub fn default_path(cwd: &Path) -> PathBuf {
    cwd.join(DEFAULT_CONFIG_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(dir.path(), None).unwrap();
        assert_eq!(config, EditorConfig::default());
    }

    #[test]
    fn test_config_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            default_path(dir.path()),
            r##"{ "maxUndoLevels": 3, "suggestion": { "char": "#" } }"##,
        )
        .unwrap();

        let config = load(dir.path(), None).unwrap();
        assert_eq!(config.max_undo_levels, 3);
        assert_eq!(config.suggestion.char, '#');
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let err = load(dir.path(), Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("nope.json"));
    }
}
