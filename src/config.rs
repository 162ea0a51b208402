//! Runtime configuration.
//!
//! Values come from a TOML file (all keys optional), then environment
//! overrides, then command-line flags applied by the binary.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::{UploadLimits, DEFAULT_MAX_FILES, DEFAULT_MAX_FILE_BYTES};
use crate::infrastructure::DEFAULT_DRAFT_FILE;

pub const DEFAULT_CONFIG_FILE: &str = "stepform.toml";

pub const ENV_BACKEND_URL: &str = "STEPFORM_BACKEND_URL";
pub const ENV_APP_ID: &str = "STEPFORM_APP_ID";
pub const ENV_DRAFT_PATH: &str = "STEPFORM_DRAFT_PATH";
pub const ENV_LOG: &str = "STEPFORM_LOG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Top-level configuration, one table per section.
///
/// # Examples
///
/// ```
/// let config = stepform::config::parse("[uploads]\nmax_files = 2").unwrap();
/// assert_eq!(config.uploads.max_files, 2);
/// assert_eq!(config.draft.autosave_delay_ms, 2000);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub draft: DraftConfig,
    pub uploads: UploadConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL; entities and uploads live under it.
    pub url: String,
    /// Application id sent with every request.
    pub app_id: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Use the in-memory backend instead of the network.
    pub offline: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080/api".to_string(),
            app_id: String::new(),
            timeout_secs: 30,
            offline: false,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftConfig {
    /// File the draft is written to.
    pub path: PathBuf,
    /// Quiet period after the last change before the draft is saved.
    pub autosave_delay_ms: u64,
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DRAFT_FILE),
            autosave_delay_ms: 2000,
        }
    }
}

impl DraftConfig {
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }
}

/// Attachment limits, see [`UploadLimits`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_files: usize,
    pub max_file_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_files: DEFAULT_MAX_FILES,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

impl UploadConfig {
    pub fn limits(&self) -> UploadLimits {
        UploadLimits {
            max_files: self.max_files,
            max_file_bytes: self.max_file_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `stepform=debug`.
    pub level: String,
    /// Log destination. The terminal is owned by the UI.
    pub file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: PathBuf::from("stepform.log"),
        }
    }
}

/// Parses TOML config text. Missing keys take their defaults.
pub fn parse(contents: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(contents)
}

/// Reads the config file. A missing file is not an error.
pub fn load_file(path: &Path) -> Result<Option<Config>, ConfigError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    parse(&contents)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// File values (or defaults) with environment overrides applied.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let mut config = load_file(path)?.unwrap_or_default();
    apply_env_overrides(&mut config);
    Ok(config)
}

pub fn apply_env_overrides(config: &mut Config) {
    apply_overrides(config, |key| std::env::var(key).ok());
}

/// Applies the `STEPFORM_*` overrides found through `lookup`.
pub fn apply_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup(ENV_BACKEND_URL) {
        config.backend.url = url;
    }
    if let Some(app_id) = lookup(ENV_APP_ID) {
        config.backend.app_id = app_id;
    }
    if let Some(path) = lookup(ENV_DRAFT_PATH) {
        config.draft.path = PathBuf::from(path);
    }
    if let Some(level) = lookup(ENV_LOG) {
        config.logging.level = level;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.draft.autosave_delay(), Duration::from_secs(2));
        assert_eq!(config.uploads.limits(), UploadLimits::default());
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = parse(
            r#"
            [backend]
            url = "https://forms.example.com/api"
            app_id = "abc123"

            [uploads]
            max_files = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.backend.url, "https://forms.example.com/api");
        assert_eq!(config.backend.app_id, "abc123");
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.uploads.max_files, 3);
        assert_eq!(config.uploads.max_file_bytes, DEFAULT_MAX_FILE_BYTES);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_toml_is_reported_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stepform.toml");
        fs::write(&path, "[backend\nurl = 1").unwrap();

        let err = load_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("stepform.toml"));
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_file(&dir.path().join("absent.toml")).unwrap().is_none());
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let mut config = parse("[draft]\npath = \"from-file.json\"").unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_BACKEND_URL, "https://override.example/api"),
            (ENV_DRAFT_PATH, "/tmp/override.json"),
            (ENV_LOG, "stepform=debug"),
        ]);
        apply_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.backend.url, "https://override.example/api");
        assert_eq!(config.backend.app_id, "");
        assert_eq!(config.draft.path, PathBuf::from("/tmp/override.json"));
        assert_eq!(config.logging.level, "stepform=debug");
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let mut config = Config::default();
        config.backend.offline = true;
        config.uploads.max_files = 2;
        let rendered = toml::to_string_pretty(&config).unwrap();
        assert_eq!(parse(&rendered).unwrap(), config);
    }
}
