use crate::RemoteError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "https://api.fastly.com";
pub const DEFAULT_CONSOLE_URL: &str = "https://manage.fastly.com";

/// API endpoint, web console base (for diff links), and credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_console_url")]
    pub console_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_owned()
}

fn default_console_url() -> String {
    DEFAULT_CONSOLE_URL.to_owned()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl RemoteConfig {
    pub fn new(api_url: &str) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_owned(),
            console_url: DEFAULT_CONSOLE_URL.to_owned(),
            api_key: None,
        }
    }

    #[must_use]
    pub fn with_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_owned());
        self
    }

    #[must_use]
    pub fn with_console_url(mut self, url: &str) -> Self {
        self.console_url = url.trim_end_matches('/').to_owned();
        self
    }

    /// Load config from `~/.config/edgectl/remote.json`, falling back to the
    /// defaults when the file does not exist.
    pub fn load_default() -> Result<Self, RemoteError> {
        let path = default_config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    pub fn load(path: &Path) -> Result<Self, RemoteError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&content)
            .map_err(|e| RemoteError::Config(format!("invalid remote config: {e}")))?;
        config.api_url = config.api_url.trim_end_matches('/').to_owned();
        config.console_url = config.console_url.trim_end_matches('/').to_owned();
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), RemoteError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| RemoteError::Serialization(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn default_config_path() -> Result<PathBuf, RemoteError> {
    let home = std::env::var("HOME").map_err(|_| RemoteError::Config("HOME not set".to_owned()))?;
    Ok(PathBuf::from(home).join(".config/edgectl/remote.json"))
}

/// Read an API key from a plain file, ignoring a trailing newline.
/// A missing or blank file yields `None`.
pub fn read_key_file(path: &Path) -> Result<Option<String>, RemoteError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    let key = content.trim_end_matches(['\n', '\r']);
    if key.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(key.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("remote.json");

        let config = RemoteConfig::new("https://api.example.com/")
            .with_key("secret123")
            .with_console_url("https://console.example.com/");
        config.save(&path).unwrap();

        let loaded = RemoteConfig::load(&path).unwrap();
        assert_eq!(loaded.api_url, "https://api.example.com");
        assert_eq!(loaded.console_url, "https://console.example.com");
        assert_eq!(loaded.api_key.as_deref(), Some("secret123"));
    }

    #[test]
    fn partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("remote.json");
        std::fs::write(&path, r#"{"api_key": "k"}"#).unwrap();

        let loaded = RemoteConfig::load(&path).unwrap();
        assert_eq!(loaded.api_url, DEFAULT_API_URL);
        assert_eq!(loaded.console_url, DEFAULT_CONSOLE_URL);
        assert_eq!(loaded.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("remote.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            RemoteConfig::load(&path),
            Err(RemoteError::Config(_))
        ));
    }

    #[test]
    fn key_file_strips_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api_key");
        std::fs::write(&path, "abc123\n").unwrap();
        assert_eq!(read_key_file(&path).unwrap().as_deref(), Some("abc123"));
    }

    #[test]
    fn missing_or_blank_key_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api_key");
        assert_eq!(read_key_file(&path).unwrap(), None);
        std::fs::write(&path, "\n").unwrap();
        assert_eq!(read_key_file(&path).unwrap(), None);
    }
}
