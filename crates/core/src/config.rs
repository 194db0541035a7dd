use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default environment variable holding the bearer token
pub const DEFAULT_TOKEN_ENV: &str = "STUDYCHAT_TOKEN";

/// Default number of messages per history page
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Base URL of the backend, e.g. `http://localhost:5000`
    pub base_url: String,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    30_000
}

/// Where the bearer token comes from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum AuthConfig {
    /// Read from an environment variable on every request
    Env {
        #[serde(default = "default_token_env")]
        env_var: String,
    },
    /// Read from a file on every request
    File { path: PathBuf },
    /// Fixed token
    Static { token: String },
    /// No Authorization header
    None,
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig::Env { env_var: default_token_env() }
    }
}

/// Transcript behaviour
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ChatConfig {
    /// Messages requested per history page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self { page_size: default_page_size() }
    }
}

/// File logging section (`[logging.file]`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileLoggingConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_file_level")]
    pub level: String,
}

fn default_file_level() -> String {
    "debug".to_string()
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        Self { enabled: false, level: default_file_level() }
    }
}

/// Privacy section (`[logging.privacy]`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrivacySection {
    /// `none`, `truncate` or `full`
    #[serde(default = "default_log_bodies")]
    pub log_message_bodies: String,
    #[serde(default = "default_truncate_length")]
    pub truncate_length: usize,
}

fn default_log_bodies() -> String {
    "truncate".to_string()
}

fn default_truncate_length() -> usize {
    120
}

impl Default for PrivacySection {
    fn default() -> Self {
        Self { log_message_bodies: default_log_bodies(), truncate_length: default_truncate_length() }
    }
}

/// Logging section (`[logging]`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub file: FileLoggingConfig,
    #[serde(default)]
    pub privacy: PrivacySection,
}

fn default_level() -> String {
    "warn".to_string()
}

fn default_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
            file: FileLoggingConfig::default(),
            privacy: PrivacySection::default(),
        }
    }
}

/// Root configuration structure for studychat.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub api: ApiConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml_str).map_err(|e| Error::Config(ConfigError::from(e).to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        let base_url = self.api.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::Config(ConfigError::InvalidBaseUrl(self.api.base_url.clone()).to_string()));
        }

        if self.chat.page_size == 0 {
            return Err(Error::Config(ConfigError::ZeroPageSize.to_string()));
        }

        match &self.auth {
            AuthConfig::Env { env_var } if env_var.trim().is_empty() => {
                Err(Error::Config(ConfigError::MissingAuthField("env_var").to_string()))
            }
            AuthConfig::File { path } if path.as_os_str().is_empty() => {
                Err(Error::Config(ConfigError::MissingAuthField("path").to_string()))
            }
            AuthConfig::Static { token } if token.trim().is_empty() => {
                Err(Error::Config(ConfigError::MissingAuthField("token").to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Get example configuration (as a string)
    pub fn example() -> &'static str {
        r#"# studychat configuration

[api]
# Base URL of the study-session backend
base_url = "http://localhost:5000"
# Per-request timeout in milliseconds
timeout_ms = 30000

[auth]
# Token source: "env", "file", "static" or "none"
source = "env"
env_var = "STUDYCHAT_TOKEN"
# source = "file"
# path = "/home/me/.studychat/token"

[chat]
# Messages requested per history page
page_size = 10

[logging]
level = "warn"
# "pretty", "json" or "compact"
format = "pretty"

[logging.file]
enabled = false
level = "debug"

[logging.privacy]
# How message bodies appear in logs: "none", "truncate" or "full"
log_message_bodies = "truncate"
truncate_length = 120
"#
    }
}

/// Default config file location when `--config` is not given
pub fn default_config_path() -> PathBuf {
    PathBuf::from("studychat.toml")
}

/// Configuration-specific errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Base URL is not an http(s) URL
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// Page size must be positive
    #[error("chat.page_size must be greater than zero")]
    ZeroPageSize,

    /// Auth source is missing its required field
    #[error("auth source requires a non-empty `{0}`")]
    MissingAuthField(&'static str),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    TomlParse(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::TomlParse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses() {
        let config = Config::from_toml_str(Config::example()).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:5000");
        assert_eq!(config.api.timeout_ms, 30_000);
        assert_eq!(config.auth, AuthConfig::Env { env_var: DEFAULT_TOKEN_ENV.to_string() });
        assert_eq!(config.chat.page_size, 10);
        assert_eq!(config.logging.format, "pretty");
        assert!(!config.logging.file.enabled);
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let toml = r#"
[api]
base_url = "https://tutor.example.edu/api"
"#;

        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.api.timeout_ms, 30_000);
        assert_eq!(config.auth, AuthConfig::default());
        assert_eq!(config.chat.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_auth_file_source() {
        let toml = r#"
[api]
base_url = "http://localhost:5000"

[auth]
source = "file"
path = "/tmp/token"
"#;

        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.auth, AuthConfig::File { path: PathBuf::from("/tmp/token") });
    }

    #[test]
    fn test_auth_static_and_none() {
        let toml = r#"
[api]
base_url = "http://localhost:5000"

[auth]
source = "static"
token = "abc"
"#;
        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.auth, AuthConfig::Static { token: "abc".to_string() });

        let toml = r#"
[api]
base_url = "http://localhost:5000"

[auth]
source = "none"
"#;
        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.auth, AuthConfig::None);
    }

    #[test]
    fn test_validation_rejects_bad_base_url() {
        let toml = r#"
[api]
base_url = "localhost:5000"
"#;

        let result = Config::from_toml_str(toml);
        assert!(result.unwrap_err().to_string().contains("invalid base URL"));
    }

    #[test]
    fn test_validation_rejects_zero_page_size() {
        let toml = r#"
[api]
base_url = "http://localhost:5000"

[chat]
page_size = 0
"#;

        let result = Config::from_toml_str(toml);
        assert!(result.unwrap_err().to_string().contains("page_size"));
    }

    #[test]
    fn test_validation_rejects_empty_static_token() {
        let toml = r#"
[api]
base_url = "http://localhost:5000"

[auth]
source = "static"
token = "  "
"#;

        let result = Config::from_toml_str(toml);
        assert!(result.unwrap_err().to_string().contains("`token`"));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let toml = r#"
[api]
base_url = "http://localhost:5000"
retries = 3
"#;

        let result = Config::from_toml_str(toml);
        assert!(result.unwrap_err().to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_missing_api_section() {
        let result = Config::from_toml_str("[chat]\npage_size = 5\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studychat.toml");
        std::fs::write(&path, Config::example()).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.chat.page_size, 10);

        let missing = Config::from_file(&dir.path().join("absent.toml"));
        assert!(matches!(missing, Err(Error::Io(_))));
    }

    #[test]
    fn test_config_error_display() {
        assert_eq!(ConfigError::ZeroPageSize.to_string(), "chat.page_size must be greater than zero");
        assert_eq!(
            ConfigError::MissingAuthField("path").to_string(),
            "auth source requires a non-empty `path`"
        );
        assert_eq!(ConfigError::TomlParse("bad".to_string()).to_string(), "TOML parse error: bad");
    }
}
