//! Logging setup on top of the tracing ecosystem.
//!
//! # Environment Variables
//!
//! - `STUDYCHAT_LOG`: Filter directive (like `RUST_LOG`), e.g., `studychat_transcript=debug`
//! - `STUDYCHAT_LOG_FORMAT`: Output format for stderr: `pretty`, `json`, `compact`
//! - `STUDYCHAT_LOG_DIR`: Directory for the rolling log file (default `~/.studychat/logs`)
//!
//! # Configuration
//!
//! ```toml
//! [logging]
//! level = "warn"
//! format = "pretty"
//!
//! [logging.file]
//! enabled = false
//! level = "debug"
//!
//! [logging.privacy]
//! log_message_bodies = "truncate"
//! truncate_length = 120
//! ```

use crate::Error;
use crate::config::LoggingConfig as ConfigLoggingConfig;
use std::env;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log output format for stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Pretty, human-readable output with colors (default for TTY)
    #[default]
    Pretty,
    /// JSON output (one line per event)
    Json,
    /// Compact, single-line output
    Compact,
}

impl LogFormat {
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(LogFormat::Pretty),
            "json" => Some(LogFormat::Json),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
            LogFormat::Compact => "compact",
        }
    }
}

/// How message bodies appear in log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyLogging {
    /// Replace with a placeholder
    None,
    /// Keep the first `truncate_length` chars
    #[default]
    Truncate,
    /// Log verbatim
    Full,
}

impl BodyLogging {
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(BodyLogging::None),
            "truncate" => Some(BodyLogging::Truncate),
            "full" => Some(BodyLogging::Full),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BodyLogging::None => "none",
            BodyLogging::Truncate => "truncate",
            BodyLogging::Full => "full",
        }
    }
}

impl FromStr for BodyLogging {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BodyLogging::parse_str(s).ok_or_else(|| format!("invalid message body logging: {}", s))
    }
}

/// Privacy controls for message content in logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivacyConfig {
    pub bodies: BodyLogging,
    pub truncate_length: usize,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self { bodies: BodyLogging::Truncate, truncate_length: 120 }
    }
}

/// Resolved logging settings.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    /// Level for the rolling file, if file logging is enabled
    pub file_level: Option<String>,
    pub privacy: PrivacyConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "warn".to_string(), format: LogFormat::default(), file_level: None, privacy: PrivacyConfig::default() }
    }
}

impl From<ConfigLoggingConfig> for LoggingConfig {
    fn from(config: ConfigLoggingConfig) -> Self {
        Self {
            level: config.level,
            format: LogFormat::parse_str(&config.format).unwrap_or_default(),
            file_level: if config.file.enabled { Some(config.file.level) } else { None },
            privacy: PrivacyConfig {
                bodies: BodyLogging::parse_str(&config.privacy.log_message_bodies).unwrap_or_default(),
                truncate_length: config.privacy.truncate_length,
            },
        }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_file_logging(mut self, level: impl Into<String>) -> Self {
        self.file_level = Some(level.into());
        self
    }

    fn build_env_filter(&self) -> EnvFilter {
        let filter = env::var("STUDYCHAT_LOG")
            .ok()
            .or_else(|| env::var("RUST_LOG").ok())
            .unwrap_or_else(|| self.level.clone());

        EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new(&self.level))
    }

    fn is_tty() -> bool {
        atty::is(atty::Stream::Stderr)
    }

    /// Env override first, then the configured format; non-TTY stderr never gets pretty output
    fn detect_format(&self) -> LogFormat {
        if let Ok(fmt_str) = env::var("STUDYCHAT_LOG_FORMAT")
            && let Some(fmt) = LogFormat::parse_str(&fmt_str)
        {
            return fmt;
        }

        match self.format {
            LogFormat::Pretty if !Self::is_tty() => LogFormat::Compact,
            other => other,
        }
    }

    fn get_log_dir() -> Result<PathBuf, Error> {
        if let Ok(custom_dir) = env::var("STUDYCHAT_LOG_DIR") {
            return Ok(PathBuf::from(custom_dir));
        }

        dirs::home_dir()
            .map(|home| home.join(".studychat").join("logs"))
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))
    }
}

/// Keeps the background file writer alive; drop it at shutdown to flush.
#[must_use]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global tracing subscriber.
///
/// Stderr output uses the configured format; when file logging is enabled a
/// daily-rolling JSON file is written as well.
pub fn init_logging(config: Option<LoggingConfig>) -> Result<LogGuard, Error> {
    let config = config.unwrap_or_default();
    let env_filter = config.build_env_filter();

    let stderr_layer = match config.detect_format() {
        LogFormat::Pretty => fmt::layer().pretty().with_writer(io::stderr).with_ansi(true).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(io::stderr).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_writer(io::stderr).boxed(),
    };

    let (file_layer, guard) = match &config.file_level {
        Some(file_level) => {
            let log_dir = LoggingConfig::get_log_dir()?;
            std::fs::create_dir_all(&log_dir)
                .map_err(|e| Error::Config(format!("Failed to create log directory: {}", e)))?;

            let file_appender = tracing_appender::rolling::daily(log_dir, "studychat.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::try_new(file_level).unwrap_or_else(|_| EnvFilter::new("debug")))
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    Registry::default()
        .with(stderr_layer.with_filter(env_filter))
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to install log subscriber: {}", e)))?;

    Ok(LogGuard { _file: guard })
}

/// Shorten or hide a message body for logging.
pub fn redact_body(content: &str, privacy: &PrivacyConfig) -> String {
    let char_count = content.chars().count();
    match privacy.bodies {
        BodyLogging::None => format!("[{} chars]", char_count),
        BodyLogging::Full => content.to_string(),
        BodyLogging::Truncate if char_count <= privacy.truncate_length => content.to_string(),
        BodyLogging::Truncate => {
            let mut truncated = content.chars().take(privacy.truncate_length).collect::<String>();
            truncated.push_str("...");
            truncated.push_str(&format!(" ({} total chars)", char_count));
            truncated
        }
    }
}
