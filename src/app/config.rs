use super::serde_helpers::{load_env_path_opt, load_env_string_opt, load_env_var};
use crate::dsn::{Dsn, DsnError};
use crate::transport::{Encoding, ProxyConfig, TransportConfig};
use crate::worker::{DEFAULT_MAX_QUEUE, WorkerConfig};
use clap::{ArgAction, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Missing DSN: set SENTRY_DSN or pass --dsn")]
    MissingDsn,
    #[error("Invalid DSN: {0}")]
    Dsn(#[from] DsnError),
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Environment error: {0}")]
    EnvError(String),
    #[error("Logging initialization failed: {0}")]
    Logging(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Output format of the crate's own diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Connection string of the collector project
    #[arg(long, env = "SENTRY_DSN")]
    pub dsn: Option<String>,

    /// Worker threads for background delivery (0 sends inline)
    #[arg(long, env = "SENTRY_BACKGROUND_WORKER_THREADS", default_value = "0")]
    pub background_worker_threads: usize,

    /// Run every delivery inline on the calling thread
    #[arg(long, env = "SENTRY_ASYNC_DISABLED")]
    pub async_disabled: bool,

    /// Pending deliveries kept before new ones are discarded
    #[arg(long, env = "SENTRY_MAX_QUEUE", default_value = "30")]
    pub max_queue: usize,

    /// Maximum wait for pending deliveries at shutdown, in milliseconds
    #[arg(long, env = "SENTRY_SHUTDOWN_TIMEOUT_MS", default_value = "1000")]
    pub shutdown_timeout_ms: u64,

    /// Request timeout in milliseconds
    #[arg(long, env = "SENTRY_TIMEOUT_MS", default_value = "2000")]
    pub timeout_ms: u64,

    /// Connection open timeout in milliseconds
    #[arg(long, env = "SENTRY_OPEN_TIMEOUT_MS", default_value = "1000")]
    pub open_timeout_ms: u64,

    /// Proxy URL, credentials may be embedded
    #[arg(long, env = "SENTRY_PROXY")]
    pub proxy: Option<String>,

    /// Verify the collector's TLS certificate
    #[arg(long, env = "SENTRY_SSL_VERIFICATION", default_value_t = true, action = ArgAction::Set)]
    pub ssl_verification: bool,

    /// Extra CA bundle (PEM) trusted for the collector
    #[arg(long, env = "SENTRY_SSL_CA_FILE")]
    pub ssl_ca_file: Option<PathBuf>,

    /// Payload encoding: gzip or json
    #[arg(long, env = "SENTRY_ENCODING", default_value = "gzip")]
    pub encoding: Encoding,

    /// Payloads larger than this many bytes are gzipped
    #[arg(long, env = "SENTRY_COMPRESSION_THRESHOLD", default_value = "1024")]
    pub compression_threshold: usize,

    /// Environment attached to events that carry none
    #[arg(long, env = "SENTRY_ENVIRONMENT")]
    pub environment: Option<String>,

    /// Release attached to events that carry none
    #[arg(long, env = "SENTRY_RELEASE")]
    pub release: Option<String>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", default_value = "compact")]
    pub log_format: LogFormat,

    /// Configuration file path (optional)
    #[arg(long, env = "CONFIG_FILE")]
    #[serde(skip)]
    pub config_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let worker = WorkerConfig::default();
        let transport = TransportConfig::default();

        Self {
            dsn: None,
            background_worker_threads: worker.background_worker_threads,
            async_disabled: false,
            max_queue: DEFAULT_MAX_QUEUE,
            shutdown_timeout_ms: worker.shutdown_timeout.as_millis() as u64,
            timeout_ms: transport.timeout.as_millis() as u64,
            open_timeout_ms: transport.open_timeout.as_millis() as u64,
            proxy: None,
            ssl_verification: true,
            ssl_ca_file: None,
            encoding: Encoding::Gzip,
            compression_threshold: transport.compression_threshold,
            environment: None,
            release: None,
            log_level: LogLevel::Info,
            log_format: LogFormat::Compact,
            config_file: None,
        }
    }
}

impl Config {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Config::parse_from(args);
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        load_env_string_opt("SENTRY_DSN", &mut config.dsn);
        load_env_var("SENTRY_BACKGROUND_WORKER_THREADS", &mut config.background_worker_threads)?;
        load_env_var("SENTRY_ASYNC_DISABLED", &mut config.async_disabled)?;
        load_env_var("SENTRY_MAX_QUEUE", &mut config.max_queue)?;
        load_env_var("SENTRY_SHUTDOWN_TIMEOUT_MS", &mut config.shutdown_timeout_ms)?;
        load_env_var("SENTRY_TIMEOUT_MS", &mut config.timeout_ms)?;
        load_env_var("SENTRY_OPEN_TIMEOUT_MS", &mut config.open_timeout_ms)?;
        load_env_string_opt("SENTRY_PROXY", &mut config.proxy);
        load_env_var("SENTRY_SSL_VERIFICATION", &mut config.ssl_verification)?;
        load_env_path_opt("SENTRY_SSL_CA_FILE", &mut config.ssl_ca_file);
        load_env_var("SENTRY_ENCODING", &mut config.encoding)?;
        load_env_var("SENTRY_COMPRESSION_THRESHOLD", &mut config.compression_threshold)?;
        load_env_string_opt("SENTRY_ENVIRONMENT", &mut config.environment);
        load_env_string_opt("SENTRY_RELEASE", &mut config.release);

        // LogLevel requires special handling for case-insensitive parsing
        if let Ok(log_level) = std::env::var("LOG_LEVEL") {
            config.log_level = LogLevel::from_str(&log_level, true)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {log_level}")))?;
        }
        if let Ok(log_format) = std::env::var("LOG_FORMAT") {
            config.log_format = LogFormat::from_str(&log_format, true)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {log_format}")))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(dsn) = &self.dsn {
            Dsn::parse(dsn)?;
        }

        if let Some(proxy) = &self.proxy {
            ProxyConfig::parse(proxy).map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;
        }

        if self.max_queue == 0 {
            return Err(ConfigError::InvalidConfig(
                "Max queue must be greater than 0".to_string(),
            ));
        }

        if self.timeout_ms == 0 || self.open_timeout_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "Timeouts must be greater than 0".to_string(),
            ));
        }

        if let Some(ca_file) = &self.ssl_ca_file
            && !ca_file.exists()
        {
            return Err(ConfigError::InvalidConfig(format!(
                "CA file does not exist: {}",
                ca_file.display()
            )));
        }

        Ok(())
    }

    pub fn dsn(&self) -> Result<Dsn, ConfigError> {
        let raw = self.dsn.as_deref().ok_or(ConfigError::MissingDsn)?;
        Ok(Dsn::parse(raw)?)
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            background_worker_threads: self.background_worker_threads,
            async_disabled: self.async_disabled,
            max_queue: self.max_queue,
            shutdown_timeout: Duration::from_millis(self.shutdown_timeout_ms),
        }
    }

    pub fn transport_config(&self) -> Result<TransportConfig, ConfigError> {
        let proxy = self
            .proxy
            .as_deref()
            .map(ProxyConfig::parse)
            .transpose()
            .map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;

        Ok(TransportConfig {
            timeout: Duration::from_millis(self.timeout_ms),
            open_timeout: Duration::from_millis(self.open_timeout_ms),
            proxy,
            ssl_verification: self.ssl_verification,
            ssl_ca_file: self.ssl_ca_file.clone(),
            encoding: self.encoding,
            compression_threshold: self.compression_threshold,
            ..TransportConfig::default()
        })
    }
}
