use super::config::{ConfigError, LogFormat, LogLevel};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Noisy HTTP stack targets capped at `warn`.
const DEFAULT_DIRECTIVES: &[&str] = &["hyper=warn", "hyper_util=warn", "reqwest=warn", "rustls=warn"];

/// Builds the filter from the default level, the HTTP stack caps and any
/// `RUST_LOG` override (applied last so it wins).
pub fn build_filter_string(level: LogLevel, rust_log: Option<&str>) -> String {
    let mut parts = Vec::with_capacity(DEFAULT_DIRECTIVES.len() + 2);
    parts.push(level.as_str().to_string());
    parts.extend(DEFAULT_DIRECTIVES.iter().map(|d| (*d).to_string()));

    if let Some(extra) = rust_log.map(str::trim).filter(|s| !s.is_empty()) {
        parts.push(extra.to_string());
    }

    parts.join(",")
}

/// Installs the global subscriber. Fails if one is already set.
pub fn init_tracing(level: LogLevel, format: LogFormat) -> Result<(), ConfigError> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter_string = build_filter_string(level, rust_log.as_deref());
    let env_filter = EnvFilter::try_new(&filter_string).map_err(|e| {
        ConfigError::Logging(format!("invalid filter '{filter_string}': {e}"))
    })?;

    let result = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true)
                    .with_thread_names(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init(),
    };

    result.map_err(|e| ConfigError::Logging(e.to_string()))
}
