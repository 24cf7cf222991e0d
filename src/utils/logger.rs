use std::str::FromStr;

use thiserror::Error;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_log::LogTracer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Log output format types
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable text format with timestamp, level, target, and message
    #[default]
    Text,
    /// JSON format with structured fields: timestamp, level, target, message
    Json,
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("unknown log format '{0}', expected 'text' or 'json'")]
    UnknownFormat(String),
    #[error("global tracing subscriber already set: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
    #[error("log facade already bridged: {0}")]
    LogBridge(#[from] log::SetLoggerError),
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    /// Parses `LOG_FORMAT`, case-insensitively.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use pupil_registry::utils::logger::LogFormat;
    ///
    /// assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(LoggingError::UnknownFormat(s.to_string())),
        }
    }
}

/// Installs the global tracing subscriber.
///
/// Sets up:
/// - an `EnvFilter` read from `RUST_LOG`, falling back to `info`
/// - a fmt layer writing either text or JSON lines to stdout
/// - the `log`-to-tracing bridge, so `log::info!` and friends reach the same output
///
/// Fails if a global subscriber or `log` logger is already installed.
pub fn init_logging(format: LogFormat) -> Result<(), LoggingError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (text_layer, json_layer) = match format {
        LogFormat::Text => (
            Some(fmt::layer().with_target(true).with_thread_ids(true)),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(fmt::layer().json().with_current_span(true).with_span_list(false)),
        ),
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(text_layer)
        .with(json_layer);

    tracing::subscriber::set_global_default(subscriber)?;
    LogTracer::init()?;
    Ok(())
}
