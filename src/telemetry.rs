//! Tracing setup shared by the HTTP server and the one-shot CLI commands.

use std::fmt;

use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

use crate::config::{AppEnvironment, TelemetryConfig};

#[derive(Debug)]
pub enum TelemetryError {
    /// `APP_LOG_LEVEL` did not parse as tracing filter directives.
    InvalidDirectives {
        directives: String,
        source: ParseError,
    },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::InvalidDirectives { directives, .. } => {
                write!(
                    f,
                    "APP_LOG_LEVEL yields invalid tracing directives '{}'",
                    directives
                )
            }
            TelemetryError::Subscriber(err) => write!(f, "telemetry error: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::InvalidDirectives { source, .. } => Some(source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

/// Install the global subscriber. `RUST_LOG` wins when set; otherwise the
/// filter comes from `APP_LOG_LEVEL` plus per-environment defaults.
pub fn init(config: &TelemetryConfig, environment: AppEnvironment) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => env_filter(config, environment)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}

/// Test runs stay at warnings regardless of `APP_LOG_LEVEL`: per-chunk
/// progress at info level drowns assertion output. Hyper connection chatter
/// is capped in every environment.
fn env_filter(
    config: &TelemetryConfig,
    environment: AppEnvironment,
) -> Result<EnvFilter, TelemetryError> {
    let base = match environment {
        AppEnvironment::Test => "warn",
        AppEnvironment::Development | AppEnvironment::Production => config.log_level.as_str(),
    };

    let directives = format!("{base},hyper=warn");
    EnvFilter::try_new(&directives).map_err(|source| TelemetryError::InvalidDirectives {
        directives,
        source,
    })
}
