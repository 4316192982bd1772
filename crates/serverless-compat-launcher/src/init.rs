// Logging setup for the launcher binary
//
// Logs go to stderr; stdout is inherited by the serverless-compat child.

use serverless_compat_config::{LogConfig, LogFormat};
use tracing::warn;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing/logging from LogConfig
pub fn init_tracing(config: &LogConfig) {
    let (env_filter, level_error) = level_filter(&config.log_level);

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.log_format {
        LogFormat::Json => {
            registry
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            registry
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if let Some(err) = level_error {
        warn!(log_level = %config.log_level, error = %err, "Invalid log level, falling back to info");
    }
}

/// Parse a log level directive, falling back to "info" when it does not parse.
fn level_filter(log_level: &str) -> (EnvFilter, Option<ParseError>) {
    match EnvFilter::try_new(log_level) {
        Ok(filter) => (filter, None),
        Err(err) => (EnvFilter::new("info"), Some(err)),
    }
}
