// Logging module - Logging infrastructure
use crate::domain::error::{ClientError, ClientResult};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Pick the log level from command line flags and the configured default
pub fn effective_level(configured: &str, verbose: bool, quiet: bool) -> &str {
    if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        match configured {
            "error" | "warn" | "info" | "debug" | "trace" => configured,
            _ => "warn",
        }
    }
}

/// Initialize logging system
///
/// `RUST_LOG` overrides the computed level. Logs go to stderr so stdout
/// only carries the exchange output.
pub fn init_logging(level: &str) -> ClientResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("jsondb_client={},warn", level)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .try_init()
        .map_err(|e| ClientError::Config {
            message: format!("Failed to initialize logging: {}", e),
        })?;

    tracing::debug!("logging initialized at level {}", level);
    Ok(())
}
