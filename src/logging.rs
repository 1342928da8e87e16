//! Structured logging via the `tracing` crate.
//!
//! Log lines go to stderr so the verify report on stdout stays scriptable.
//! The `DIRSEAL_LOG` environment variable takes precedence over flags and
//! accepts the usual `EnvFilter` directives.

use crate::error::SealError;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Environment variable holding an `EnvFilter` directive string.
pub const LOG_ENV: &str = "DIRSEAL_LOG";

/// Initialize logging from the environment and CLI flags.
///
/// Priority: `DIRSEAL_LOG`, then `--log-level`, then `--verbose` (debug),
/// then warn.
pub fn init_logging(verbose: bool, level: Option<&str>) -> Result<(), SealError> {
    let filter = match EnvFilter::try_from_env(LOG_ENV) {
        Ok(filter) => filter,
        Err(_) => {
            let level = level.unwrap_or(if verbose { "debug" } else { "warn" });
            EnvFilter::try_new(level)
                .map_err(|e| SealError::ConfigError(format!("Invalid log level {:?}: {}", level, e)))?
        }
    };

    Registry::default()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_writer(std::io::stderr),
        )
        .init();
    Ok(())
}
