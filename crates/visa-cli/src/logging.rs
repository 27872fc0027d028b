//! Tracing setup for the `visa` binary.
//!
//! Logs go to stderr so stdout stays clean for JSON and stay output.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set. Otherwise `verbosity` picks the level for this
/// binary and the engine: 0 = warn, 1 = debug, 2+ = trace.
pub fn init_tracing(verbosity: u8, json: bool) -> Result<()> {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("visa_engine={level},visa_cli={level}")));

    let registry = Registry::default().with(env_filter);
    let result = if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_current_span(true),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init()
    };
    result.map_err(|e| anyhow!("Failed to initialize tracing: {}", e))?;

    tracing::debug!(level, json, "logging initialized");
    Ok(())
}
