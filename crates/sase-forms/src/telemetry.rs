//! Tracing setup for binaries embedding the engine

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{FormsError, Result};

/// Install the global subscriber: `RUST_LOG` filter (falling back to
/// `default_filter`) plus the fmt layer. Library code never calls this.
pub fn init(default_filter: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| FormsError::Telemetry(e.to_string()))
}

/// `RUST_LOG` when set and parseable, otherwise `default_filter`
fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_without_rust_log() {
        if std::env::var_os("RUST_LOG").is_none() {
            assert_eq!(env_filter("sase_forms=debug").to_string(), "sase_forms=debug");
        }
    }
}
