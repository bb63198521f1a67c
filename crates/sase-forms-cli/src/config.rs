//! CLI Configuration
//!
//! Config file first, then environment, then command line flags.

use anyhow::Context;
use sase_forms::FormsConfig;

use crate::Cli;

pub fn resolve(cli: &Cli) -> anyhow::Result<FormsConfig> {
    let mut config = if cli.config.exists() {
        FormsConfig::load(&cli.config)
            .with_context(|| format!("failed to load {}", cli.config.display()))?
    } else {
        tracing::debug!(path = %cli.config.display(), "Config not found, using defaults");
        FormsConfig::default()
    };

    config.apply_overrides(|key| std::env::var(key).ok())?;

    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = dir.clone();
    }
    if let Some(url) = &cli.base_url {
        config.base_url = url.clone();
    }
    if cli.memory_only {
        config.storage.file_storage = false;
    }
    Ok(config)
}
