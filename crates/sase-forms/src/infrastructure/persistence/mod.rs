//! Storage tiers behind the `FormRepository` port

pub mod file;
pub mod memory;
pub mod tiered;

#[cfg(test)]
pub(crate) mod testing;

pub use file::FileFormRepository;
pub use memory::InMemoryFormRepository;
pub use tiered::TieredFormRepository;

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{FormsConfig, StorageTier};
use crate::error::{FormsError, Result};
use crate::ports::outbound::FormRepository;

/// Build the configured tier chain.
///
/// A tier that cannot be opened is skipped with a warning, so a broken data
/// directory degrades to memory instead of refusing to start.
pub async fn open_repository(config: &FormsConfig) -> Result<TieredFormRepository> {
    let mut tiers: Vec<Arc<dyn FormRepository>> = Vec::new();

    for tier in config.enabled_tiers() {
        match tier {
            StorageTier::File => {
                match FileFormRepository::open(&config.storage.data_dir, config.base_url.clone()).await {
                    Ok(repo) => tiers.push(Arc::new(repo)),
                    Err(e) => warn!(
                        tier = "file",
                        data_dir = %config.storage.data_dir.display(),
                        error = %e,
                        "file storage unavailable, skipping tier"
                    ),
                }
            }
            StorageTier::Memory => tiers.push(Arc::new(InMemoryFormRepository::new())),
        }
    }

    if tiers.is_empty() {
        return Err(FormsError::Config("no storage tier could be opened".into()));
    }

    let repository = TieredFormRepository::new(tiers);
    info!(tiers = ?repository.tier_names(), "storage ready");
    Ok(repository)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;

    #[tokio::test]
    async fn test_memory_only_config() {
        let config = FormsConfig {
            storage: StorageConfig {
                tiers: vec![StorageTier::File, StorageTier::Memory],
                file_storage: false,
                ..StorageConfig::default()
            },
            ..FormsConfig::default()
        };
        let repo = open_repository(&config).await.unwrap();
        assert_eq!(repo.tier_names(), vec!["memory"]);
    }

    #[tokio::test]
    async fn test_file_then_memory() {
        let dir = std::env::temp_dir().join(format!("sase-forms-{}", uuid::Uuid::new_v4()));
        let config = FormsConfig {
            storage: StorageConfig { data_dir: dir.clone(), ..StorageConfig::default() },
            ..FormsConfig::default()
        };
        let repo = open_repository(&config).await.unwrap();
        assert_eq!(repo.tier_names(), vec!["file", "memory"]);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_no_tiers_is_an_error() {
        let config = FormsConfig {
            storage: StorageConfig { tiers: vec![], ..StorageConfig::default() },
            ..FormsConfig::default()
        };
        assert!(matches!(open_repository(&config).await, Err(FormsError::Config(_))));
    }
}
