//! Crate-level error type

use thiserror::Error;

use crate::ports::inbound::UseCaseError;
use crate::ports::outbound::RepositoryError;

#[derive(Debug, Error)]
pub enum FormsError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    UseCase(#[from] UseCaseError),

    #[error("telemetry error: {0}")]
    Telemetry(String),
}

pub type Result<T> = std::result::Result<T, FormsError>;
