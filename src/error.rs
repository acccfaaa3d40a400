use shuttle_runtime::Error as ShuttleError;

use crate::config::ConfigError;
use crate::platform::{ClassificationError, PlatformError};
use crate::runtime::RuntimeError;
use crate::service::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("Config error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Classification error: {0}")]
    ClassificationError(#[from] ClassificationError),

    #[error("Platform error: {0}")]
    PlatformError(#[from] PlatformError),

    #[error("Runtime error: {0}")]
    RuntimeError(#[from] RuntimeError),

    #[error("Transport error: {0}")]
    TransportError(#[from] TransportError),

    #[error(transparent)]
    Other(anyhow::Error),
}

impl From<BotError> for ShuttleError {
    fn from(error: BotError) -> Self {
        ShuttleError::Custom(anyhow::anyhow!(error))
    }
}

impl From<anyhow::Error> for BotError {
    fn from(error: anyhow::Error) -> Self {
        BotError::Other(error)
    }
}

pub type HandlerResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub type BotResult<T> = Result<T, BotError>;
