use std::time::Duration;

use crate::service::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("download error: {0}")]
    Download(#[from] reqwest::Error),
    #[error("transfer timed out after {0:?}")]
    Timeout(Duration),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("no playable video: {0}")]
    Unresolved(String),
}

