use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    #[error("malformed url: {0}")]
    MalformedUrl(String),
    #[error("shorthand link could not be resolved: {0}")]
    UnresolvedShorthand(String),
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("metadata error: {0}")]
    MetadataError(String),
    #[error("parsing error: {0}")]
    ParsingError(String),
    #[error("extraction failed: {0}")]
    ExtractionError(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
