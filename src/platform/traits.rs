use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::{Platform, PlatformError, ResolutionRequest, ResolutionResult, ResolvedMedia};

#[async_trait]
pub trait PlatformCapability: Send + Sync {
    fn platform_id(&self) -> Platform;

    async fn resolve(&self, request: &ResolutionRequest) -> ResolutionResult;
}

/// One named step of a platform's fallback order.
///
/// `Ok(None)` means the step ran but produced nothing usable; the chain moves on
/// exactly as it does for `Err`, the difference only shows up in the logs.
#[async_trait]
pub trait ResolveAttempt: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt(&self, url: &Url) -> Result<Option<ResolvedMedia>, PlatformError>;
}

#[async_trait]
pub trait DurationProbe: Send + Sync {
    async fn duration(&self, url: &Url) -> Result<Duration, PlatformError>;
}
