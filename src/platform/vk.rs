use std::sync::Arc;

use async_trait::async_trait;

use super::{
    chain::{AttemptChain, LocalAttempt, RemoteAttempt},
    traits::PlatformCapability,
    Platform, ProviderDeps, ResolutionRequest, ResolutionResult,
};

/// The extraction tool supplies the duration for admission. Download goes through
/// the direct remote attempt first, with no proxied retry, then the extraction tool.
pub struct PlatformVk {
    chain: AttemptChain,
}

impl PlatformVk {
    pub fn new(deps: &ProviderDeps) -> Self {
        let chain = AttemptChain::new(Platform::Vk)
            .with_admission(Arc::clone(&deps.vk_metadata), deps.admission.vk_max_duration)
            .then(RemoteAttempt::direct(Arc::clone(&deps.direct)))
            .then(LocalAttempt::new(Arc::clone(&deps.extractor), Arc::clone(&deps.artifacts)));

        Self { chain }
    }
}

#[async_trait]
impl PlatformCapability for PlatformVk {
    fn platform_id(&self) -> Platform {
        Platform::Vk
    }

    async fn resolve(&self, request: &ResolutionRequest) -> ResolutionResult {
        self.chain.run(request).await
    }
}
