use std::sync::Arc;

use async_trait::async_trait;

use super::{
    chain::{AttemptChain, RemoteAttempt},
    traits::PlatformCapability,
    Platform, ProviderDeps, ResolutionRequest, ResolutionResult,
};

pub struct PlatformTwitter {
    chain: AttemptChain,
}

impl PlatformTwitter {
    pub fn new(deps: &ProviderDeps) -> Self {
        let chain = AttemptChain::new(Platform::Twitter)
            .then(RemoteAttempt::direct(Arc::clone(&deps.direct)))
            .then_maybe(deps.proxied.clone().map(RemoteAttempt::proxied));

        Self { chain }
    }
}

#[async_trait]
impl PlatformCapability for PlatformTwitter {
    fn platform_id(&self) -> Platform {
        Platform::Twitter
    }

    async fn resolve(&self, request: &ResolutionRequest) -> ResolutionResult {
        self.chain.run(request).await
    }
}
