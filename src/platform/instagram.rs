use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use super::{
    chain::{AttemptChain, RemoteAttempt},
    traits::PlatformCapability,
    Platform, ProviderDeps, ResolutionRequest, ResolutionResult,
};

/// No admission check; direct, proxied, then the optional fallback API.
pub struct PlatformInstagram {
    chain: AttemptChain,
}

impl PlatformInstagram {
    pub fn new(deps: &ProviderDeps) -> Self {
        let chain = AttemptChain::new(Platform::Instagram)
            .then(RemoteAttempt::direct(Arc::clone(&deps.direct)))
            .then_maybe(deps.proxied.clone().map(RemoteAttempt::proxied))
            .then_maybe(
                deps.instagram_fallback
                    .clone()
                    .map(|resolver| RemoteAttempt::named("instagram-fallback", resolver)),
            );

        Self { chain }
    }
}

#[async_trait]
impl PlatformCapability for PlatformInstagram {
    fn platform_id(&self) -> Platform {
        Platform::Instagram
    }

    async fn resolve(&self, request: &ResolutionRequest) -> ResolutionResult {
        self.chain.run(request).await
    }
}

/// `/share/<id>` and `/share/reel/<id>` links only redirect to the real post.
pub fn is_instagram_shorthand(url: &Url) -> bool {
    url.path().contains("/share/")
}
