mod chain;
mod classify;
mod error;
mod instagram;
mod model;
mod twitter;
pub mod traits;
mod vk;
mod youtube;

use std::sync::Arc;

use dashmap::DashMap;

pub use chain::{AttemptChain, LocalAttempt, RemoteAttempt};
pub use classify::{normalize_hostname, RedirectLookup, UrlClassifier};
pub use error::*;
pub use instagram::{is_instagram_shorthand, PlatformInstagram};
pub use model::*;
pub use twitter::PlatformTwitter;
pub use vk::PlatformVk;
pub use youtube::{extract_youtube_video_id, PlatformYoutube};

use traits::{DurationProbe, PlatformCapability};

use crate::{
    config::AdmissionConfig,
    runtime::ArtifactManager,
    service::{LocalExtractor, RemoteResolver},
};

/// Collaborators the platform strategies are assembled from.
#[derive(Clone)]
pub struct ProviderDeps {
    pub direct: Arc<dyn RemoteResolver>,
    pub proxied: Option<Arc<dyn RemoteResolver>>,
    pub instagram_fallback: Option<Arc<dyn RemoteResolver>>,
    pub youtube_metadata: Arc<dyn DurationProbe>,
    pub vk_metadata: Arc<dyn DurationProbe>,
    pub extractor: Arc<dyn LocalExtractor>,
    pub artifacts: Arc<ArtifactManager>,
    pub admission: AdmissionConfig,
}

/// The resolution engine: routes a classified URL to its platform strategy.
#[derive(Clone)]
pub struct PlatformRegistry {
    platforms: Arc<DashMap<Platform, Arc<dyn PlatformCapability>>>,
}

impl PlatformRegistry {
    pub fn new(deps: &ProviderDeps) -> Self {
        info!("Initializing platform registry");

        let registry = Self::empty();
        registry.register(Arc::new(PlatformYoutube::new(deps)));
        registry.register(Arc::new(PlatformInstagram::new(deps)));
        registry.register(Arc::new(PlatformTwitter::new(deps)));
        registry.register(Arc::new(PlatformVk::new(deps)));

        info!("Platform registry initialized");
        registry
    }

    pub fn empty() -> Self {
        Self {
            platforms: Arc::new(DashMap::new()),
        }
    }

    pub fn register(&self, platform: Arc<dyn PlatformCapability>) {
        info!("Registering {} platform", platform.platform_id());
        self.platforms.insert(platform.platform_id(), platform);
    }

    pub fn get_supported_platforms(&self) -> Vec<Platform> {
        let mut platforms: Vec<Platform> = self.platforms.iter().map(|p| *p.key()).collect();
        platforms.sort();
        platforms
    }

    pub async fn resolve(&self, classified: &ClassifiedUrl, video_required: bool) -> ResolutionResult {
        let request = if video_required {
            ResolutionRequest::full(classified)
        } else {
            ResolutionRequest::preview(classified)
        };

        // Clone the handle so the map guard is not held across the await.
        let platform = self.platforms.get(&classified.platform).map(|p| Arc::clone(p.value()));

        match platform {
            Some(platform) => platform.resolve(&request).await,
            None => {
                debug!("No strategy for {} ({})", classified.normalized_hostname, classified.platform);
                ResolutionResult::new(classified.platform, ResolutionOutcome::Rejected(Rejection::Unsupported))
            }
        }
    }
}
