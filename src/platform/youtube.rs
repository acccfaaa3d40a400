use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use url::Url;

use super::{
    chain::{AttemptChain, LocalAttempt, RemoteAttempt},
    traits::PlatformCapability,
    Platform, ProviderDeps, ResolutionRequest, ResolutionResult,
};

static YOUTUBE_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{6,}$").expect("valid YouTube id regex"));

/// Admission against the metadata service, then direct, proxied and local attempts.
pub struct PlatformYoutube {
    chain: AttemptChain,
}

impl PlatformYoutube {
    pub fn new(deps: &ProviderDeps) -> Self {
        let chain = AttemptChain::new(Platform::Youtube)
            .with_admission(Arc::clone(&deps.youtube_metadata), deps.admission.youtube_max_duration)
            .then(RemoteAttempt::direct(Arc::clone(&deps.direct)))
            .then_maybe(deps.proxied.clone().map(RemoteAttempt::proxied))
            .then(LocalAttempt::new(Arc::clone(&deps.extractor), Arc::clone(&deps.artifacts)));

        Self { chain }
    }
}

#[async_trait]
impl PlatformCapability for PlatformYoutube {
    fn platform_id(&self) -> Platform {
        Platform::Youtube
    }

    async fn resolve(&self, request: &ResolutionRequest) -> ResolutionResult {
        self.chain.run(request).await
    }
}

/// Video id from `/shorts/<id>`, `/watch?v=<id>` or `youtu.be/<id>` links.
pub fn extract_youtube_video_id(url: &Url) -> Option<String> {
    let host = url.host_str()?.trim_start_matches("www.");
    let segments: Vec<&str> = url.path_segments().map(|s| s.collect()).unwrap_or_default();

    let candidate = match (host, segments.as_slice()) {
        ("youtu.be", [id, ..]) => Some(id.to_string()),
        ("youtube.com", ["shorts", id, ..]) => Some(id.to_string()),
        ("youtube.com", ["watch", ..]) => url.query_pairs().find(|(k, _)| k == "v").map(|(_, v)| v.into_owned()),
        _ => None,
    }?;

    YOUTUBE_ID_REGEX.is_match(&candidate).then_some(candidate)
}
