use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use url::Url;

use crate::{
    runtime::ArtifactManager,
    service::{LocalExtractor, RemoteResolver},
};

use super::{
    traits::{DurationProbe, ResolveAttempt},
    Platform, PlatformError, Rejection, ResolutionOutcome, ResolutionRequest, ResolutionResult, ResolvedMedia,
};

pub struct Admission {
    pub probe: Arc<dyn DurationProbe>,
    pub ceiling: Duration,
}

/// Ordered fallback procedure for one platform: optional admission check, then
/// attempts in order until one yields media.
pub struct AttemptChain {
    platform: Platform,
    admission: Option<Admission>,
    attempts: Vec<Arc<dyn ResolveAttempt>>,
}

impl AttemptChain {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            admission: None,
            attempts: Vec::new(),
        }
    }

    pub fn with_admission(mut self, probe: Arc<dyn DurationProbe>, ceiling: Duration) -> Self {
        self.admission = Some(Admission { probe, ceiling });
        self
    }

    pub fn then(mut self, attempt: Arc<dyn ResolveAttempt>) -> Self {
        self.attempts.push(attempt);
        self
    }

    pub fn then_maybe(self, attempt: Option<Arc<dyn ResolveAttempt>>) -> Self {
        match attempt {
            Some(attempt) => self.then(attempt),
            None => self,
        }
    }

    pub async fn run(&self, request: &ResolutionRequest) -> ResolutionResult {
        let url = &request.url;
        debug!(
            "[{}] resolving {} (video required: {})",
            request.platform, url, request.video_required
        );

        if let Some(admission) = &self.admission {
            match admission.probe.duration(url).await {
                Ok(duration) if duration > admission.ceiling => {
                    info!(
                        "[{}] video is too long ({}s > {}s): {}",
                        self.platform,
                        duration.as_secs(),
                        admission.ceiling.as_secs(),
                        url
                    );
                    return self.finish(ResolutionOutcome::Rejected(Rejection::TooLong {
                        duration,
                        ceiling: admission.ceiling,
                    }));
                }
                Ok(duration) => debug!("[{}] admitted ({}s): {}", self.platform, duration.as_secs(), url),
                Err(e) => {
                    error!("[{}] admission check failed for {}: {}", self.platform, url, e);
                    return self.finish(ResolutionOutcome::Exhausted {
                        attempted: vec!["admission"],
                    });
                }
            }
        }

        if !request.video_required {
            return self.finish(ResolutionOutcome::Admitted);
        }

        let mut attempted = Vec::with_capacity(self.attempts.len());
        for attempt in &self.attempts {
            attempted.push(attempt.name());
            match attempt.attempt(url).await {
                Ok(Some(media)) => {
                    info!("[{}] {} attempt resolved {}", self.platform, attempt.name(), url);
                    return self.finish(ResolutionOutcome::Resolved(media));
                }
                Ok(None) => info!("[{}] {} attempt returned no usable video for {}", self.platform, attempt.name(), url),
                Err(e) => warn!("[{}] {} attempt failed for {}: {}", self.platform, attempt.name(), url, e),
            }
        }

        error!(
            "[{}] all attempts exhausted for {} (tried: {})",
            self.platform,
            url,
            attempted.join(", ")
        );
        self.finish(ResolutionOutcome::Exhausted { attempted })
    }

    fn finish(&self, outcome: ResolutionOutcome) -> ResolutionResult {
        ResolutionResult::new(self.platform, outcome)
    }
}

/// Remote resolution service call, either direct or through the proxy client.
pub struct RemoteAttempt {
    name: &'static str,
    resolver: Arc<dyn RemoteResolver>,
    proxied: bool,
}

impl RemoteAttempt {
    pub fn direct(resolver: Arc<dyn RemoteResolver>) -> Arc<dyn ResolveAttempt> {
        Arc::new(Self {
            name: "direct",
            resolver,
            proxied: false,
        })
    }

    pub fn proxied(resolver: Arc<dyn RemoteResolver>) -> Arc<dyn ResolveAttempt> {
        Arc::new(Self {
            name: "proxied",
            resolver,
            proxied: true,
        })
    }

    pub fn named(name: &'static str, resolver: Arc<dyn RemoteResolver>) -> Arc<dyn ResolveAttempt> {
        Arc::new(Self {
            name,
            resolver,
            proxied: false,
        })
    }
}

#[async_trait]
impl ResolveAttempt for RemoteAttempt {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn attempt(&self, url: &Url) -> Result<Option<ResolvedMedia>, PlatformError> {
        let response = self.resolver.resolve(url).await?;
        debug!("{} resolver answered {:?}", self.name, response);

        Ok(response.usable_url().map(|url| ResolvedMedia::Remote {
            url,
            proxied: self.proxied,
        }))
    }
}

/// Downloads the video with the local extraction tool into a fresh scratch file.
pub struct LocalAttempt {
    extractor: Arc<dyn LocalExtractor>,
    artifacts: Arc<ArtifactManager>,
}

impl LocalAttempt {
    pub fn new(extractor: Arc<dyn LocalExtractor>, artifacts: Arc<ArtifactManager>) -> Arc<dyn ResolveAttempt> {
        Arc::new(Self { extractor, artifacts })
    }
}

#[async_trait]
impl ResolveAttempt for LocalAttempt {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn attempt(&self, url: &Url) -> Result<Option<ResolvedMedia>, PlatformError> {
        let file = self.artifacts.allocate("mp4");
        self.extractor.extract(url, file.path()).await?;

        if !file.exists().await {
            return Err(PlatformError::ExtractionError(format!(
                "extractor finished but {} is missing",
                file.path().display()
            )));
        }

        Ok(Some(ResolvedMedia::Local(file)))
    }
}
