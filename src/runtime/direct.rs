use std::sync::Arc;

use crate::{
    platform::{PlatformRegistry, ResolutionOutcome, ResolvedMedia, UrlClassifier},
    service::{
        metrics::{DOWNLOAD_ERRORS, DOWNLOAD_REQUESTS, DOWNLOAD_RESPONSES},
        MetricsSink, ReplyTarget, Transport, VideoSource,
    },
};

use super::{video_caption, ArtifactManager, RuntimeError, TemporaryVideoFile};

/// Synchronous path: a chat message with links gets a video reply per link.
pub struct DirectDelivery {
    classifier: Arc<UrlClassifier>,
    registry: Arc<PlatformRegistry>,
    artifacts: Arc<ArtifactManager>,
    transport: Arc<dyn Transport>,
    metrics: Arc<dyn MetricsSink>,
    max_urls: usize,
}

impl DirectDelivery {
    pub fn new(
        classifier: Arc<UrlClassifier>,
        registry: Arc<PlatformRegistry>,
        artifacts: Arc<ArtifactManager>,
        transport: Arc<dyn Transport>,
        metrics: Arc<dyn MetricsSink>,
        max_urls: usize,
    ) -> Self {
        Self {
            classifier,
            registry,
            artifacts,
            transport,
            metrics,
            max_urls,
        }
    }

    /// Processes the links in textual order, each on its own. Returns how many
    /// videos were sent.
    pub async fn handle_urls(&self, target: ReplyTarget, urls: &[String]) -> usize {
        if urls.len() > self.max_urls {
            info!(
                "Message {} has {} links, only the first {} are processed",
                target.message_id,
                urls.len(),
                self.max_urls
            );
        }

        let mut delivered = 0;
        for raw_url in urls.iter().take(self.max_urls) {
            match self.handle_url(target, raw_url).await {
                Ok(true) => delivered += 1,
                Ok(false) => {}
                Err(e) => {
                    self.metrics.increment(DOWNLOAD_ERRORS, 1);
                    self.metrics.report_error(&format!("Error processing {}", raw_url), &e);
                }
            }
        }
        delivered
    }

    async fn handle_url(&self, target: ReplyTarget, raw_url: &str) -> Result<bool, RuntimeError> {
        let classified = match self.classifier.classify(raw_url).await {
            Ok(classified) if classified.is_supported() => classified,
            Ok(_) => return Ok(false),
            Err(e) => {
                info!("Skipping {}: {}", raw_url, e);
                return Ok(false);
            }
        };

        let admission = self.registry.resolve(&classified, false).await;
        match admission.outcome {
            ResolutionOutcome::Admitted => {}
            ResolutionOutcome::Rejected(rejection) => {
                info!("Skipping {}: {}", raw_url, rejection);
                return Ok(false);
            }
            outcome => {
                debug!("Nothing to send for {}: {:?}", raw_url, outcome);
                return Ok(false);
            }
        }

        // Sent before resolution, which may run the extraction tool for minutes.
        self.metrics.increment(DOWNLOAD_REQUESTS, 1);
        if let Err(e) = self.transport.notify_uploading(target.chat_id).await {
            debug!("Chat action failed for {}: {}", target.chat_id, e);
        }

        let result = self.registry.resolve(&classified, true).await;
        let caption = video_caption(result.platform, result.proxied());
        let media = match result.outcome {
            ResolutionOutcome::Resolved(media) => media,
            outcome => return Err(RuntimeError::Unresolved(format!("{}: {:?}", raw_url, outcome))),
        };

        match media {
            ResolvedMedia::Remote { url, .. } => {
                let sent = self
                    .transport
                    .reply_with_video(target, VideoSource::Url(url.clone()), &caption)
                    .await;
                if let Err(e) = sent {
                    warn!("Telegram refused {} as a URL, uploading a local copy: {}", url, e);
                    let file = self.artifacts.download(&url).await?;
                    self.reply_with_file(target, file, &caption).await?;
                }
            }
            ResolvedMedia::Local(file) => self.reply_with_file(target, file, &caption).await?,
        }

        self.metrics.increment(DOWNLOAD_RESPONSES, 1);
        Ok(true)
    }

    async fn reply_with_file(
        &self,
        target: ReplyTarget,
        file: TemporaryVideoFile,
        caption: &str,
    ) -> Result<(), RuntimeError> {
        let sent = self
            .transport
            .reply_with_video(target, VideoSource::Local(file.path().to_path_buf()), caption)
            .await;
        file.discard().await;
        Ok(sent?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        service::LogMetrics,
        utils::test::{
            RecordingTransport, ScriptedExtractor, ScriptedResolver, StaticRedirects, TestProviders, TransportCall,
        },
    };

    const TARGET: ReplyTarget = ReplyTarget {
        chat_id: 42,
        message_id: 7,
    };

    fn direct(providers: &TestProviders, transport: Arc<RecordingTransport>, metrics: Arc<LogMetrics>) -> DirectDelivery {
        DirectDelivery::new(
            Arc::new(UrlClassifier::new(StaticRedirects::failing())),
            Arc::new(providers.registry()),
            providers.artifacts(),
            transport,
            metrics,
            3,
        )
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|u| u.to_string()).collect()
    }

    #[tokio::test]
    async fn test_bad_links_do_not_stop_later_ones() {
        let providers = TestProviders::new();
        let transport = RecordingTransport::new();
        let metrics = Arc::new(LogMetrics::new());

        let sent = direct(&providers, transport.clone(), metrics.clone())
            .handle_urls(
                TARGET,
                &urls(&["not a url", "https://vimeo.com/1", "https://x.com/a/status/1"]),
            )
            .await;

        assert_eq!(sent, 1);
        assert_eq!(providers.direct.calls(), 1);
        assert_eq!(metrics.get(DOWNLOAD_RESPONSES), 1);
    }

    #[tokio::test]
    async fn test_links_beyond_the_cap_are_ignored() {
        let providers = TestProviders::new();
        let transport = RecordingTransport::new();
        let links = urls(&[
            "https://x.com/a/status/1",
            "https://x.com/a/status/2",
            "https://x.com/a/status/3",
            "https://x.com/a/status/4",
        ]);

        let sent = direct(&providers, transport.clone(), Arc::new(LogMetrics::new()))
            .handle_urls(TARGET, &links)
            .await;

        assert_eq!(sent, 3);
        assert_eq!(providers.direct.calls(), 3);
        assert_eq!(transport.replies().len(), 3);
    }

    #[tokio::test]
    async fn test_rejected_video_is_skipped_silently() {
        let providers = TestProviders::new().youtube_duration(120);
        let transport = RecordingTransport::new();
        let metrics = Arc::new(LogMetrics::new());

        let sent = direct(&providers, transport.clone(), metrics.clone())
            .handle_urls(TARGET, &urls(&["https://youtu.be/TRutZetDUak"]))
            .await;

        assert_eq!(sent, 0);
        assert!(transport.calls().is_empty());
        assert_eq!(metrics.get(DOWNLOAD_ERRORS), 0);
    }

    #[tokio::test]
    async fn test_upload_indicator_precedes_reply() {
        let providers = TestProviders::new();
        let transport = RecordingTransport::new();

        direct(&providers, transport.clone(), Arc::new(LogMetrics::new()))
            .handle_urls(TARGET, &urls(&["https://youtu.be/TRutZetDUak"]))
            .await;

        let calls = transport.calls();
        assert!(matches!(calls.as_slice(), [TransportCall::ChatAction(42), TransportCall::Reply { .. }]));
    }

    #[tokio::test]
    async fn test_exhausted_link_counts_as_error_after_indicator() {
        let providers = TestProviders::new()
            .direct(ScriptedResolver::failing())
            .extractor(ScriptedExtractor::failing());
        let transport = RecordingTransport::new();
        let metrics = Arc::new(LogMetrics::new());

        let sent = direct(&providers, transport.clone(), metrics.clone())
            .handle_urls(TARGET, &urls(&["https://youtu.be/TRutZetDUak"]))
            .await;

        assert_eq!(sent, 0);
        assert_eq!(transport.calls(), vec![TransportCall::ChatAction(42)]);
        assert_eq!(metrics.get(DOWNLOAD_REQUESTS), 1);
        assert_eq!(metrics.get(DOWNLOAD_ERRORS), 1);
        assert_eq!(providers.scratch_entries(), 0);
    }

    #[tokio::test]
    async fn test_local_file_is_sent_then_deleted() {
        let providers = TestProviders::new()
            .direct(ScriptedResolver::failing())
            .extractor(ScriptedExtractor::writing(b"vk video"));
        let transport = RecordingTransport::new();

        let sent = direct(&providers, transport.clone(), Arc::new(LogMetrics::new()))
            .handle_urls(TARGET, &urls(&["https://vk.com/video-1_2"]))
            .await;

        assert_eq!(sent, 1);
        assert!(matches!(transport.replies().as_slice(), [VideoSource::Local(_)]));
        assert_eq!(providers.scratch_entries(), 0);
    }

    #[tokio::test]
    async fn test_failed_local_reply_counts_as_error_and_deletes_file() {
        let providers = TestProviders::new()
            .direct(ScriptedResolver::failing())
            .extractor(ScriptedExtractor::writing(b"vk video"));
        let transport = RecordingTransport::new().reject_replies();
        let metrics = Arc::new(LogMetrics::new());

        let sent = direct(&providers, transport, metrics.clone())
            .handle_urls(TARGET, &urls(&["https://vk.com/video-1_2"]))
            .await;

        assert_eq!(sent, 0);
        assert_eq!(metrics.get(DOWNLOAD_ERRORS), 1);
        assert_eq!(providers.scratch_entries(), 0);
    }

    #[tokio::test]
    async fn test_refused_url_reply_is_retried_with_local_copy() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_bytes(b"mp4".to_vec()))
            .mount(&server)
            .await;

        let providers =
            TestProviders::new().direct(ScriptedResolver::success(&format!("{}/video.mp4", server.uri())));
        let transport = RecordingTransport::new().reject_url_replies();

        let sent = direct(&providers, transport.clone(), Arc::new(LogMetrics::new()))
            .handle_urls(TARGET, &urls(&["https://x.com/a/status/1"]))
            .await;

        assert_eq!(sent, 1);
        assert!(matches!(
            transport.replies().as_slice(),
            [VideoSource::Url(_), VideoSource::Local(_)]
        ));
        assert_eq!(providers.scratch_entries(), 0);
    }
}
