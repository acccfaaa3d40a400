use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use url::Url;

use crate::{
    platform::{ClassifiedUrl, PlatformRegistry, ResolutionOutcome, ResolvedMedia, UrlClassifier},
    service::{
        metrics::{INLINE_DELIVERED, INLINE_FAILED, INLINE_PLACEHOLDERS},
        MetricsSink, Placeholder, Transport, VideoSource,
    },
};

use super::{
    parse_ticket_id, video_caption, ArtifactManager, DeliveryTicket, RuntimeError, TicketState, TicketStore,
};

/// Resolving tickets outlive placeholders by this multiple of the ticket TTL.
const RESOLVING_GRACE_FACTOR: i32 = 4;

/// Placeholder → resolve → replace protocol for inline queries.
///
/// Answering a query only runs the admission check. The full resolution starts
/// when the user picks the placeholder and runs on a detached task, which later
/// edits the very message the placeholder became.
pub struct DeliveryCoordinator {
    classifier: Arc<UrlClassifier>,
    registry: Arc<PlatformRegistry>,
    artifacts: Arc<ArtifactManager>,
    transport: Arc<dyn Transport>,
    tickets: Arc<dyn TicketStore>,
    metrics: Arc<dyn MetricsSink>,
    thumbnail: Url,
}

impl DeliveryCoordinator {
    pub fn new(
        classifier: Arc<UrlClassifier>,
        registry: Arc<PlatformRegistry>,
        artifacts: Arc<ArtifactManager>,
        transport: Arc<dyn Transport>,
        tickets: Arc<dyn TicketStore>,
        metrics: Arc<dyn MetricsSink>,
        thumbnail: Url,
    ) -> Self {
        Self {
            classifier,
            registry,
            artifacts,
            transport,
            tickets,
            metrics,
            thumbnail,
        }
    }

    /// Answers an inline query. Ineligible queries get an empty answer and no
    /// ticket. Returns the id of the ticket that was issued, if any.
    pub async fn create_placeholder(&self, query_id: &str, query: &str) -> Result<Option<String>, RuntimeError> {
        let ticket = match query.split_whitespace().next() {
            Some(candidate) => self.admit(candidate).await,
            None => None,
        };

        let Some(ticket) = ticket else {
            self.transport.answer_inline_query(query_id, Vec::new()).await?;
            return Ok(None);
        };

        let placeholder = Placeholder {
            id: ticket.id.clone(),
            source_url: ticket.source.url.clone(),
            thumbnail: self.thumbnail.clone(),
            title: t!("inline.placeholder.title", platform = ticket.source.platform.to_string()).to_string(),
            caption: t!("inline.placeholder.caption").to_string(),
            source_button: t!("buttons.open_source").to_string(),
        };
        let ticket_id = ticket.id.clone();
        self.tickets.insert(ticket);

        if let Err(e) = self.transport.answer_inline_query(query_id, vec![placeholder]).await {
            self.tickets.evict(&ticket_id);
            return Err(e.into());
        }

        self.metrics.increment(INLINE_PLACEHOLDERS, 1);
        info!("Issued placeholder {} for inline query {}", ticket_id, query_id);
        Ok(Some(ticket_id))
    }

    async fn admit(&self, candidate: &str) -> Option<DeliveryTicket> {
        let classified = match self.classifier.classify(candidate).await {
            Ok(classified) if classified.is_supported() => classified,
            Ok(classified) => {
                debug!("Inline query for unsupported host {}", classified.normalized_hostname);
                return None;
            }
            Err(e) => {
                info!("Skipping inline query {:?}: {}", candidate, e);
                return None;
            }
        };

        let preview = self.registry.resolve(&classified, false).await;
        if !preview.is_success() {
            info!("No placeholder for {}: {:?}", classified.url, preview.outcome);
            return None;
        }

        Some(DeliveryTicket::new(classified))
    }

    /// Handles the selection of an inline result. Returns immediately; the
    /// returned handle resolves to the terminal state and need not be awaited.
    pub fn on_selected(
        self: &Arc<Self>,
        result_id: &str,
        inline_message_id: Option<&str>,
    ) -> Option<JoinHandle<TicketState>> {
        let Some(ticket_id) = parse_ticket_id(result_id) else {
            debug!("Ignoring chosen result {} without a ticket id", result_id);
            return None;
        };

        let Some(ticket) = self.tickets.get(ticket_id) else {
            warn!("Chosen result {} has no ticket (expired?)", ticket_id);
            return None;
        };

        let Some(inline_message_id) = inline_message_id.map(str::to_string) else {
            warn!("Chosen result {} came without an inline message id", ticket_id);
            self.tickets.transition(ticket_id, TicketState::Placeholder, TicketState::Failed);
            return None;
        };

        if !self.tickets.transition(ticket_id, TicketState::Placeholder, TicketState::Resolving) {
            info!("Ticket {} already left the placeholder state, ignoring selection", ticket_id);
            return None;
        }

        let coordinator = Arc::clone(self);
        Some(tokio::spawn(async move { coordinator.deliver(ticket, inline_message_id).await }))
    }

    async fn deliver(&self, ticket: DeliveryTicket, inline_message_id: String) -> TicketState {
        let started = Utc::now();

        let state = match self.replace_placeholder(&ticket.source, &inline_message_id).await {
            Ok(()) => {
                self.metrics.increment(INLINE_DELIVERED, 1);
                TicketState::Delivered
            }
            Err(e) => {
                self.metrics.increment(INLINE_FAILED, 1);
                self.metrics
                    .report_error(&format!("Inline delivery of {} failed", ticket.source.raw_url), &e);
                self.render_failure(&ticket.source, &inline_message_id).await;
                TicketState::Failed
            }
        };

        self.tickets.transition(&ticket.id, TicketState::Resolving, state);
        info!(
            "Ticket {} finished as {:?} in {}ms",
            ticket.id,
            state,
            (Utc::now() - started).num_milliseconds()
        );
        state
    }

    async fn replace_placeholder(&self, source: &ClassifiedUrl, inline_message_id: &str) -> Result<(), RuntimeError> {
        let result = self.registry.resolve(source, true).await;
        let caption = video_caption(result.platform, result.proxied());

        let media = match result.outcome {
            ResolutionOutcome::Resolved(media) => media,
            outcome => return Err(RuntimeError::Unresolved(format!("{}: {:?}", source.url, outcome))),
        };

        let file = match media {
            ResolvedMedia::Remote { url, .. } => {
                match self
                    .transport
                    .edit_inline_media(inline_message_id, VideoSource::Url(url.clone()), &caption)
                    .await
                {
                    Ok(()) => return Ok(()),
                    Err(e) => {
                        warn!("Editing {} with the remote URL failed, relaying a local copy: {}", inline_message_id, e);
                        self.artifacts.download(&url).await?
                    }
                }
            }
            ResolvedMedia::Local(file) => file,
        };

        let file_id = self.artifacts.relay(file, self.transport.as_ref()).await?;
        self.transport
            .edit_inline_media(inline_message_id, VideoSource::FileId(file_id), &caption)
            .await?;
        Ok(())
    }

    async fn render_failure(&self, source: &ClassifiedUrl, inline_message_id: &str) {
        let notice = t!("delivery.failed", url = source.raw_url.as_str()).to_string();
        if let Err(e) = self.transport.edit_inline_text(inline_message_id, &notice).await {
            error!("Could not write the failure notice to {}: {}", inline_message_id, e);
        }
    }

    /// Evicts placeholders nobody picked within `ttl`.
    /// Evicts placeholders older than `ttl`. Resolving tickets get a longer grace
    /// period so a delivery task that died does not pin its ticket forever.
    pub fn sweep(&self, ttl: chrono::Duration) -> usize {
        let now = Utc::now();
        let evicted = self
            .tickets
            .evict_older_than(now - ttl, now - ttl * RESOLVING_GRACE_FACTOR);
        if evicted > 0 {
            info!("Evicted {} expired delivery tickets", evicted);
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        runtime::MemoryTicketStore,
        service::LogMetrics,
        utils::test::{RecordingTransport, ScriptedResolver, StaticRedirects, TestProviders, TransportCall},
    };

    struct Harness {
        providers: TestProviders,
        transport: Arc<RecordingTransport>,
        tickets: Arc<MemoryTicketStore>,
        metrics: Arc<LogMetrics>,
        coordinator: Arc<DeliveryCoordinator>,
    }

    fn harness(providers: TestProviders, transport: Arc<RecordingTransport>) -> Harness {
        let tickets = Arc::new(MemoryTicketStore::new());
        let metrics = Arc::new(LogMetrics::new());
        let coordinator = Arc::new(DeliveryCoordinator::new(
            Arc::new(UrlClassifier::new(StaticRedirects::failing())),
            Arc::new(providers.registry()),
            providers.artifacts(),
            transport.clone(),
            tickets.clone(),
            metrics.clone(),
            Url::parse("https://img.example.com/placeholder.png").unwrap(),
        ));

        Harness {
            providers,
            transport,
            tickets,
            metrics,
            coordinator,
        }
    }

    #[tokio::test]
    async fn test_too_long_video_gets_no_placeholder() {
        let h = harness(TestProviders::new().youtube_duration(91), RecordingTransport::new());

        let issued = h
            .coordinator
            .create_placeholder("q1", "https://youtube.com/shorts/TRutZetDUak")
            .await
            .unwrap();

        assert_eq!(issued, None);
        assert_eq!(
            h.transport.calls(),
            vec![TransportCall::InlineAnswer {
                query_id: "q1".to_string(),
                placeholder_ids: vec![],
            }]
        );
        assert_eq!(h.providers.direct.calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_and_unsupported_queries_get_no_placeholder() {
        let h = harness(TestProviders::new(), RecordingTransport::new());

        for query in ["", "hello there", "https://vimeo.com/1"] {
            assert_eq!(h.coordinator.create_placeholder("q", query).await.unwrap(), None);
        }
        assert_eq!(h.metrics.get(INLINE_PLACEHOLDERS), 0);
    }

    #[tokio::test]
    async fn test_placeholder_creation_resolves_nothing() {
        let h = harness(TestProviders::new(), RecordingTransport::new());

        let ticket_id = h
            .coordinator
            .create_placeholder("q1", "https://x.com/a/status/1")
            .await
            .unwrap()
            .unwrap();

        assert!(ticket_id.starts_with(crate::runtime::TICKET_PREFIX));
        assert_eq!(h.tickets.get(&ticket_id).map(|t| t.state), Some(TicketState::Placeholder));
        assert_eq!(h.providers.direct.calls(), 0);
        assert_eq!(h.metrics.get(INLINE_PLACEHOLDERS), 1);
    }

    #[tokio::test]
    async fn test_failed_answer_drops_the_ticket() {
        let h = harness(TestProviders::new(), RecordingTransport::new().reject_answers());

        let result = h.coordinator.create_placeholder("q1", "https://x.com/a/status/1").await;

        assert!(matches!(result, Err(RuntimeError::Transport(_))));
        assert_eq!(h.metrics.get(INLINE_PLACEHOLDERS), 0);
    }

    #[tokio::test]
    async fn test_second_selection_is_ignored() {
        let h = harness(TestProviders::new(), RecordingTransport::new());
        let ticket_id = h
            .coordinator
            .create_placeholder("q1", "https://x.com/a/status/1")
            .await
            .unwrap()
            .unwrap();

        let first = h.coordinator.on_selected(&ticket_id, Some("inline-1"));
        let second = h.coordinator.on_selected(&ticket_id, Some("inline-1"));

        assert!(second.is_none());
        assert_eq!(first.unwrap().await.unwrap(), TicketState::Delivered);
        assert!(h.coordinator.on_selected(&ticket_id, Some("inline-1")).is_none());
        assert_eq!(h.transport.media_edits().len(), 1);
    }

    #[tokio::test]
    async fn test_foreign_result_ids_are_ignored() {
        let h = harness(TestProviders::new(), RecordingTransport::new());

        assert!(h.coordinator.on_selected("id-1", Some("inline-1")).is_none());
        assert!(h.coordinator.on_selected("clip:00000000000000000000000000000000", Some("inline-1")).is_none());
        assert!(h.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_url_edit_falls_back_to_relay() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_bytes(b"mp4".to_vec()))
            .mount(&server)
            .await;

        let video_url = format!("{}/video.mp4", server.uri());
        let providers = TestProviders::new().direct(ScriptedResolver::success(&video_url));
        let h = harness(providers, RecordingTransport::new().reject_url_edits());

        let ticket_id = h
            .coordinator
            .create_placeholder("q1", "https://x.com/a/status/1")
            .await
            .unwrap()
            .unwrap();
        let state = h.coordinator.on_selected(&ticket_id, Some("inline-1")).unwrap().await.unwrap();

        assert_eq!(state, TicketState::Delivered);
        assert_eq!(
            h.transport.media_edits(),
            vec![
                VideoSource::Url(Url::parse(&video_url).unwrap()),
                VideoSource::FileId("relay-file-1".to_string()),
            ]
        );
        assert_eq!(h.providers.scratch_entries(), 0);
    }

    #[tokio::test]
    async fn test_failure_notice_write_error_is_swallowed() {
        let providers = TestProviders::new()
            .direct(ScriptedResolver::failing())
            .proxied(ScriptedResolver::failing());
        let h = harness(providers, RecordingTransport::new().reject_text_edits());

        let ticket_id = h
            .coordinator
            .create_placeholder("q1", "https://x.com/a/status/1")
            .await
            .unwrap()
            .unwrap();
        let state = h.coordinator.on_selected(&ticket_id, Some("inline-1")).unwrap().await.unwrap();

        assert_eq!(state, TicketState::Failed);
        assert_eq!(h.tickets.get(&ticket_id).map(|t| t.state), Some(TicketState::Failed));
        assert_eq!(h.metrics.get(INLINE_FAILED), 1);
    }

    #[tokio::test]
    async fn test_sweep_evicts_expired_placeholders() {
        let h = harness(TestProviders::new(), RecordingTransport::new());
        let ticket_id = h
            .coordinator
            .create_placeholder("q1", "https://x.com/a/status/1")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(h.coordinator.sweep(chrono::Duration::hours(1)), 0);
        assert_eq!(h.coordinator.sweep(chrono::Duration::seconds(-1)), 1);
        assert!(h.coordinator.on_selected(&ticket_id, Some("inline-1")).is_none());
    }
}
