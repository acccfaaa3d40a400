use std::sync::Arc;

use teloxide::{adaptors::Throttle, Bot};

use crate::{
    config::AppConfig,
    error::BotResult,
    platform::{traits::DurationProbe, PlatformError, PlatformRegistry, ProviderDeps, UrlClassifier},
    runtime::{ArtifactManager, DeliveryCoordinator, DirectDelivery, MemoryTicketStore, TicketStore},
    service::{
        CobaltClient, HttpRedirectLookup, InstagramFallbackClient, LocalExtractor, LogMetrics, MetricsSink,
        RemoteResolver, TelegramTransport, Transport, YoutubeMetadataService, YtDlp,
    },
};

/// Long-lived services shared by every handler. Injected through dptree.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub artifacts: Arc<ArtifactManager>,
    pub platform_registry: Arc<PlatformRegistry>,
    pub direct: Arc<DirectDelivery>,
    pub delivery: Arc<DeliveryCoordinator>,
}

impl AppState {
    pub fn new(config: AppConfig, bot: Throttle<Bot>) -> BotResult<Self> {
        let transport = Arc::new(TelegramTransport::new(bot, config.telegram.relay_chat_id));
        Self::with_transport(config, transport)
    }

    pub fn with_transport(config: AppConfig, transport: Arc<dyn Transport>) -> BotResult<Self> {
        info!("Initializing AppState...");

        let artifacts = Arc::new(ArtifactManager::new(&config.artifacts)?);
        let metrics: Arc<dyn MetricsSink> = Arc::new(LogMetrics::new());
        let tickets: Arc<dyn TicketStore> = Arc::new(MemoryTicketStore::new());

        let resolver = &config.resolver;
        let direct_resolver: Arc<dyn RemoteResolver> = Arc::new(
            CobaltClient::new(resolver.api_url.clone(), resolver.timeout, None).map_err(PlatformError::from)?,
        );
        let proxied_resolver = match resolver.proxy_url.as_deref() {
            Some(proxy) => Some(Arc::new(
                CobaltClient::new(resolver.api_url.clone(), resolver.timeout, Some(proxy)).map_err(PlatformError::from)?,
            ) as Arc<dyn RemoteResolver>),
            None => {
                warn!("COBALT_PROXY_URL is not set, proxied attempts are disabled");
                None
            }
        };
        let instagram_fallback = match &resolver.instagram_fallback_url {
            Some(endpoint) => Some(Arc::new(
                InstagramFallbackClient::new(endpoint.clone(), resolver.timeout).map_err(PlatformError::from)?,
            ) as Arc<dyn RemoteResolver>),
            None => None,
        };

        let youtube_metadata: Arc<dyn DurationProbe> = Arc::new(
            YoutubeMetadataService::new(config.youtube.api_url.clone(), config.youtube.api_key.clone(), resolver.timeout)
                .map_err(PlatformError::from)?,
        );
        let ytdlp = Arc::new(YtDlp::new(
            config.extractor.binary.clone(),
            config.extractor.cookies.clone(),
            config.extractor.timeout,
        ));
        let vk_metadata: Arc<dyn DurationProbe> = ytdlp.clone();
        let extractor: Arc<dyn LocalExtractor> = ytdlp;

        let platform_registry = Arc::new(PlatformRegistry::new(&ProviderDeps {
            direct: direct_resolver,
            proxied: proxied_resolver,
            instagram_fallback,
            youtube_metadata,
            vk_metadata,
            extractor,
            artifacts: Arc::clone(&artifacts),
            admission: config.admission.clone(),
        }));

        let redirects = Arc::new(HttpRedirectLookup::new(resolver.timeout).map_err(PlatformError::from)?);
        let classifier = Arc::new(UrlClassifier::new(redirects));

        let direct = Arc::new(DirectDelivery::new(
            Arc::clone(&classifier),
            Arc::clone(&platform_registry),
            Arc::clone(&artifacts),
            Arc::clone(&transport),
            Arc::clone(&metrics),
            config.delivery.max_urls_per_message,
        ));
        let delivery = Arc::new(DeliveryCoordinator::new(
            classifier,
            Arc::clone(&platform_registry),
            Arc::clone(&artifacts),
            transport,
            tickets,
            metrics,
            config.delivery.placeholder_thumbnail.clone(),
        ));

        info!("AppState initialized");

        Ok(Self {
            config: Arc::new(config),
            artifacts,
            platform_registry,
            direct,
            delivery,
        })
    }
}
