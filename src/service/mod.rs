pub mod metrics;
mod redirect;
mod resolver;
mod transport;
mod youtube;
mod ytdlp;

pub use metrics::{LogMetrics, MetricsSink};
pub use redirect::HttpRedirectLookup;
pub use resolver::{CobaltClient, InstagramFallbackClient, RemoteResolution, RemoteResolver};
pub use transport::{Placeholder, ReplyTarget, TelegramTransport, Transport, TransportError, VideoSource};
pub use youtube::YoutubeMetadataService;
pub use ytdlp::{LocalExtractor, YtDlp};
