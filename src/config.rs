use std::{env, path::PathBuf, str::FromStr, time::Duration};

use shuttle_runtime::SecretStore;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing secret: {0}")]
    MissingKey(&'static str),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub resolver: ResolverConfig,
    pub youtube: YoutubeConfig,
    pub extractor: ExtractorConfig,
    pub artifacts: ArtifactsConfig,
    pub admission: AdmissionConfig,
    pub delivery: DeliveryConfig,
}

#[derive(Clone, Debug)]
pub struct TelegramConfig {
    pub token: String,
    /// Chat that receives relay uploads so inline messages can be edited with a file id.
    pub relay_chat_id: i64,
}

#[derive(Clone, Debug)]
pub struct ResolverConfig {
    pub api_url: Url,
    pub proxy_url: Option<String>,
    pub instagram_fallback_url: Option<Url>,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct YoutubeConfig {
    pub api_url: Url,
    pub api_key: String,
}

#[derive(Clone, Debug)]
pub struct ExtractorConfig {
    pub binary: PathBuf,
    pub cookies: Option<PathBuf>,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct ArtifactsConfig {
    pub scratch_dir: PathBuf,
    pub download_timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct AdmissionConfig {
    pub youtube_max_duration: Duration,
    pub vk_max_duration: Duration,
}

#[derive(Clone, Debug)]
pub struct DeliveryConfig {
    pub placeholder_thumbnail: Url,
    pub max_urls_per_message: usize,
    pub ticket_ttl: Duration,
    pub ticket_sweep_interval: Duration,
}

const DEFAULT_COBALT_API_URL: &str = "https://api.cobalt.tools/";
const DEFAULT_YOUTUBE_API_URL: &str = "https://youtube.googleapis.com/youtube/v3/";
const DEFAULT_YTDLP_PATH: &str = "/usr/local/bin/yt-dlp";
const DEFAULT_PLACEHOLDER_THUMBNAIL: &str = "https://img.icons8.com/?size=512&id=eAMGjpJ4skFB&format=png";

impl AppConfig {
    pub fn from_secrets(secret_store: &SecretStore) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| secret_store.get(key))
    }

    /// Builds the config from any key lookup. Missing optional keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        info!("Building AppConfig...");
        let secrets = Secrets { lookup: &lookup };

        let config = AppConfig {
            telegram: TelegramConfig {
                token: secrets.required("TELEGRAM_BOT_TOKEN")?,
                relay_chat_id: secrets.parse_required("MEDIA_STORAGE_GROUP_ID")?,
            },
            resolver: ResolverConfig {
                api_url: secrets.url_or("COBALT_API_URL", DEFAULT_COBALT_API_URL)?,
                proxy_url: secrets.optional("COBALT_PROXY_URL"),
                instagram_fallback_url: secrets
                    .optional("INSTAGRAM_FALLBACK_API_URL")
                    .map(|value| parse_url("INSTAGRAM_FALLBACK_API_URL", &value))
                    .transpose()?,
                timeout: secrets.nonzero_secs_or("RESOLVER_TIMEOUT_SECS", 30)?,
            },
            youtube: YoutubeConfig {
                api_url: secrets.url_or("YOUTUBE_API_URL", DEFAULT_YOUTUBE_API_URL)?,
                api_key: secrets.required("YT_API_KEY")?,
            },
            extractor: ExtractorConfig {
                binary: secrets
                    .optional("YTDLP_PATH")
                    .unwrap_or_else(|| DEFAULT_YTDLP_PATH.to_string())
                    .into(),
                cookies: secrets.optional("YT_COOKIES_PATH").map(PathBuf::from),
                timeout: secrets.nonzero_secs_or("EXTRACTION_TIMEOUT_SECS", 120)?,
            },
            artifacts: ArtifactsConfig {
                scratch_dir: secrets
                    .optional("SCRATCH_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| env::temp_dir().join("yt-dlp-temp")),
                download_timeout: secrets.nonzero_secs_or("DOWNLOAD_TIMEOUT_SECS", 120)?,
            },
            admission: AdmissionConfig {
                youtube_max_duration: secrets.secs_or("YOUTUBE_MAX_DURATION_SECS", 90)?,
                vk_max_duration: secrets.secs_or("VK_MAX_DURATION_SECS", 240)?,
            },
            delivery: DeliveryConfig {
                placeholder_thumbnail: secrets.url_or("PLACEHOLDER_THUMBNAIL_URL", DEFAULT_PLACEHOLDER_THUMBNAIL)?,
                max_urls_per_message: secrets.parse_or("MAX_URLS_PER_MESSAGE", 3)?,
                ticket_ttl: secrets.nonzero_secs_or("TICKET_TTL_SECS", 3600)?,
                ticket_sweep_interval: secrets.nonzero_secs_or("TICKET_SWEEP_INTERVAL_SECS", 300)?,
            },
        };
        info!("AppConfig built");

        Ok(config)
    }
}

struct Secrets<'a, F: Fn(&str) -> Option<String>> {
    lookup: &'a F,
}

impl<F: Fn(&str) -> Option<String>> Secrets<'_, F> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|value| !value.trim().is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.optional(key).ok_or(ConfigError::MissingKey(key))
    }

    fn parse_required<T: FromStr>(&self, key: &'static str) -> Result<T, ConfigError> {
        let value = self.required(key)?;
        value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { key, value })
    }

    fn parse_or<T: FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError> {
        match self.optional(key) {
            Some(value) => value
                .trim()
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidValue { key, value }),
            None => Ok(default),
        }
    }

    fn secs_or(&self, key: &'static str, default: u64) -> Result<Duration, ConfigError> {
        self.parse_or(key, default).map(Duration::from_secs)
    }

    /// Periods and timeouts, where zero is never meaningful.
    fn nonzero_secs_or(&self, key: &'static str, default: u64) -> Result<Duration, ConfigError> {
        let secs = self.secs_or(key, default)?;
        if secs.is_zero() {
            return Err(ConfigError::InvalidValue {
                key,
                value: self.optional(key).unwrap_or_default(),
            });
        }
        Ok(secs)
    }

    fn url_or(&self, key: &'static str, default: &str) -> Result<Url, ConfigError> {
        let value = self.optional(key).unwrap_or_else(|| default.to_string());
        parse_url(key, &value)
    }
}

fn parse_url(key: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

#[cfg(test)]
impl AppConfig {
    pub fn new_test_config() -> Self {
        Self::from_lookup(|key| match key {
            "TELEGRAM_BOT_TOKEN" => Some("123456:TEST".to_string()),
            "MEDIA_STORAGE_GROUP_ID" => Some("-1001".to_string()),
            "YT_API_KEY" => Some("test-key".to_string()),
            _ => None,
        })
        .expect("test config must build")
    }
}
