use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::{platform::PlatformError, utils::http::create_api_client};

const USABLE_STATUSES: [&str; 3] = ["success", "redirect", "tunnel"];
const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".webp"];

/// Response of the remote resolution service.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RemoteResolution {
    pub status: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl RemoteResolution {
    pub fn new(status: &str, url: Option<&str>) -> Self {
        Self {
            status: status.to_string(),
            url: url.map(str::to_string),
        }
    }

    /// The playable URL, if the status is a success one and the URL is not a still image.
    pub fn usable_url(&self) -> Option<Url> {
        if !USABLE_STATUSES.contains(&self.status.as_str()) {
            return None;
        }

        let url = Url::parse(self.url.as_deref()?).ok()?;
        let path = url.path().to_ascii_lowercase();
        if IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
            debug!("Discarding still image returned as video: {}", url);
            return None;
        }

        Some(url)
    }
}

#[async_trait]
pub trait RemoteResolver: Send + Sync {
    async fn resolve(&self, url: &Url) -> Result<RemoteResolution, PlatformError>;
}

/// Cobalt-compatible API: `POST {endpoint}` with `{"url": ...}`.
pub struct CobaltClient {
    client: Client,
    endpoint: Url,
}

impl CobaltClient {
    pub fn new(endpoint: Url, timeout: Duration, proxy: Option<&str>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: create_api_client(timeout, proxy)?,
            endpoint,
        })
    }
}

#[async_trait]
impl RemoteResolver for CobaltClient {
    async fn resolve(&self, url: &Url) -> Result<RemoteResolution, PlatformError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&serde_json::json!({ "url": url.as_str() }))
            .send()
            .await?;

        // Error statuses still carry a JSON body with `status: "error"`.
        Ok(response.json::<RemoteResolution>().await?)
    }
}

#[derive(Debug, Deserialize)]
struct FallbackResponse {
    status: String,
    #[serde(default)]
    data: Option<FallbackData>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FallbackData {
    #[serde(rename = "videoUrl")]
    video_url: Option<String>,
}

/// Instagram-only API: `GET {endpoint}?postUrl=...` answering `{status, data: {videoUrl}}`.
pub struct InstagramFallbackClient {
    client: Client,
    endpoint: Url,
}

impl InstagramFallbackClient {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: create_api_client(timeout, None)?,
            endpoint,
        })
    }
}

#[async_trait]
impl RemoteResolver for InstagramFallbackClient {
    async fn resolve(&self, url: &Url) -> Result<RemoteResolution, PlatformError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("postUrl", url.as_str())])
            .send()
            .await?
            .json::<FallbackResponse>()
            .await?;

        if let Some(message) = &response.message {
            debug!("Instagram fallback API said: {}", message);
        }

        let video_url = response.data.and_then(|d| d.video_url);
        Ok(RemoteResolution {
            status: response.status,
            url: video_url,
        })
    }
}
