use std::{
    sync::LazyLock,
    time::Duration,
};

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::{
    platform::{extract_youtube_video_id, traits::DurationProbe, PlatformError},
    utils::http::create_api_client,
};

static ISO8601_DURATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$").expect("valid ISO-8601 duration regex")
});

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    content_details: ContentDetails,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: String,
}

/// Duration lookup through the YouTube Data API (`videos?part=contentDetails`).
pub struct YoutubeMetadataService {
    client: Client,
    api_url: Url,
    api_key: String,
}

impl YoutubeMetadataService {
    pub fn new(api_url: Url, api_key: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: create_api_client(timeout, None)?,
            api_url,
            api_key,
        })
    }

    pub async fn fetch_duration(&self, video_id: &str) -> Result<Duration, PlatformError> {
        let endpoint = self
            .api_url
            .join("videos")
            .map_err(|e| PlatformError::MetadataError(e.to_string()))?;

        let response = self
            .client
            .get(endpoint)
            .query(&[("part", "contentDetails"), ("id", video_id), ("key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json::<VideoListResponse>()
            .await?;

        let item = response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| PlatformError::MetadataError(format!("video {} not found", video_id)))?;

        parse_iso8601_duration(&item.content_details.duration)
            .ok_or_else(|| PlatformError::ParsingError(format!("bad duration {}", item.content_details.duration)))
    }
}

#[async_trait]
impl DurationProbe for YoutubeMetadataService {
    async fn duration(&self, url: &Url) -> Result<Duration, PlatformError> {
        let video_id = extract_youtube_video_id(url)
            .ok_or_else(|| PlatformError::MetadataError(format!("no video id in {}", url)))?;

        self.fetch_duration(&video_id).await
    }
}

pub fn parse_iso8601_duration(value: &str) -> Option<Duration> {
    let captures = ISO8601_DURATION_REGEX.captures(value)?;
    let part = |index: usize, unit: u64| -> Option<u64> {
        match captures.get(index) {
            Some(m) => m.as_str().parse::<u64>().ok()?.checked_mul(unit),
            None => Some(0),
        }
    };

    let secs = [(1, 86_400), (2, 3_600), (3, 60), (4, 1)]
        .into_iter()
        .try_fold(0u64, |total, (index, unit)| total.checked_add(part(index, unit)?))?;
    Some(Duration::from_secs(secs))
}
