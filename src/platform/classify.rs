use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use super::{instagram::is_instagram_shorthand, ClassificationError, ClassifiedUrl, Platform};

/// Follows exactly one redirect hop without fetching a body.
#[async_trait]
pub trait RedirectLookup: Send + Sync {
    async fn location(&self, url: &Url) -> Result<Url, ClassificationError>;
}

pub struct UrlClassifier {
    redirects: Arc<dyn RedirectLookup>,
}

impl UrlClassifier {
    pub fn new(redirects: Arc<dyn RedirectLookup>) -> Self {
        Self { redirects }
    }

    pub async fn classify(&self, raw_url: &str) -> Result<ClassifiedUrl, ClassificationError> {
        let raw_url = raw_url.trim();
        let mut url = Url::parse(raw_url).map_err(|_| ClassificationError::MalformedUrl(raw_url.to_string()))?;
        let mut hostname = normalize_hostname(&url).ok_or_else(|| ClassificationError::MalformedUrl(raw_url.to_string()))?;

        if Platform::from_hostname(&hostname) == Platform::Instagram && is_instagram_shorthand(&url) {
            let target = self.redirects.location(&with_trailing_slash(url)).await?;
            debug!("Instagram shorthand {} resolved to {}", raw_url, target);

            hostname =
                normalize_hostname(&target).ok_or_else(|| ClassificationError::UnresolvedShorthand(raw_url.to_string()))?;
            url = target;
        }

        Ok(ClassifiedUrl {
            raw_url: raw_url.to_string(),
            platform: Platform::from_hostname(&hostname),
            normalized_hostname: hostname,
            url,
        })
    }
}

pub fn normalize_hostname(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
