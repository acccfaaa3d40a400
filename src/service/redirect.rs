use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use url::Url;

use crate::{
    platform::{ClassificationError, RedirectLookup},
    utils::http::create_redirect_probe_client,
};

/// Reads the `Location` of a 301/302 answer. Redirects are never followed and the
/// body is never read.
pub struct HttpRedirectLookup {
    client: Client,
}

impl HttpRedirectLookup {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: create_redirect_probe_client(timeout)?,
        })
    }
}

#[async_trait]
impl RedirectLookup for HttpRedirectLookup {
    async fn location(&self, url: &Url) -> Result<Url, ClassificationError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();

        if status != StatusCode::MOVED_PERMANENTLY && status != StatusCode::FOUND {
            return Err(ClassificationError::UnresolvedShorthand(format!("{} answered {}", url, status)));
        }

        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ClassificationError::UnresolvedShorthand(format!("{} sent no Location", url)))?;

        url.join(location)
            .map_err(|_| ClassificationError::UnresolvedShorthand(format!("bad Location {}", location)))
    }
}
