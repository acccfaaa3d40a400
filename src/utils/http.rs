use reqwest::{
    header::{self, HeaderMap, HeaderValue},
    redirect, Client, ClientBuilder, Proxy,
};
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

fn base_builder(timeout: Duration) -> ClientBuilder {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(60))
        .tcp_keepalive(Duration::from_secs(30))
        .user_agent(DEFAULT_USER_AGENT)
}

/// JSON API client. With `proxy` set, every request is routed through it
/// (`http://`, `https://` and `socks5://` are accepted).
pub fn create_api_client(timeout: Duration, proxy: Option<&str>) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

    let builder = base_builder(timeout).default_headers(headers);

    match proxy {
        Some(proxy_url) => {
            info!("Configuring client with proxy");
            builder.proxy(Proxy::all(proxy_url)?).build()
        }
        None => builder.build(),
    }
}

/// Never follows redirects, so the caller can read `Location` itself.
pub fn create_redirect_probe_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    base_builder(timeout).redirect(redirect::Policy::none()).build()
}

/// Client for media transfers; the per-transfer deadline is applied by the caller.
pub fn create_download_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .user_agent(DEFAULT_USER_AGENT)
        .build()
}
