use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;

use crate::app::{FerrotypeError, Result};
use crate::feed::{self, FeedPage};
use crate::fetcher::{ByteStream, FeedSource, ImageSource};

pub fn build_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .user_agent(concat!("ferrotype/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("Failed to build HTTP client")
}

/// Fetches and parses feed pages over HTTP.
pub struct HttpFeedSource {
    client: Client,
    feed_url: String,
}

impl HttpFeedSource {
    pub fn new(client: Client, feed_url: String) -> Self {
        Self { client, feed_url }
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_page(&self, url: Option<&str>) -> Result<FeedPage> {
        let url = url.unwrap_or(&self.feed_url);

        let response = self.client.get(url).send().await?;
        response.error_for_status_ref()?;

        let body = response.bytes().await?;
        feed::parse_page(&body)
    }
}

/// Opens image bodies from the remote image endpoint, optionally with a
/// bearer token.
pub struct HttpImageSource {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl HttpImageSource {
    pub fn new(client: Client, base_url: String, access_token: Option<String>) -> Self {
        Self {
            client,
            base_url,
            access_token,
        }
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn open_image(&self, external_id: u64) -> Result<ByteStream> {
        let url = format!(
            "{}/{}.jpg",
            self.base_url.trim_end_matches('/'),
            external_id
        );

        let mut request = self.client.get(&url);
        if let Some(ref token) = self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        response.error_for_status_ref()?;

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(FerrotypeError::from))
            .boxed();

        Ok(stream)
    }
}
