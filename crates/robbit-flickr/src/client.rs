use async_trait::async_trait;
use robbit_core::config::Settings;
use robbit_core::models::{BoundingBox, SearchPage};
use std::time::Duration;

use crate::error::{FlickrError, Result};
use crate::keys::KeyPool;
use crate::ports::{PhotoSearch, Transport, TransportResponse};
use crate::response::decode_search_page;
use crate::transport::ReqwestTransport;

const SEARCH_METHOD: &str = "flickr.photos.search";

/// Rate-limited Flickr search client.
///
/// One instance should be shared by every worker of a process so that the key
/// pool, and with it the rate limit, is global. Call [`FlickrClient::start`]
/// before searching and [`FlickrClient::stop`] on shutdown.
#[derive(Debug)]
pub struct FlickrClient<T = ReqwestTransport> {
    transport: T,
    keys: KeyPool,
    base_url: String,
    per_page: u32,
    retry_wait: Duration,
    max_retries: u32,
}

impl FlickrClient<ReqwestTransport> {
    /// Client talking to the configured base URL over HTTP
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::with_transport(ReqwestTransport::new(), settings)
    }
}

impl<T: Transport> FlickrClient<T> {
    pub fn with_transport(transport: T, settings: &Settings) -> Result<Self> {
        reqwest::Url::parse(&settings.base_url).map_err(|e| FlickrError::InvalidUrl {
            url: settings.base_url.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            transport,
            keys: KeyPool::new(settings.api_keys.clone(), settings.rate_limit)?,
            base_url: settings.base_url.clone(),
            per_page: settings.per_page,
            retry_wait: settings.retry_wait,
            max_retries: settings.max_retries.max(1),
        })
    }

    /// Start replenishing request tokens
    pub async fn start(&self) -> Result<()> {
        self.keys.start().await
    }

    /// Stop replenishing tokens and release every waiting caller
    pub async fn stop(&self) {
        self.keys.stop().await;
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn search_params(&self, key: &str, bbox: &BoundingBox, page: u32, extras: &[String]) -> Vec<(&'static str, String)> {
        vec![
            ("method", SEARCH_METHOD.to_string()),
            ("api_key", key.to_string()),
            ("bbox", bbox.to_api_string()),
            ("extras", extras.join(",")),
            ("page", page.to_string()),
            ("per_page", self.per_page.to_string()),
            ("format", "json".to_string()),
            ("nojsoncallback", "1".to_string()),
        ]
    }

    /// Issue one logical request, retrying server-side failures.
    ///
    /// Every attempt consumes its own token.
    async fn call(&self, bbox: &BoundingBox, page: u32, extras: &[String]) -> Result<TransportResponse> {
        let mut attempts = 0;
        loop {
            let key = self.keys.acquire().await?;
            attempts += 1;

            let params = self.search_params(key, bbox, page, extras);
            let response = self.transport.get(&self.base_url, &params).await?;

            match response.status {
                200..=299 => return Ok(response),
                status @ 500..=599 => {
                    if attempts >= self.max_retries {
                        return Err(FlickrError::ServiceUnavailable { attempts, status });
                    }
                    tracing::warn!(
                        status,
                        attempt = attempts,
                        bbox = %bbox,
                        page,
                        "Search failed on the server side, retrying in {:?}",
                        self.retry_wait
                    );
                    tokio::time::sleep(self.retry_wait).await;
                }
                status => return Err(FlickrError::Status { status }),
            }
        }
    }
}

#[async_trait]
impl<T: Transport> PhotoSearch for FlickrClient<T> {
    async fn search(&self, bbox: &BoundingBox, page: u32, extras: &[String]) -> Result<SearchPage> {
        let response = self.call(bbox, page, extras).await?;
        decode_search_page(&response.body)
    }

    fn key_count(&self) -> usize {
        self.keys.len()
    }
}
