use anyhow::Context;
use async_trait::async_trait;
use rand::Rng;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{CacheConfig, ClientConfig};
use crate::error::{ScrapeError, ScrapeResult};
use crate::extract::PageExtractor;
use crate::storage::{current_epoch, Storage};
use crate::types::FetchResult;

/// Status and body of one HTTP response, before any classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawPage {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self { Self { status: 200, body: body.into() } }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> ScrapeResult<RawPage>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(cfg: &ClientConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.as_str())
            .timeout(Duration::from_secs(cfg.http_timeout_secs))
            .build()
            .context("building http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> ScrapeResult<RawPage> {
        let transport = |e: reqwest::Error| ScrapeError::Transport { url: url.to_string(), reason: e.to_string() };
        let resp = self.client.get(url).send().await.map_err(transport)?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(transport)?;
        Ok(RawPage { status, body: body.to_vec() })
    }
}

/// Map a non-2xx status onto the typed fetch errors.
pub fn check_status(url: &str, status: u16) -> ScrapeResult<()> {
    match status {
        200..=299 => Ok(()),
        429 => Err(ScrapeError::RateLimited { url: url.to_string() }),
        404 => Err(ScrapeError::NotFound { url: url.to_string() }),
        _ => Err(ScrapeError::Status { url: url.to_string(), status }),
    }
}

/// Cache key for an extracted page: the URL path, so host and query do not matter.
pub fn page_key(url: &str) -> String {
    let path = url::Url::parse(url).map(|u| u.path().to_string()).unwrap_or_else(|_| url.to_string());
    format!("page|{path}")
}

/// Fetcher plus cache: everything needed to turn a URL into extracted items.
#[derive(Clone)]
pub struct PageLoader {
    fetcher: Arc<dyn Fetcher>,
    cache: Arc<dyn Storage>,
    ttl: CacheConfig,
}

impl PageLoader {
    pub fn new(fetcher: Arc<dyn Fetcher>, cache: Arc<dyn Storage>, ttl: CacheConfig) -> Self {
        Self { fetcher, cache, ttl }
    }

    pub fn cache(&self) -> &Arc<dyn Storage> { &self.cache }

    pub fn film_ttl_secs(&self) -> i64 { self.ttl.film_ttl_secs }

    /// Fetch a URL and return its body, failing on any non-2xx status.
    pub async fn fetch_body(&self, url: &str) -> ScrapeResult<Vec<u8>> {
        tracing::debug!(url, "fetching page");
        let page = self.fetcher.fetch(url).await?;
        check_status(url, page.status)?;
        if page.body.is_empty() {
            tracing::warn!(url, status = page.status, "empty body returned");
        }
        Ok(page.body)
    }

    /// Extract a page, serving it from the cache when a fresh copy exists.
    pub async fn load<E>(&self, extractor: &E, url: &str) -> ScrapeResult<FetchResult<E::Item>>
    where
        E: PageExtractor,
        E::Item: Serialize + DeserializeOwned,
    {
        let key = page_key(url);
        let now = current_epoch();
        if let Some(payload) = self.cache.get_cache(&key, now).await.ok().flatten() {
            match serde_json::from_str::<FetchResult<E::Item>>(&payload) {
                Ok(hit) => {
                    tracing::debug!(key = %key, "page served from cache");
                    return Ok(hit);
                }
                Err(e) => tracing::debug!(key = %key, error = %e, "ignoring unreadable cache entry"),
            }
        }

        let body = self.fetch_body(url).await?;
        let page = extractor.extract(&body)?;
        if let Ok(payload) = serde_json::to_string(&page) {
            if let Err(e) = self.cache.put_cache(&key, &payload, now + self.page_ttl_secs()).await {
                tracing::warn!(key = %key, error = %e, "error writing cache");
            }
        }
        Ok(page)
    }

    // Spread expiry so a large collection does not go stale all at once
    fn page_ttl_secs(&self) -> i64 {
        let (min, max) = (self.ttl.page_ttl_min_secs, self.ttl.page_ttl_max_secs);
        if max > min { rand::thread_rng().gen_range(min..max) } else { min }
    }
}
