use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;

use crate::http::HttpClient;

use super::{Catalog, CatalogPackage};

/// Default location of the package index.
pub const DEFAULT_CATALOG_URL: &str = "https://depot-index.github.io/catalog/index.json";

/// The index fetch is the only bounded network wait in the engine.
const CATALOG_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Catalog index fetched over HTTP.
pub struct RemoteCatalog {
    http: HttpClient,
    url: String,
}

impl RemoteCatalog {
    pub fn new(http: HttpClient, url: Option<String>) -> Self {
        let url = url.unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string());
        Self { http, url }
    }

    /// The index is served from a static host with aggressive edge caching,
    /// so every fetch carries a cache-busting query parameter.
    fn busted_url(&self) -> String {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}nocache={}", self.url, separator, stamp)
    }
}

#[async_trait]
impl Catalog for RemoteCatalog {
    #[tracing::instrument(skip(self))]
    async fn fetch(&self) -> Result<Vec<CatalogPackage>> {
        let url = self.busted_url();
        debug!("Fetching package index from {}...", url);
        tokio::time::timeout(CATALOG_FETCH_TIMEOUT, self.http.get_json(&url))
            .await
            .context("Timed out fetching the package index")?
    }
}
