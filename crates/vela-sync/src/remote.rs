//! # Remote Data API Client
//!
//! The remote backend is a black-box paginated query/search endpoint. This
//! module defines the [`RemoteApi`] trait seam (so the engine and search
//! manager are testable against mocks) and the production HTTP client.
//!
//! ## Endpoints
//! ```text
//! GET {base}/{table}?page=N&page_size=M          → { records, total_count }
//! GET {base}/{table}/search?q=...&page=N&...     → { records, total_count }
//! GET {base}/health                              → 200 when reachable
//! ```

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use vela_core::{EntityKind, Page};

use crate::config::RemoteConfig;
use crate::error::{SyncError, SyncResult};

// =============================================================================
// Remote API Trait
// =============================================================================

/// The remote data API surface the offline layer consumes.
///
/// The Sync Engine and Search Job Manager are the only callers. Records come
/// back as raw JSON; the cache stores them opaquely.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Fetches one page of an entity table.
    async fn fetch(&self, kind: EntityKind, page: u32, page_size: u32) -> SyncResult<Page>;

    /// Searches one entity table.
    async fn search(
        &self,
        kind: EntityKind,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> SyncResult<Page>;

    /// Soft connectivity probe: can the backend be reached right now?
    ///
    /// This is a hint, not a guarantee - callers still handle per-request
    /// failures regardless of what the probe said.
    async fn health_check(&self) -> bool;
}

// =============================================================================
// HTTP Implementation
// =============================================================================

/// Production [`RemoteApi`] over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpRemoteApi {
    client: Client,
    base_url: Url,
}

impl HttpRemoteApi {
    /// Creates a client from the remote configuration.
    pub fn new(config: &RemoteConfig) -> SyncResult<Self> {
        let base_url = Url::parse(&config.base_url)?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SyncError::Internal(e.to_string()))?;

        Ok(HttpRemoteApi { client, base_url })
    }

    /// Builds `{base}/{segments...}` without clobbering the base path.
    fn endpoint(&self, segments: &[&str]) -> SyncResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::InvalidUrl("base URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_page(&self, url: Url) -> SyncResult<Page> {
        debug!(url = %url, "Remote GET");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::RemoteStatus {
                status: status.as_u16(),
            });
        }

        let page: Page = response.json().await?;
        Ok(page)
    }
}

#[async_trait]
impl RemoteApi for HttpRemoteApi {
    async fn fetch(&self, kind: EntityKind, page: u32, page_size: u32) -> SyncResult<Page> {
        let mut url = self.endpoint(&[kind.table_name()])?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("page_size", &page_size.to_string());

        self.get_page(url).await
    }

    async fn search(
        &self,
        kind: EntityKind,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> SyncResult<Page> {
        let mut url = self.endpoint(&[kind.table_name(), "search"])?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("page", &page.to_string())
            .append_pair("page_size", &page_size.to_string());

        self.get_page(url).await
    }

    async fn health_check(&self) -> bool {
        let Ok(url) = self.endpoint(&["health"]) else {
            return false;
        };

        match self.client.get(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "Health probe failed");
                false
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
