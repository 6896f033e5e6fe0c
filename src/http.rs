//! HTTP client for the activity API.
//!
//! This module provides:
//! - [`ApiClient`]: one pooled `reqwest` client for the four endpoints
//! - [`DataFetcher`]: binds an endpoint and a parameter map to
//!   `{ data, loading, error }`, with latest-wins sequencing
//!
//! Nothing is retried. A non-success status becomes
//! `"HTTP error! status: <code>"`.

use futures::try_join;
use log::{debug, info, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use crate::config::DashboardConfig;
use crate::pages::{Page, PageStatus};
use crate::query::QueryParams;
use crate::views::analyses::{
    CentralityMeasures, CentralityResponse, ShortestPathOutcome, ShortestPathResponse,
    SHORTEST_PATH_FAILED,
};
use crate::views::geo::{CensusCollection, OverlayKind};
use crate::{ActivityRecord, DashboardError, Result};

// Endpoint names under the API base URL
pub const UNIFIED_DATA: &str = "unified-data";
pub const CENTRALITY_MEASURES: &str = "centrality-measures";
pub const SHORTEST_PATH: &str = "shortest-path";
pub const CENSUS_DATA: &str = "census-data";

// ============================================================================
// API client
// ============================================================================

/// Client for the activity API. Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    config: DashboardConfig,
}

impl ApiClient {
    /// Create a client with the configured base URL and timeout.
    pub fn new(config: &DashboardConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| DashboardError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        let mut config = config.clone();
        config.api_base_url = config.api_base_url.trim_end_matches('/').to_string();
        Ok(Self { client, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.api_base_url
    }

    fn url(&self, endpoint: &str) -> String {
        self.config.endpoint(endpoint)
    }

    /// GET `endpoint` with URL-encoded `query` and decode the JSON body.
    pub async fn get_json<T, K, V>(&self, endpoint: &str, query: &[(K, V)]) -> Result<T>
    where
        T: DeserializeOwned,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let pairs: Vec<(&str, &str)> = query
            .iter()
            .map(|(k, v)| (k.as_ref(), v.as_ref()))
            .collect();
        let url = self.url(endpoint);
        let start = Instant::now();

        let resp = self.client.get(&url).query(&pairs).send().await?;
        let status = resp.status();
        if !status.is_success() {
            warn!("[ApiClient] GET {} returned {}", url, status);
            return Err(DashboardError::Http {
                message: status.to_string(),
                status_code: Some(status.as_u16()),
            });
        }

        let body = resp.json::<T>().await?;
        debug!("[ApiClient] GET {} in {:?}", url, start.elapsed());
        Ok(body)
    }

    /// Activities matching `params`.
    pub async fn unified_data(&self, params: &QueryParams) -> Result<Vec<ActivityRecord>> {
        let records: Vec<ActivityRecord> = self
            .get_json(UNIFIED_DATA, &params.to_query_pairs())
            .await?;
        info!(
            "[ApiClient] {} activities for {} to {}",
            records.len(),
            params.start_date,
            params.end_date
        );
        Ok(records)
    }

    pub async fn centrality_measures(&self) -> Result<CentralityMeasures> {
        let response: CentralityResponse = self
            .get_json::<_, &str, &str>(CENTRALITY_MEASURES, &[])
            .await?;
        Ok(response.centrality)
    }

    /// Shortest path between two participants.
    ///
    /// Never fails: a server-side error becomes its message and a request
    /// that produced no usable body becomes [`SHORTEST_PATH_FAILED`].
    pub async fn shortest_path(&self, source: &str, target: &str) -> ShortestPathOutcome {
        let url = self.url(SHORTEST_PATH);
        let sent = self
            .client
            .get(&url)
            .query(&[("source", source), ("target", target)])
            .send()
            .await;

        let resp = match sent {
            Ok(resp) => resp,
            Err(e) => {
                warn!("[ApiClient] Shortest path request failed: {}", e);
                return ShortestPathOutcome::Error(SHORTEST_PATH_FAILED.to_string());
            }
        };
        let ok = resp.status().is_success();

        match resp.json::<ShortestPathResponse>().await {
            Ok(body) if ok => ShortestPathOutcome::from_response(body),
            Ok(body) => ShortestPathOutcome::Error(
                body.error
                    .unwrap_or_else(|| SHORTEST_PATH_FAILED.to_string()),
            ),
            Err(e) => {
                warn!("[ApiClient] Shortest path body unreadable: {}", e);
                ShortestPathOutcome::Error(SHORTEST_PATH_FAILED.to_string())
            }
        }
    }

    pub async fn census_data(&self, overlay: OverlayKind) -> Result<CensusCollection> {
        let collection: CensusCollection = self
            .get_json(CENSUS_DATA, &[("overlay", overlay.as_str())])
            .await?;
        info!(
            "[ApiClient] {} census features for {}",
            collection.features.len(),
            overlay
        );
        Ok(collection)
    }

    /// Everything `page` needs. Net fetches activities and centrality
    /// concurrently and fails if either fails.
    pub async fn load_page(&self, page: Page, params: &QueryParams) -> Result<PageData> {
        if page.needs_centrality() {
            let (records, centrality) =
                try_join!(self.unified_data(params), self.centrality_measures())?;
            Ok(PageData {
                records,
                centrality: Some(centrality),
            })
        } else {
            Ok(PageData {
                records: self.unified_data(params).await?,
                centrality: None,
            })
        }
    }
}

/// Fetched inputs of one page.
#[derive(Debug, Clone, Default)]
pub struct PageData {
    pub records: Vec<ActivityRecord>,
    pub centrality: Option<CentralityMeasures>,
}

// ============================================================================
// Data fetcher
// ============================================================================

/// What a fetcher currently holds.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    /// Last successfully decoded body
    pub data: T,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T: Default> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            data: T::default(),
            loading: true,
            error: None,
        }
    }
}

impl<T> FetchState<T> {
    pub fn status(&self) -> PageStatus {
        PageStatus::from_parts(self.loading, self.error.as_deref())
    }
}

/// One endpoint bound to a parameter map.
///
/// Every fetch takes a ticket when it is issued. A response is applied only
/// if its ticket is still the latest, so the last committed query wins no
/// matter which response arrives first.
pub struct DataFetcher<T> {
    client: ApiClient,
    endpoint: String,
    params: Mutex<BTreeMap<String, String>>,
    state: Mutex<FetchState<T>>,
    issued: AtomicU64,
}

fn lock<S>(mutex: &Mutex<S>) -> MutexGuard<'_, S> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<T> DataFetcher<T>
where
    T: DeserializeOwned + Clone + Default,
{
    pub fn new<I, K, V>(client: ApiClient, endpoint: &str, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            client,
            endpoint: endpoint.to_string(),
            params: Mutex::new(
                params
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            state: Mutex::new(FetchState::default()),
            issued: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> FetchState<T> {
        lock(&self.state).clone()
    }

    pub fn params(&self) -> BTreeMap<String, String> {
        lock(&self.params).clone()
    }

    /// Tickets issued so far.
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    /// Fetch with the current parameters and return the resulting state.
    pub async fn fetch(&self) -> FetchState<T> {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let pairs: Vec<(String, String)> = self.params().into_iter().collect();
        lock(&self.state).loading = true;

        let result = self.client.get_json::<T, _, _>(&self.endpoint, &pairs).await;

        if self.issued.load(Ordering::SeqCst) != ticket {
            debug!(
                "[DataFetcher] Dropping stale {} response (ticket {})",
                self.endpoint, ticket
            );
            return self.state();
        }

        let mut state = lock(&self.state);
        match result {
            Ok(data) => {
                state.data = data;
                state.error = None;
            }
            Err(e) => {
                warn!("[DataFetcher] {} failed: {}", self.endpoint, e);
                state.error = Some(e.to_string());
            }
        }
        state.loading = false;
        state.clone()
    }

    /// Merge `patch` into the parameters and fetch again.
    pub async fn refetch<I, K, V>(&self, patch: I) -> FetchState<T>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        {
            let mut params = lock(&self.params);
            for (k, v) in patch {
                params.insert(k.into(), v.into());
            }
        }
        self.fetch().await
    }
}

impl DataFetcher<Vec<ActivityRecord>> {
    /// Fetcher for `/unified-data` bound to `params`.
    pub fn unified_data(client: ApiClient, params: &QueryParams) -> Self {
        Self::new(client, UNIFIED_DATA, params.to_query_pairs())
    }

    /// Refetch with a newly committed query.
    pub async fn refetch_query(&self, params: &QueryParams) -> FetchState<Vec<ActivityRecord>> {
        self.refetch(params.to_query_pairs()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        ApiClient::new(&DashboardConfig::default()).unwrap()
    }

    #[test]
    fn test_initial_state_is_loading() {
        let fetcher = DataFetcher::unified_data(client(), &QueryParams::default());
        let state = fetcher.state();
        assert!(state.loading);
        assert!(state.data.is_empty());
        assert_eq!(state.status(), PageStatus::Loading);
        assert_eq!(fetcher.issued(), 0);
    }

    #[test]
    fn test_params_bound_from_query() {
        let fetcher = DataFetcher::unified_data(client(), &QueryParams::default());
        let params = fetcher.params();
        assert_eq!(params.get("start_date").map(String::as_str), Some("2023-07-01"));
        assert_eq!(params.get("cluster").map(String::as_str), Some("Philadelphia Cluster"));
    }

    #[test]
    fn test_url_join() {
        let mut config = DashboardConfig::default();
        config.api_base_url = "http://example.test/api/".to_string();
        let client = ApiClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://example.test/api");
        assert_eq!(client.url("/census-data"), "http://example.test/api/census-data");
    }
}
