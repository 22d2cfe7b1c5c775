//! Graph-oriented bibliographic API client (Semantic Scholar shape).
//!
//! Provides async HTTP access with:
//! - Connection pooling via reqwest
//! - Retry middleware with exponential backoff
//! - Response caching with 5-minute TTL
//! - Anonymous fallback when the API key is rejected (403)

use std::sync::Arc;

use chrono::Datelike;
use moka::future::Cache;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Deserialize;
use serde_json::Value;

use crate::clock::Clock;
use crate::config::{Config, api, fields};
use crate::error::{ApiError, ApiResult, EngineResult};
use crate::models::{Paper, SourceTag, is_boilerplate_title, parse_publication_date};

use super::SourceAdapter;

/// Client for the graph-oriented bibliographic API.
#[derive(Clone)]
pub struct ScholarClient {
    /// HTTP client with middleware.
    client: ClientWithMiddleware,

    /// Raw response cache.
    cache: Cache<String, Value>,

    /// API key (optional; anonymous access works with tighter limits).
    api_key: Option<String>,

    /// Graph API base URL.
    base_url: String,

    /// Clock for the year fallback on unparseable dates.
    clock: Arc<dyn Clock>,
}

impl ScholarClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: &Config, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(api::USER_AGENT)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(api::MAX_KEEPALIVE)
            .pool_idle_timeout(api::KEEPALIVE_EXPIRY)
            .gzip(true)
            .build()?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(std::time::Duration::from_secs(1), std::time::Duration::from_secs(30))
            .build_with_max_retries(3);

        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        let cache = Cache::builder()
            .max_capacity(api::TRANSPORT_CACHE_MAX)
            .time_to_live(api::TRANSPORT_CACHE_TTL)
            .build();

        Ok(Self {
            client,
            cache,
            api_key: config.scholar_api_key.clone(),
            base_url: config.scholar_api_url.clone(),
            clock,
        })
    }

    /// Check if an API key is configured.
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Search for papers.
    ///
    /// # Errors
    ///
    /// Returns error on API failure; an empty result set is not an error.
    pub async fn search_papers(&self, query: &str, limit: usize) -> ApiResult<Vec<Paper>> {
        let url = format!("{}/paper/search", self.base_url);
        let params = vec![
            ("query".to_string(), query.to_string()),
            ("limit".to_string(), limit.to_string()),
            ("fields".to_string(), fields::PAPER.join(",")),
        ];

        #[derive(Deserialize)]
        struct SearchResponse {
            #[serde(default)]
            data: Vec<ScholarPaper>,
        }

        let value = self.get_cached(&url, &params).await?;
        let response: SearchResponse = serde_json::from_value(value)?;
        Ok(self.map_records(response.data))
    }

    /// Get a single paper by identifier (`DOI:...` and `URL:...` prefixes
    /// are passed through to the API).
    ///
    /// # Errors
    ///
    /// Returns error on API failure; 404 maps to `Ok(None)`.
    pub async fn get_paper(&self, paper_id: &str) -> ApiResult<Option<Paper>> {
        let url = format!("{}/paper/{}", self.base_url, paper_id);
        let params = vec![("fields".to_string(), fields::PAPER.join(","))];

        match self.get_cached(&url, &params).await {
            Ok(value) => {
                let record: ScholarPaper = serde_json::from_value(value)?;
                Ok(self.map_record(record))
            }
            Err(ApiError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Get papers citing `paper_id` (forward edges).
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn get_citations(&self, paper_id: &str, limit: usize) -> ApiResult<Vec<Paper>> {
        self.get_edges(paper_id, "citations", "citingPaper", limit).await
    }

    /// Get papers `paper_id` cites (backward edges).
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn get_references(&self, paper_id: &str, limit: usize) -> ApiResult<Vec<Paper>> {
        self.get_edges(paper_id, "references", "citedPaper", limit).await
    }

    async fn get_edges(
        &self,
        paper_id: &str,
        endpoint: &str,
        edge_field: &str,
        limit: usize,
    ) -> ApiResult<Vec<Paper>> {
        let url = format!("{}/paper/{}/{}", self.base_url, paper_id, endpoint);
        let params = vec![
            ("limit".to_string(), limit.to_string()),
            (
                "fields".to_string(),
                format!("{edge_field}.{}", fields::EDGE.join(&format!(",{edge_field}."))),
            ),
        ];

        #[derive(Deserialize)]
        struct EdgeResponse {
            #[serde(default)]
            data: Vec<Edge>,
        }

        #[derive(Deserialize)]
        struct Edge {
            #[serde(alias = "citingPaper", alias = "citedPaper")]
            paper: Option<ScholarPaper>,
        }

        let value = self.get_cached(&url, &params).await?;
        let response: EdgeResponse = serde_json::from_value(value)?;
        Ok(self.map_records(response.data.into_iter().filter_map(|e| e.paper).collect()))
    }

    /// Make a GET request through the response cache, falling back to
    /// anonymous mode once when a configured key is rejected with 403.
    async fn get_cached(&self, url: &str, params: &[(String, String)]) -> ApiResult<Value> {
        let cache_key = self.cache_key("GET", url, params);
        if let Some(cached) = self.cache.get(&cache_key).await {
            return Ok(cached);
        }

        let mut request = self.client.get(url).query(params);
        if let Some(ref key) = self.api_key {
            request = request.header("x-api-key", key.clone());
        }
        let mut response = request.send().await?;

        if response.status().as_u16() == 403 && self.api_key.is_some() {
            tracing::warn!(url, "API key rejected (403), retrying anonymously");
            response = self.client.get(url).query(params).send().await?;
        }

        let response = handle_response(response).await?;
        let value: Value = response.json().await?;
        self.cache.insert(cache_key, value.clone()).await;
        Ok(value)
    }

    fn map_records(&self, records: Vec<ScholarPaper>) -> Vec<Paper> {
        let fallback_year = self.clock.now().year();
        records.into_iter().filter_map(|r| r.into_paper(fallback_year)).collect()
    }

    fn map_record(&self, record: ScholarPaper) -> Option<Paper> {
        record.into_paper(self.clock.now().year())
    }

    /// Generate cache key.
    fn cache_key(&self, method: &str, url: &str, params: &[(String, String)]) -> String {
        use md5::{Digest, Md5};

        let mut hasher = Md5::new();
        hasher.update(method.as_bytes());
        hasher.update(b"|");
        hasher.update(url.as_bytes());
        hasher.update(b"|");
        for (k, v) in params {
            hasher.update(k.as_bytes());
            hasher.update(b"=");
            hasher.update(v.as_bytes());
            hasher.update(b"&");
        }
        format!("{:x}", hasher.finalize())
    }
}

#[async_trait::async_trait]
impl SourceAdapter for ScholarClient {
    fn name(&self) -> SourceTag {
        SourceTag::Scholar
    }

    async fn search(&self, query: &str, limit: usize) -> EngineResult<Vec<Paper>> {
        Ok(self.search_papers(query, limit).await?)
    }
}

impl std::fmt::Debug for ScholarClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScholarClient").field("has_api_key", &self.has_api_key()).finish()
    }
}

/// Handle API response status codes.
async fn handle_response(response: reqwest::Response) -> ApiResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status.as_u16() {
        429 => {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);
            Err(ApiError::rate_limited(retry_after))
        }
        404 => {
            let text = response.text().await.unwrap_or_default();
            Err(ApiError::not_found(extract_message(&text)))
        }
        400 => {
            let text = response.text().await.unwrap_or_default();
            Err(ApiError::bad_request(extract_message(&text)))
        }
        503 => {
            let text = response.text().await.unwrap_or_default();
            Err(ApiError::overloaded(extract_message(&text)))
        }
        500..=599 => {
            let text = response.text().await.unwrap_or_default();
            Err(ApiError::server(status.as_u16(), extract_message(&text)))
        }
        _ => {
            let text = response.text().await.unwrap_or_default();
            Err(ApiError::UnexpectedStatus {
                status: status.as_u16(),
                message: extract_message(&text),
            })
        }
    }
}

/// Pull the upstream message out of a JSON error body when parseable.
fn extract_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("message"))
                .and_then(Value::as_str)
                .map(ToString::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

/// Wire record for one paper as the graph API returns it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScholarPaper {
    /// Unique paper ID; records without one are dropped.
    #[serde(default)]
    pub paper_id: Option<String>,

    /// Paper title.
    #[serde(default)]
    pub title: Option<String>,

    /// Paper abstract.
    #[serde(default)]
    pub r#abstract: Option<String>,

    /// Publication year.
    #[serde(default)]
    pub year: Option<i32>,

    /// Publication date in ISO format (YYYY-MM-DD).
    #[serde(default)]
    pub publication_date: Option<String>,

    /// Citation count.
    #[serde(default)]
    pub citation_count: Option<i64>,

    /// Publication venue.
    #[serde(default)]
    pub venue: Option<String>,

    /// Canonical URL.
    #[serde(default)]
    pub url: Option<String>,

    /// External identifiers.
    #[serde(default)]
    pub external_ids: Option<ScholarExternalIds>,

    /// Whether the paper is open access.
    #[serde(default)]
    pub is_open_access: Option<bool>,

    /// Authors.
    #[serde(default)]
    pub authors: Vec<ScholarAuthor>,
}

/// External identifiers for a paper.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScholarExternalIds {
    /// Digital Object Identifier.
    #[serde(rename = "DOI")]
    pub doi: Option<String>,
}

/// Author reference.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScholarAuthor {
    /// Author display name.
    #[serde(default)]
    pub name: Option<String>,
}

impl ScholarPaper {
    /// Map into the canonical entity. Returns `None` for records missing an
    /// identifier or carrying a boilerplate title.
    #[must_use]
    pub fn into_paper(self, fallback_year: i32) -> Option<Paper> {
        let id = self.paper_id?;
        let title = self.title.unwrap_or_default();
        if is_boilerplate_title(&title) {
            tracing::debug!(%id, "dropping record with boilerplate title");
            return None;
        }

        let (year, month, day) = match (self.year, self.publication_date.as_deref()) {
            (_, Some(date)) if !date.trim().is_empty() => {
                let (y, m, d) = parse_publication_date(date, self.year.unwrap_or(fallback_year));
                (y, m, d)
            }
            (Some(year), _) => (year, None, None),
            (None, _) => (fallback_year, None, None),
        };

        Some(Paper {
            id,
            title: title.trim().to_string(),
            abstract_text: self.r#abstract,
            authors: self.authors.into_iter().filter_map(|a| a.name).collect(),
            year,
            month,
            day,
            venue: self.venue.filter(|v| !v.trim().is_empty()),
            citation_count: self.citation_count.unwrap_or(0),
            url: self.url,
            doi: self.external_ids.and_then(|ids| ids.doi),
            open_access: self.is_open_access,
            source: SourceTag::Scholar,
            relevance_score: None,
            relevance_reason: None,
            relevance_tag: None,
        })
    }
}
