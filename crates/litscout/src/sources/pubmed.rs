//! Biomedical literature API client (NCBI E-utilities shape).
//!
//! Two-step protocol: `esearch.fcgi` returns matching record identifiers,
//! `esummary.fcgi` returns batch summaries for those identifiers. The API
//! exposes no citation counts; papers map with `citation_count = 0`.

use std::sync::Arc;

use chrono::Datelike;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Deserialize;
use serde_json::Value;

use crate::clock::Clock;
use crate::config::{Config, api};
use crate::error::{ApiError, ApiResult, EngineResult};
use crate::models::{Paper, SourceTag, is_boilerplate_title, parse_publication_date};

use super::SourceAdapter;

/// Client for the biomedical literature API.
#[derive(Clone)]
pub struct PubMedClient {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: Option<String>,
    clock: Arc<dyn Clock>,
}

#[derive(Debug, Deserialize)]
struct EsearchResponse {
    esearchresult: EsearchResult,
}

#[derive(Debug, Deserialize)]
struct EsearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SummaryRecord {
    #[serde(default)]
    uid: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    authors: Vec<SummaryAuthor>,
    #[serde(default, rename = "fulljournalname")]
    journal_name: Option<String>,
    #[serde(default, rename = "pubdate")]
    pub_date: Option<String>,
    #[serde(default, rename = "elocationid")]
    elocation_id: Option<String>,
    #[serde(default, rename = "articleids")]
    article_ids: Vec<ArticleId>,
}

#[derive(Debug, Deserialize)]
struct SummaryAuthor {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArticleId {
    idtype: String,
    value: String,
}

impl PubMedClient {
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
            .gzip(true)
            .build()?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(std::time::Duration::from_secs(1), std::time::Duration::from_secs(30))
            .build_with_max_retries(3);

        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url: config.pubmed_api_url.clone(),
            api_key: config.pubmed_api_key.clone(),
            clock,
        })
    }

    /// Step one: search for record identifiers.
    async fn search_ids(&self, query: &str, limit: usize) -> ApiResult<Vec<String>> {
        let url = format!("{}/esearch.fcgi", self.base_url);
        let mut params = vec![
            ("db".to_string(), "pubmed".to_string()),
            ("term".to_string(), query.to_string()),
            ("retmode".to_string(), "json".to_string()),
            ("retmax".to_string(), limit.to_string()),
            ("sort".to_string(), "relevance".to_string()),
        ];
        if let Some(ref key) = self.api_key {
            params.push(("api_key".to_string(), key.clone()));
        }

        let response = self.client.get(&url).query(&params).send().await?;
        let response = check_status(response).await?;
        let parsed: EsearchResponse = serde_json::from_value(response.json().await?)?;
        Ok(parsed.esearchresult.idlist)
    }

    /// Step two: fetch batch summaries for the identifiers.
    async fn fetch_summaries(&self, ids: &[String]) -> ApiResult<Vec<Paper>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/esummary.fcgi", self.base_url);
        let mut params = vec![
            ("db".to_string(), "pubmed".to_string()),
            ("id".to_string(), ids.join(",")),
            ("retmode".to_string(), "json".to_string()),
        ];
        if let Some(ref key) = self.api_key {
            params.push(("api_key".to_string(), key.clone()));
        }

        let response = self.client.get(&url).query(&params).send().await?;
        let response = check_status(response).await?;
        let value: Value = response.json().await?;

        // The result object maps each uid to its record, plus a "uids" index.
        let Some(result) = value.get("result") else {
            return Ok(Vec::new());
        };
        let fallback_year = self.clock.now().year();
        let mut papers = Vec::new();
        for id in ids {
            let Some(raw) = result.get(id) else { continue };
            match serde_json::from_value::<SummaryRecord>(raw.clone()) {
                Ok(record) => {
                    if let Some(paper) = map_summary(record, fallback_year) {
                        papers.push(paper);
                    }
                }
                Err(err) => {
                    tracing::debug!(%id, error = %err, "skipping unparseable summary record");
                }
            }
        }
        Ok(papers)
    }
}

#[async_trait::async_trait]
impl SourceAdapter for PubMedClient {
    fn name(&self) -> SourceTag {
        SourceTag::PubMed
    }

    async fn search(&self, query: &str, limit: usize) -> EngineResult<Vec<Paper>> {
        let ids = self.search_ids(query, limit).await?;
        Ok(self.fetch_summaries(&ids).await?)
    }
}

impl std::fmt::Debug for PubMedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PubMedClient").field("base_url", &self.base_url).finish()
    }
}

/// Status handling shared by both protocol steps.
async fn check_status(response: reqwest::Response) -> ApiResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    match status.as_u16() {
        429 => Err(ApiError::rate_limited(5)),
        404 => Err(ApiError::not_found(text)),
        400 => Err(ApiError::bad_request(text)),
        503 => Err(ApiError::overloaded(text)),
        500..=599 => Err(ApiError::server(status.as_u16(), text)),
        _ => Err(ApiError::UnexpectedStatus { status: status.as_u16(), message: text }),
    }
}

/// Map one summary record into the canonical entity.
fn map_summary(record: SummaryRecord, fallback_year: i32) -> Option<Paper> {
    let id = record.uid?;
    let title = record.title.unwrap_or_default();
    if is_boilerplate_title(&title) {
        tracing::debug!(%id, "dropping record with boilerplate title");
        return None;
    }

    let (year, month, day) =
        parse_publication_date(record.pub_date.as_deref().unwrap_or(""), fallback_year);

    let doi = record
        .article_ids
        .iter()
        .find(|a| a.idtype.eq_ignore_ascii_case("doi"))
        .map(|a| a.value.clone())
        .or_else(|| {
            record
                .elocation_id
                .as_deref()
                .and_then(|e| e.strip_prefix("doi: ").or_else(|| e.strip_prefix("doi:")))
                .map(|d| d.trim().to_string())
        });

    Some(Paper {
        url: Some(format!("https://pubmed.ncbi.nlm.nih.gov/{id}/")),
        id,
        title: title.trim().to_string(),
        abstract_text: None, // summaries carry no abstract
        authors: record.authors.into_iter().filter_map(|a| a.name).collect(),
        year,
        month,
        day,
        venue: record.journal_name.filter(|v| !v.trim().is_empty()),
        citation_count: 0, // the API has no citation-count field
        doi,
        open_access: None,
        source: SourceTag::PubMed,
        relevance_score: None,
        relevance_reason: None,
        relevance_tag: None,
    })
}
