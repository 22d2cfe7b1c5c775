//! Configuration for the literature discovery engine.

use std::time::Duration;

/// API configuration constants.
pub mod api {
    use std::time::Duration;

    /// Graph-oriented bibliographic API endpoint (Semantic Scholar shape).
    pub const SCHOLAR_API: &str = "https://api.semanticscholar.org/graph/v1";

    /// Biomedical literature API endpoint (NCBI E-utilities shape).
    pub const PUBMED_API: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

    /// Text-generation API endpoint.
    pub const GENAI_API: &str = "https://generativelanguage.googleapis.com/v1beta";

    /// Default text-generation model.
    pub const GENAI_MODEL: &str = "gemini-2.0-flash";

    /// User agent sent on every outbound request.
    pub const USER_AGENT: &str = concat!("litscout/", env!("CARGO_PKG_VERSION"));

    /// Request timeout for bibliographic calls.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Request timeout for text generation (generation calls are slow).
    pub const GENAI_TIMEOUT: Duration = Duration::from_secs(120);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Transport-level response cache TTL (5 minutes).
    pub const TRANSPORT_CACHE_TTL: Duration = Duration::from_secs(300);

    /// Transport-level response cache capacity.
    pub const TRANSPORT_CACHE_MAX: u64 = 1000;

    /// Maximum keepalive connections.
    pub const MAX_KEEPALIVE: usize = 10;

    /// Keepalive expiry.
    pub const KEEPALIVE_EXPIRY: Duration = Duration::from_secs(30);
}

/// Engine tuning constants.
pub mod engine {
    use std::time::Duration;

    /// Result threshold at which search strategies stop escalating.
    pub const DEFAULT_THRESHOLD: usize = 5;

    /// Default cap on returned papers.
    pub const DEFAULT_MAX_RESULTS: usize = 50;

    /// Query×source combinations executed per deep-search batch.
    pub const BATCH_CONCURRENCY: usize = 3;

    /// Fixed delay between deep-search batches.
    pub const BATCH_DELAY: Duration = Duration::from_secs(2);

    /// Sustained request rate for the shared deep-search pacer (per second).
    pub const PACER_PER_SECOND: u32 = 2;

    /// Seeds explored during one-hop citation augmentation.
    pub const HOP_SEEDS: usize = 10;

    /// Seeds fetched per augmentation sub-batch.
    pub const HOP_CHUNK: usize = 5;

    /// Delay between augmentation sub-batches.
    pub const HOP_DELAY: Duration = Duration::from_secs(1);

    /// Maximum AI-generated query paraphrases.
    pub const MAX_PARAPHRASES: usize = 10;

    /// Papers per relevance-scoring batch.
    pub const SCORE_BATCH: usize = 20;

    /// Raw fetch cap for cited-by / reference lists.
    pub const MAP_FETCH_LIMIT: usize = 100;

    /// Final cap for cited-by / reference lists in a citation map.
    pub const MAP_LIST_CAP: usize = 50;

    /// Final cap for indirect connections.
    pub const INDIRECT_CAP: usize = 30;

    /// Cited-by papers explored for indirect connections.
    pub const INDIRECT_SEEDS: usize = 10;

    /// References fetched per indirect seed.
    pub const INDIRECT_REFS_PER_SEED: usize = 5;

    /// Engine cache capacity before eviction triggers.
    pub const CACHE_MAX_ENTRIES: usize = 1000;

    /// Oldest entries dropped per eviction.
    pub const CACHE_EVICT_BATCH: usize = 100;

    /// Hours a quota-exhausted credential stays unusable.
    pub const QUOTA_RESET_HOURS: i64 = 24;
}

/// Paper field sets for bibliographic API requests.
pub mod fields {
    /// Fields requested for search results and paper lookups.
    pub const PAPER: &[&str] = &[
        "paperId",
        "title",
        "abstract",
        "year",
        "publicationDate",
        "citationCount",
        "venue",
        "url",
        "externalIds",
        "isOpenAccess",
        "authors",
    ];

    /// Minimal fields for citation-edge expansion.
    pub const EDGE: &[&str] = &[
        "paperId",
        "title",
        "year",
        "publicationDate",
        "citationCount",
        "venue",
        "url",
        "externalIds",
        "authors",
    ];
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Credentials for the text-generation service (pool, rotated on quota).
    pub genai_api_keys: Vec<String>,

    /// Text-generation model name.
    pub genai_model: String,

    /// Bibliographic graph API key (optional, enables higher rate limits).
    pub scholar_api_key: Option<String>,

    /// Biomedical API key (optional).
    pub pubmed_api_key: Option<String>,

    /// Base URL for the graph API (overridable for mock servers).
    pub scholar_api_url: String,

    /// Base URL for the biomedical API (overridable for mock servers).
    pub pubmed_api_url: String,

    /// Base URL for the text-generation API (overridable for mock servers).
    pub genai_api_url: String,

    /// Request timeout for bibliographic calls.
    pub request_timeout: Duration,

    /// Request timeout for generation calls.
    pub genai_timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Delay between deep-search batches.
    pub batch_delay: Duration,

    /// Delay between citation-augmentation sub-batches.
    pub hop_delay: Duration,
}

impl Config {
    /// Create a configuration with the given credentials.
    #[must_use]
    pub fn new(genai_api_keys: Vec<String>, scholar_api_key: Option<String>) -> Self {
        Self {
            genai_api_keys,
            genai_model: api::GENAI_MODEL.to_string(),
            scholar_api_key,
            pubmed_api_key: None,
            scholar_api_url: api::SCHOLAR_API.to_string(),
            pubmed_api_url: api::PUBMED_API.to_string(),
            genai_api_url: api::GENAI_API.to_string(),
            request_timeout: api::REQUEST_TIMEOUT,
            genai_timeout: api::GENAI_TIMEOUT,
            connect_timeout: api::CONNECT_TIMEOUT,
            batch_delay: engine::BATCH_DELAY,
            hop_delay: engine::HOP_DELAY,
        }
    }

    /// Create a test configuration pointing every API at a mock server.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            genai_api_keys: vec!["test-key".to_string()],
            genai_model: api::GENAI_MODEL.to_string(),
            scholar_api_key: None,
            pubmed_api_key: None,
            scholar_api_url: format!("{base_url}/graph/v1"),
            pubmed_api_url: format!("{base_url}/entrez/eutils"),
            genai_api_url: format!("{base_url}/v1beta"),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            genai_timeout: Duration::from_secs(5),
            batch_delay: Duration::from_millis(0), // No pacing in tests
            hop_delay: Duration::from_millis(0),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// `LITSCOUT_GENAI_API_KEYS` is a comma-separated credential list;
    /// `LITSCOUT_S2_API_KEY` and `LITSCOUT_PUBMED_API_KEY` are optional.
    ///
    /// # Errors
    ///
    /// Returns error if environment variables are invalid.
    pub fn from_env() -> anyhow::Result<Self> {
        let genai_api_keys = std::env::var("LITSCOUT_GENAI_API_KEYS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let scholar_api_key = std::env::var("LITSCOUT_S2_API_KEY").ok();
        let mut config = Self::new(genai_api_keys, scholar_api_key);
        config.pubmed_api_key = std::env::var("LITSCOUT_PUBMED_API_KEY").ok();
        if let Ok(model) = std::env::var("LITSCOUT_GENAI_MODEL") {
            config.genai_model = model;
        }
        Ok(config)
    }

    /// Check if any text-generation credential is configured.
    #[must_use]
    pub fn has_genai_credentials(&self) -> bool {
        !self.genai_api_keys.is_empty()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Vec::new(), None)
    }
}
