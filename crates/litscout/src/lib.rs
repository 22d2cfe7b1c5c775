//! litscout — literature discovery and citation-graph engine.
//!
//! Turns a natural-language research topic into a multi-source search across
//! external bibliographic APIs (surviving rate limits and partial failures),
//! deduplicates and relevance-ranks the results, and builds bounded citation
//! graphs with derived network metrics.
//!
//! # Features
//!
//! - **Multilayer search**: keyword narrowing, recommended-query fan-out,
//!   OR-combination and raw-topic fallbacks
//! - **Credential pool**: interchangeable generation credentials with
//!   per-credential quota tracking and 24h reset windows
//! - **Graceful degradation**: a failing source or query contributes an
//!   empty result instead of aborting the request
//! - **Bounded citation graphs**: one-hop exploration plus a second-hop
//!   sample, capped to a few hundred nodes per request
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use litscout::{Config, clock::SystemClock, pool::CredentialPool};
//! use litscout::genai::GenAiClient;
//! use litscout::sources::{PubMedClient, ScholarClient, SourceAdapter};
//! use litscout::search::{SearchEngine, SearchOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let clock = Arc::new(SystemClock);
//!     let pool = Arc::new(CredentialPool::new(config.genai_api_keys.clone(), clock.clone()));
//!     let genai = Arc::new(GenAiClient::new(&config, pool)?);
//!     let scholar = Arc::new(ScholarClient::new(&config, clock.clone())?);
//!     let pubmed = Arc::new(PubMedClient::new(&config, clock.clone())?);
//!
//!     let sources: Vec<Arc<dyn SourceAdapter>> = vec![scholar.clone(), pubmed];
//!     let engine = SearchEngine::new(sources, Some(scholar), genai, clock, &config);
//!     let papers = engine.search("sparse attention transformers", &SearchOptions::default()).await?;
//!     println!("{} papers", papers.len());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod formatters;
pub mod genai;
pub mod graph;
pub mod models;
pub mod planner;
pub mod pool;
pub mod retry;
pub mod scorer;
pub mod search;
pub mod sources;

pub use config::Config;
pub use error::{ApiError, EngineError};
pub use graph::CitationGraphBuilder;
pub use models::{CitationMap, NetworkMetrics, Paper, SearchPlan};
pub use scorer::RelevanceScorer;
pub use search::{SearchEngine, SearchOptions};
