//! Source adapters for external bibliographic APIs.
//!
//! Each adapter translates one API's record shape into the canonical
//! [`Paper`](crate::models::Paper) entity at its boundary; records missing
//! required fields are dropped and logged rather than propagated partially
//! mapped.

mod pubmed;
mod scholar;

pub use pubmed::PubMedClient;
pub use scholar::{ScholarClient, ScholarPaper};

use crate::error::EngineResult;
use crate::models::{Paper, SourceTag};

/// A searchable bibliographic source.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable tag identifying this source.
    fn name(&self) -> SourceTag;

    /// Search the source, returning up to `limit` canonical papers.
    async fn search(&self, query: &str, limit: usize) -> EngineResult<Vec<Paper>>;
}
