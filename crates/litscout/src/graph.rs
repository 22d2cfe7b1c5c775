//! Citation graph builder: bounded one-hop exploration plus a second-hop
//! sample around a single center paper.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Duration;
use futures::future::join_all;

use crate::cache::{ResultCache, cache_key};
use crate::clock::Clock;
use crate::config::engine;
use crate::error::EngineResult;
use crate::models::{CitationMap, NetworkMetrics, Paper};
use crate::retry::{RetryPolicy, call_with_retry};
use crate::search::dedupe_and_rank;
use crate::sources::ScholarClient;

/// Builds a [`CitationMap`] for one paper identifier or DOI.
///
/// Every network call runs under the slow-reset retry policy (3 attempts,
/// 10-15s waits on 429) because this API's rate limits recover slowly.
/// Exploration cost is bounded regardless of graph size: at most 100 raw
/// records per direction and 50 extra calls for indirect connections.
pub struct CitationGraphBuilder {
    scholar: Arc<ScholarClient>,
    cache: ResultCache<CitationMap>,
    policy: RetryPolicy,
}

impl CitationGraphBuilder {
    /// Create a builder over the given graph client.
    #[must_use]
    pub fn new(scholar: Arc<ScholarClient>, clock: Arc<dyn Clock>) -> Self {
        Self {
            scholar,
            cache: ResultCache::new(Duration::hours(1), clock),
            policy: RetryPolicy::slow_reset(),
        }
    }

    /// Build the citation map for an identifier or DOI.
    ///
    /// # Errors
    ///
    /// `PaperNotFound` when the center cannot be resolved; upstream errors
    /// during resolution propagate with their status and message. Failures
    /// while fetching neighbor lists degrade to empty lists instead.
    pub async fn build_map(&self, id_or_doi: &str) -> EngineResult<CitationMap> {
        let key = cache_key(&["map", id_or_doi]);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let center = self.resolve_center(id_or_doi).await?;
        tracing::debug!(center = %center.id, "center paper resolved");

        let (cited_by_raw, references_raw) = tokio::join!(
            call_with_retry(self.policy, || {
                self.scholar.get_citations(&center.id, engine::MAP_FETCH_LIMIT)
            }),
            call_with_retry(self.policy, || {
                self.scholar.get_references(&center.id, engine::MAP_FETCH_LIMIT)
            }),
        );
        let cited_by_raw = cited_by_raw.unwrap_or_else(|err| {
            tracing::warn!(error = %err, "cited-by fetch failed, proceeding with empty list");
            Vec::new()
        });
        let references_raw = references_raw.unwrap_or_else(|err| {
            tracing::warn!(error = %err, "reference fetch failed, proceeding with empty list");
            Vec::new()
        });

        let mut cited_by = prune(cited_by_raw, &center.id);
        cited_by.truncate(engine::MAP_LIST_CAP);
        let mut references = prune(references_raw, &center.id);
        references.truncate(engine::MAP_LIST_CAP);

        let indirect = self.indirect_connections(&center, &cited_by, &references).await;

        let metrics =
            NetworkMetrics::compute(center.citation_count, cited_by.len(), references.len());

        let map = CitationMap { center, cited_by, references, indirect, metrics };
        self.cache.insert(key, map.clone());
        Ok(map)
    }

    /// Resolve the center paper: direct identifier lookup, then for
    /// DOI-shaped inputs a `DOI:` lookup, a free-text search taking the best
    /// DOI match, and finally a `URL:` lookup against doi.org.
    async fn resolve_center(&self, input: &str) -> EngineResult<Paper> {
        if let Some(paper) =
            call_with_retry(self.policy, || self.scholar.get_paper(input)).await?
        {
            return Ok(paper);
        }

        if is_doi(input) {
            let doi_lookup = format!("DOI:{input}");
            if let Some(paper) =
                call_with_retry(self.policy, || self.scholar.get_paper(&doi_lookup)).await?
            {
                return Ok(paper);
            }

            let candidates =
                call_with_retry(self.policy, || self.scholar.search_papers(input, 10))
                    .await
                    .unwrap_or_else(|err| {
                        tracing::warn!(error = %err, "DOI free-text search failed");
                        Vec::new()
                    });
            if let Some(paper) = best_doi_match(input, candidates) {
                return Ok(paper);
            }

            let doi_url = url::Url::parse("https://doi.org/")
                .ok()
                .and_then(|base| base.join(input).ok())
                .map_or_else(|| format!("https://doi.org/{input}"), |u| u.to_string());
            let url_lookup = format!("URL:{doi_url}");
            if let Some(paper) =
                call_with_retry(self.policy, || self.scholar.get_paper(&url_lookup)).await?
            {
                return Ok(paper);
            }
        }

        Err(crate::error::EngineError::paper_not_found(input))
    }

    /// Second-hop sample: references of the top cited-by papers, fetched in
    /// small chunks, deduplicated, and disjoint from everything already in
    /// the map.
    async fn indirect_connections(
        &self,
        center: &Paper,
        cited_by: &[Paper],
        references: &[Paper],
    ) -> Vec<Paper> {
        let seeds: Vec<String> =
            cited_by.iter().take(engine::INDIRECT_SEEDS).map(|p| p.id.clone()).collect();
        if seeds.is_empty() {
            return Vec::new();
        }

        let mut fetched = Vec::new();
        for chunk in seeds.chunks(engine::HOP_CHUNK) {
            let batch = join_all(chunk.iter().map(|id| {
                let scholar = self.scholar.clone();
                let id = id.clone();
                async move {
                    match scholar.get_references(&id, engine::INDIRECT_REFS_PER_SEED).await {
                        Ok(papers) => papers,
                        Err(err) => {
                            tracing::warn!(%id, error = %err, "indirect fetch failed, skipping seed");
                            Vec::new()
                        }
                    }
                }
            }))
            .await;
            fetched.extend(batch.into_iter().flatten());
        }

        let known: HashSet<&str> = std::iter::once(center.id.as_str())
            .chain(cited_by.iter().map(|p| p.id.as_str()))
            .chain(references.iter().map(|p| p.id.as_str()))
            .collect();

        let mut indirect: Vec<Paper> =
            dedupe_and_rank(fetched).into_iter().filter(|p| !known.contains(p.id.as_str())).collect();
        indirect.truncate(engine::INDIRECT_CAP);
        indirect
    }
}

impl std::fmt::Debug for CitationGraphBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CitationGraphBuilder").field("cached_maps", &self.cache.len()).finish()
    }
}

/// Deduplicate, drop the center, rank by citation count.
fn prune(papers: Vec<Paper>, center_id: &str) -> Vec<Paper> {
    dedupe_and_rank(papers).into_iter().filter(|p| p.id != center_id).collect()
}

/// Whether the input looks like a DOI.
fn is_doi(input: &str) -> bool {
    static PATTERN: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    let re = PATTERN
        .get_or_init(|| regex::Regex::new(r"^10\.\d{4,9}/\S+$").expect("valid DOI regex"));
    re.is_match(input)
}

/// Best match for a DOI among free-text search results: an exact DOI match
/// wins, otherwise the top-ranked result.
fn best_doi_match(doi: &str, candidates: Vec<Paper>) -> Option<Paper> {
    let exact = candidates
        .iter()
        .position(|p| p.doi.as_deref().is_some_and(|d| d.eq_ignore_ascii_case(doi)));
    match exact {
        Some(index) => candidates.into_iter().nth(index),
        None => candidates.into_iter().next(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceTag;

    fn paper(id: &str, doi: Option<&str>) -> Paper {
        Paper {
            id: id.into(),
            title: format!("Paper {id}"),
            abstract_text: None,
            authors: Vec::new(),
            year: 2024,
            month: None,
            day: None,
            venue: None,
            citation_count: 0,
            url: None,
            doi: doi.map(ToString::to_string),
            open_access: None,
            source: SourceTag::Scholar,
            relevance_score: None,
            relevance_reason: None,
            relevance_tag: None,
        }
    }

    #[test]
    fn test_is_doi() {
        assert!(is_doi("10.1038/nature12373"));
        assert!(is_doi("10.48550/arXiv.1706.03762"));
        assert!(!is_doi("arXiv:1706.03762"));
        assert!(!is_doi("649def34f8be52c8b66281af98ae884c09aef38b"));
        assert!(!is_doi("10.1038/"));
    }

    #[test]
    fn test_best_doi_match_prefers_exact() {
        let candidates = vec![
            paper("a", Some("10.1000/other")),
            paper("b", Some("10.1038/NATURE12373")),
        ];
        let best = best_doi_match("10.1038/nature12373", candidates).unwrap();
        assert_eq!(best.id, "b");
    }

    #[test]
    fn test_best_doi_match_falls_back_to_first() {
        let candidates = vec![paper("a", None), paper("b", None)];
        assert_eq!(best_doi_match("10.1/x", candidates).unwrap().id, "a");
        assert!(best_doi_match("10.1/x", Vec::new()).is_none());
    }

    #[test]
    fn test_prune_removes_center_and_duplicates() {
        let papers = vec![paper("center", None), paper("x", None), paper("x", None)];
        let pruned = prune(papers, "center");
        assert_eq!(pruned.len(), 1);
        assert_eq!(pruned[0].id, "x");
    }
}
