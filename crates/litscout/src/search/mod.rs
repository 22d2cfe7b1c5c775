//! Search orchestration: multilayer strategies over every enabled source.
//!
//! Strategies run in order of escalating cost until the result-count
//! threshold is met. Every step fans a query out to all enabled sources
//! concurrently; a failed branch is caught at its boundary and contributes
//! an empty list, so one failing source or query never aborts the
//! operation. Deep variants batch query execution (3 at a time) behind a
//! shared token-bucket pacer plus fixed inter-batch delays to respect
//! upstream rate limits.

mod dedupe;

pub use dedupe::dedupe_and_rank;

use std::collections::HashSet;
use std::num::NonZeroU32;
use std::sync::Arc;

use futures::future::join_all;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

use crate::cache::{ResultCache, cache_key};
use crate::clock::Clock;
use crate::config::{Config, engine};
use crate::error::{EngineError, EngineResult};
use crate::genai::{TextGenerator, extract_json};
use crate::models::{Paper, SourceTag};
use crate::planner::QueryPlanner;
use crate::sources::{ScholarClient, SourceAdapter};

/// Options for one search request.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Result count at which strategies stop escalating.
    pub threshold: usize,

    /// Cap on returned papers.
    pub max_results: usize,

    /// Restrict to these sources; `None` enables all.
    pub sources: Option<Vec<SourceTag>>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            threshold: engine::DEFAULT_THRESHOLD,
            max_results: engine::DEFAULT_MAX_RESULTS,
            sources: None,
        }
    }
}

/// Static keyword substitutions used when translation is unavailable.
const STATIC_TRANSLATIONS: &[(&str, &str)] = &[
    ("机器学习", "machine learning"),
    ("深度学习", "deep learning"),
    ("神经网络", "neural network"),
    ("人工智能", "artificial intelligence"),
    ("强化学习", "reinforcement learning"),
    ("künstliche Intelligenz", "artificial intelligence"),
    ("maschinelles Lernen", "machine learning"),
    ("apprentissage automatique", "machine learning"),
    ("réseaux de neurones", "neural networks"),
    ("aprendizaje automático", "machine learning"),
];

/// Multi-source search orchestrator.
pub struct SearchEngine {
    sources: Vec<Arc<dyn SourceAdapter>>,
    scholar: Option<Arc<ScholarClient>>,
    genai: Arc<dyn TextGenerator>,
    planner: QueryPlanner,
    cache: ResultCache<Vec<Paper>>,
    pacer: DefaultDirectRateLimiter,
    batch_delay: std::time::Duration,
    hop_delay: std::time::Duration,
}

impl SearchEngine {
    /// Create an engine over the given sources.
    ///
    /// `scholar` enables the one-hop citation augmentation used by deep
    /// search; pass `None` to skip it.
    #[must_use]
    pub fn new(
        sources: Vec<Arc<dyn SourceAdapter>>,
        scholar: Option<Arc<ScholarClient>>,
        genai: Arc<dyn TextGenerator>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        let per_second =
            NonZeroU32::new(engine::PACER_PER_SECOND).unwrap_or(NonZeroU32::MIN);
        Self {
            sources,
            scholar,
            planner: QueryPlanner::new(genai.clone(), clock.clone()),
            genai,
            cache: ResultCache::new(chrono::Duration::hours(24), clock),
            pacer: RateLimiter::direct(Quota::per_second(per_second)),
            batch_delay: config.batch_delay,
            hop_delay: config.hop_delay,
        }
    }

    /// Multilayer search: keyword narrowing, then recommended-query fan-out,
    /// then an OR-combination, then the raw topic, stopping as soon as the
    /// threshold is met. Returns papers sorted by citation count descending.
    ///
    /// # Errors
    ///
    /// `AllCredentialsExhausted` when plan generation has no usable
    /// credential left; upstream failures inside a fan-out degrade to empty
    /// contributions instead of erroring.
    pub async fn search(&self, topic: &str, options: &SearchOptions) -> EngineResult<Vec<Paper>> {
        let key = cache_key(&[
            "search",
            topic,
            &options.threshold.to_string(),
            &options.max_results.to_string(),
            &format!("{:?}", options.sources),
        ]);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let plan = self.planner.plan(topic).await?;
        let sources = self.enabled_sources(options);
        let mut collected: Vec<Paper> = Vec::new();

        // Strategy 1: core-keyword narrowing, widest query first.
        let keywords = if plan.core_keywords.is_empty() {
            crate::models::SearchPlan::fallback(topic).core_keywords
        } else {
            plan.core_keywords.clone()
        };
        for k in (1..=keywords.len()).rev() {
            let query = self.ensure_english(&keywords[..k].join(" ")).await;
            let step = self.fan_out(&query, &sources, options.max_results).await;
            let satisfied = step.len() >= options.threshold;
            collected.extend(step);
            if satisfied {
                tracing::debug!(k, "narrowing satisfied threshold");
                return Ok(self.finish(key, collected, options.max_results));
            }
        }
        if unique_count(&collected) >= options.threshold {
            return Ok(self.finish(key, collected, options.max_results));
        }

        // Strategy 2: recommended-query fan-out plus a keyword-augmented topic.
        let mut queries = plan.recommended_queries.clone();
        queries.push(format!("{topic} {}", keywords.join(" ")));
        let branches = join_all(
            queries.iter().map(|q| self.fan_out_owned(q.clone(), &sources, options.max_results)),
        )
        .await;
        collected.extend(branches.into_iter().flatten());
        if unique_count(&collected) >= options.threshold {
            return Ok(self.finish(key, collected, options.max_results));
        }

        // Strategy 3: one OR-combination of every recommended query.
        if plan.recommended_queries.len() > 1 {
            let or_query = plan.recommended_queries.join(" OR ");
            collected.extend(self.fan_out(&or_query, &sources, options.max_results).await);
            if unique_count(&collected) >= options.threshold {
                return Ok(self.finish(key, collected, options.max_results));
            }
        }

        // Strategy 4: the unmodified topic.
        collected.extend(self.fan_out(topic, &sources, options.max_results).await);
        Ok(self.finish(key, collected, options.max_results))
    }

    /// Expanded-term search: AI paraphrases merged with the plan's queries
    /// and the topic, executed in paced batches with per-query source
    /// fallback.
    ///
    /// # Errors
    ///
    /// `AllCredentialsExhausted` when no generation credential is usable.
    pub async fn expanded_term_search(
        &self,
        topic: &str,
        max_results: usize,
    ) -> EngineResult<Vec<Paper>> {
        let plan = self.planner.plan(topic).await?;

        let mut queries = vec![topic.to_string()];
        queries.extend(plan.recommended_queries.clone());
        queries.extend(self.paraphrases(topic).await?);
        let queries = dedupe_queries(queries);

        let sources = self.enabled_sources(&SearchOptions::default());
        let collected = self.run_batched(&queries, &sources, max_results).await;
        let mut ranked = dedupe_and_rank(collected);
        ranked.truncate(max_results);
        Ok(ranked)
    }

    /// One-hop citation-network augmentation over the top seeds.
    ///
    /// Explores cited-by edges for the 10 highest-cited seeds, 5 at a time
    /// with a fixed delay between sub-batches, then merges with the seeds.
    /// Without a graph-capable client the seeds pass through unchanged.
    ///
    /// # Errors
    ///
    /// Currently infallible beyond the type; branch failures degrade to
    /// empty contributions.
    pub async fn citation_network_search(
        &self,
        seeds: Vec<Paper>,
        max_results: usize,
    ) -> EngineResult<Vec<Paper>> {
        let Some(scholar) = self.scholar.clone() else {
            let mut ranked = dedupe_and_rank(seeds);
            ranked.truncate(max_results);
            return Ok(ranked);
        };

        let ranked_seeds = dedupe_and_rank(seeds);
        let top: Vec<String> = ranked_seeds
            .iter()
            .take(engine::HOP_SEEDS)
            .filter(|p| p.source == SourceTag::Scholar)
            .map(|p| p.id.clone())
            .collect();

        let mut collected = ranked_seeds;
        for (i, chunk) in top.chunks(engine::HOP_CHUNK).enumerate() {
            if i > 0 {
                tokio::time::sleep(self.hop_delay).await;
            }
            let batch = join_all(chunk.iter().map(|id| {
                let scholar = scholar.clone();
                let id = id.clone();
                async move {
                    match scholar.get_citations(&id, 10).await {
                        Ok(papers) => papers,
                        Err(err) => {
                            tracing::warn!(%id, error = %err, "citation hop failed, skipping seed");
                            Vec::new()
                        }
                    }
                }
            }))
            .await;
            collected.extend(batch.into_iter().flatten());
        }

        let mut ranked = dedupe_and_rank(collected);
        ranked.truncate(max_results);
        Ok(ranked)
    }

    /// Deep research entry point: expanded-term search followed by citation
    /// augmentation, globally deduplicated and truncated.
    ///
    /// # Errors
    ///
    /// `AllCredentialsExhausted` when no generation credential is usable.
    pub async fn multilayer_search(
        &self,
        topic: &str,
        max_results: usize,
    ) -> EngineResult<Vec<Paper>> {
        let key = cache_key(&["deep", topic, &max_results.to_string()]);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let seeds = self.expanded_term_search(topic, max_results).await?;
        let result = self.citation_network_search(seeds, max_results).await?;
        self.cache.insert(key, result.clone());
        Ok(result)
    }

    /// Sources enabled for this request.
    fn enabled_sources(&self, options: &SearchOptions) -> Vec<Arc<dyn SourceAdapter>> {
        match &options.sources {
            Some(wanted) => self
                .sources
                .iter()
                .filter(|s| wanted.contains(&s.name()))
                .cloned()
                .collect(),
            None => self.sources.clone(),
        }
    }

    /// Fan one query out to every enabled source concurrently. A rejected
    /// branch logs and contributes an empty list.
    async fn fan_out(
        &self,
        query: &str,
        sources: &[Arc<dyn SourceAdapter>],
        limit: usize,
    ) -> Vec<Paper> {
        let branches = join_all(sources.iter().map(|source| {
            let source = source.clone();
            let query = query.to_string();
            async move {
                match source.search(&query, limit).await {
                    Ok(papers) => papers,
                    Err(err) => {
                        tracing::warn!(
                            source = %source.name(),
                            %query,
                            error = %err,
                            "source branch failed, contributing empty result"
                        );
                        Vec::new()
                    }
                }
            }
        }))
        .await;
        branches.into_iter().flatten().collect()
    }

    /// Owned-query variant for concurrent strategy-2 branches.
    async fn fan_out_owned(
        &self,
        query: String,
        sources: &[Arc<dyn SourceAdapter>],
        limit: usize,
    ) -> Vec<Paper> {
        self.fan_out(&query, sources, limit).await
    }

    /// Execute queries in batches of three behind the shared pacer, with a
    /// fixed delay between batches. Within one query, the next source is
    /// tried only when the previous returned nothing (source fallback).
    async fn run_batched(
        &self,
        queries: &[String],
        sources: &[Arc<dyn SourceAdapter>],
        limit: usize,
    ) -> Vec<Paper> {
        let mut collected = Vec::new();
        for (i, chunk) in queries.chunks(engine::BATCH_CONCURRENCY).enumerate() {
            if i > 0 && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }
            let batch =
                join_all(chunk.iter().map(|q| self.query_with_fallback(q, sources, limit))).await;
            collected.extend(batch.into_iter().flatten());
        }
        collected
    }

    /// Try sources in order for one query; stop at the first non-empty hit.
    async fn query_with_fallback(
        &self,
        query: &str,
        sources: &[Arc<dyn SourceAdapter>],
        limit: usize,
    ) -> Vec<Paper> {
        for source in sources {
            self.pacer.until_ready().await;
            match source.search(query, limit).await {
                Ok(papers) if !papers.is_empty() => return papers,
                Ok(_) => {
                    tracing::debug!(source = %source.name(), query, "empty result, trying next source");
                }
                Err(err) => {
                    tracing::warn!(source = %source.name(), query, error = %err, "source failed, trying next");
                }
            }
        }
        Vec::new()
    }

    /// Up to 10 diverse query paraphrases from the text generator; malformed
    /// output degrades to none.
    async fn paraphrases(&self, topic: &str) -> EngineResult<Vec<String>> {
        let prompt = format!(
            "Generate up to {} diverse search-query paraphrases for the research topic \
             \"{topic}\". Vary terminology and specificity. Respond with ONLY a JSON array \
             of strings.",
            engine::MAX_PARAPHRASES
        );
        match self.genai.generate(&prompt).await {
            Ok(raw) => {
                let parsed = extract_json(&raw)
                    .and_then(|v| {
                        v.as_array().map(|items| {
                            items
                                .iter()
                                .filter_map(|i| i.as_str().map(ToString::to_string))
                                .take(engine::MAX_PARAPHRASES)
                                .collect::<Vec<_>>()
                        })
                    })
                    .unwrap_or_default();
                if parsed.is_empty() {
                    tracing::warn!(topic, "no usable paraphrases in generation output");
                }
                Ok(parsed)
            }
            Err(err @ EngineError::AllCredentialsExhausted { .. }) => Err(err),
            Err(err) => {
                tracing::warn!(topic, error = %err, "paraphrase generation failed");
                Ok(Vec::new())
            }
        }
    }

    /// Translate a non-English query to English, with a static
    /// keyword-substitution fallback when generation fails.
    async fn ensure_english(&self, query: &str) -> String {
        if query.is_ascii() {
            return query.to_string();
        }
        let prompt = format!(
            "Translate this academic search query to English. Respond with ONLY the \
             translated query, nothing else.\n\nQuery: {query}"
        );
        match self.genai.generate(&prompt).await {
            Ok(raw) => {
                let line = raw.lines().next().unwrap_or("").trim().to_string();
                if line.is_empty() { static_substitute(query) } else { line }
            }
            Err(err) => {
                tracing::warn!(error = %err, "translation failed, using static substitution");
                static_substitute(query)
            }
        }
    }

    /// Rank, truncate, cache, return.
    fn finish(&self, key: String, collected: Vec<Paper>, max_results: usize) -> Vec<Paper> {
        let mut ranked = dedupe_and_rank(collected);
        ranked.truncate(max_results);
        self.cache.insert(key, ranked.clone());
        ranked
    }
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine").field("sources", &self.sources.len()).finish()
    }
}

fn unique_count(papers: &[Paper]) -> usize {
    papers.iter().map(|p| p.id.as_str()).collect::<HashSet<_>>().len()
}

/// Case-insensitive query dedup preserving first occurrence.
fn dedupe_queries(queries: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    queries
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty() && seen.insert(q.to_lowercase()))
        .collect()
}

/// Word-level substitution table for common research terms.
fn static_substitute(query: &str) -> String {
    let mut result = query.to_string();
    for (foreign, english) in STATIC_TRANSLATIONS {
        if result.contains(foreign) {
            result = result.replace(foreign, english);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_queries() {
        let queries = vec![
            "transformer models".to_string(),
            "  Transformer Models ".to_string(),
            "attention".to_string(),
            String::new(),
        ];
        let deduped = dedupe_queries(queries);
        assert_eq!(deduped, vec!["transformer models", "attention"]);
    }

    #[test]
    fn test_static_substitution() {
        assert_eq!(static_substitute("机器学习 survey"), "machine learning survey");
        // Unknown terms pass through unchanged.
        assert_eq!(static_substitute("данные"), "данные");
    }

    #[test]
    fn test_default_options() {
        let options = SearchOptions::default();
        assert_eq!(options.threshold, 5);
        assert!(options.sources.is_none());
    }
}
