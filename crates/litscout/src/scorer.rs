//! Relevance scoring via the text-generation capability.
//!
//! Candidates go to the generator in batches of 20 with a structured-JSON
//! prompt. A batch whose response cannot be parsed falls back to a neutral
//! default for every paper in it (score 50, not relevant) rather than
//! aborting the request.

use std::sync::Arc;

use chrono::Duration;
use serde::Deserialize;

use crate::cache::{ResultCache, cache_key};
use crate::clock::Clock;
use crate::config::engine;
use crate::error::{EngineError, EngineResult};
use crate::genai::{TextGenerator, extract_json};
use crate::models::{Paper, RelevanceTag};

/// Neutral score assigned when a batch cannot be scored.
const NEUTRAL_SCORE: u8 = 50;

/// One judgment as the model returns it.
#[derive(Debug, Deserialize)]
struct Judgment {
    index: usize,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    relevant: Option<bool>,
}

/// Scores candidate papers against a topic.
pub struct RelevanceScorer {
    genai: Arc<dyn TextGenerator>,
    cache: ResultCache<Vec<Paper>>,
}

impl RelevanceScorer {
    /// Create a scorer backed by the given generator.
    #[must_use]
    pub fn new(genai: Arc<dyn TextGenerator>, clock: Arc<dyn Clock>) -> Self {
        Self { genai, cache: ResultCache::new(Duration::hours(24), clock) }
    }

    /// Annotate every paper with a relevance score, justification, and tag,
    /// returning the set sorted by score descending (batch order otherwise
    /// preserved).
    ///
    /// # Errors
    ///
    /// `AllCredentialsExhausted` when no generation credential is usable;
    /// any other failure degrades that batch to neutral defaults.
    pub async fn score(&self, topic: &str, papers: Vec<Paper>) -> EngineResult<Vec<Paper>> {
        if papers.is_empty() {
            return Ok(papers);
        }

        let ids: Vec<&str> = papers.iter().map(|p| p.id.as_str()).collect();
        let key = cache_key(&["score", topic, &ids.join(",")]);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let mut scored = Vec::with_capacity(papers.len());
        for batch in papers.chunks(engine::SCORE_BATCH) {
            scored.extend(self.score_batch(topic, batch).await?);
        }

        // Stable sort keeps batch order for equal scores.
        scored.sort_by(|a: &Paper, b: &Paper| b.score().cmp(&a.score()));
        self.cache.insert(key, scored.clone());
        Ok(scored)
    }

    async fn score_batch(&self, topic: &str, batch: &[Paper]) -> EngineResult<Vec<Paper>> {
        let judgments = match self.genai.generate(&build_prompt(topic, batch)).await {
            Ok(raw) => parse_judgments(&raw, batch.len()),
            Err(err @ EngineError::AllCredentialsExhausted { .. }) => return Err(err),
            Err(err) => {
                tracing::warn!(error = %err, "batch scoring call failed");
                None
            }
        };

        let mut papers: Vec<Paper> = batch.to_vec();
        match judgments {
            Some(judgments) => {
                for judgment in judgments {
                    if let Some(paper) = papers.get_mut(judgment.index) {
                        let score = judgment.score.unwrap_or(f64::from(NEUTRAL_SCORE));
                        paper.relevance_score = Some(score.clamp(0.0, 100.0).round() as u8);
                        paper.relevance_reason = judgment.reason;
                        paper.relevance_tag = Some(if judgment.relevant.unwrap_or(false) {
                            RelevanceTag::Relevant
                        } else {
                            RelevanceTag::NotRelevant
                        });
                    }
                }
                // Papers the model skipped get the neutral default too.
                for paper in papers.iter_mut().filter(|p| p.relevance_score.is_none()) {
                    apply_neutral(paper);
                }
            }
            None => {
                tracing::warn!(batch_size = papers.len(), "unparseable scoring output, applying neutral defaults");
                for paper in &mut papers {
                    apply_neutral(paper);
                }
            }
        }
        Ok(papers)
    }
}

impl std::fmt::Debug for RelevanceScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelevanceScorer").field("cached_sets", &self.cache.len()).finish()
    }
}

fn apply_neutral(paper: &mut Paper) {
    paper.relevance_score = Some(NEUTRAL_SCORE);
    paper.relevance_tag = Some(RelevanceTag::NotRelevant);
    paper.relevance_reason =
        Some("Automatic scoring failed for this batch; neutral default applied.".to_string());
}

fn build_prompt(topic: &str, batch: &[Paper]) -> String {
    let mut prompt = format!(
        "Judge how relevant each paper is to the research topic \"{topic}\".\n\
         For every paper respond with an object {{\"index\": n, \"score\": 0-100, \
         \"reason\": short string, \"relevant\": true|false}}.\n\
         Respond with ONLY a JSON array covering every index.\n\nPapers:\n"
    );
    for (i, paper) in batch.iter().enumerate() {
        prompt.push_str(&format!("{i}. {} ({})\n", paper.title, paper.year));
        if let Some(ref abstract_text) = paper.abstract_text {
            let short: String = abstract_text.chars().take(400).collect();
            prompt.push_str(&format!("   {short}\n"));
        }
    }
    prompt
}

fn parse_judgments(raw: &str, batch_len: usize) -> Option<Vec<Judgment>> {
    let value = extract_json(raw)?;
    let items = value.as_array()?;
    let judgments: Vec<Judgment> = items
        .iter()
        .filter_map(|item| serde_json::from_value(item.clone()).ok())
        .filter(|j: &Judgment| j.index < batch_len)
        .collect();
    if judgments.is_empty() { None } else { Some(judgments) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::SourceTag;
    use chrono::Utc;

    struct StubGenerator {
        response: String,
    }

    #[async_trait::async_trait]
    impl TextGenerator for StubGenerator {
        async fn generate(&self, _prompt: &str) -> EngineResult<String> {
            Ok(self.response.clone())
        }
    }

    fn paper(id: &str) -> Paper {
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
            doi: None,
            open_access: None,
            source: SourceTag::Scholar,
            relevance_score: None,
            relevance_reason: None,
            relevance_tag: None,
        }
    }

    fn scorer_with(response: &str) -> RelevanceScorer {
        RelevanceScorer::new(
            Arc::new(StubGenerator { response: response.to_string() }),
            Arc::new(ManualClock::new(Utc::now())),
        )
    }

    #[tokio::test]
    async fn test_valid_judgments_applied_and_sorted() {
        let response = r#"[
            {"index": 0, "score": 30, "reason": "tangential", "relevant": false},
            {"index": 1, "score": 95, "reason": "directly on topic", "relevant": true}
        ]"#;
        let scorer = scorer_with(response);
        let scored =
            scorer.score("topic", vec![paper("a"), paper("b")]).await.unwrap();

        assert_eq!(scored[0].id, "b");
        assert_eq!(scored[0].relevance_score, Some(95));
        assert_eq!(scored[0].relevance_tag, Some(RelevanceTag::Relevant));
        assert_eq!(scored[1].id, "a");
        assert_eq!(scored[1].relevance_score, Some(30));
    }

    #[tokio::test]
    async fn test_non_json_batch_gets_neutral_defaults() {
        let scorer = scorer_with("I'd be happy to help, but...");
        let scored =
            scorer.score("topic", vec![paper("a"), paper("b")]).await.unwrap();

        for paper in &scored {
            assert_eq!(paper.relevance_score, Some(50));
            assert_eq!(paper.relevance_tag, Some(RelevanceTag::NotRelevant));
            assert!(paper.relevance_reason.as_deref().unwrap().contains("scoring failed"));
        }
    }

    #[tokio::test]
    async fn test_skipped_indices_get_neutral_default() {
        let response = r#"[{"index": 0, "score": 80, "reason": "good", "relevant": true}]"#;
        let scorer = scorer_with(response);
        let scored =
            scorer.score("topic", vec![paper("a"), paper("b")]).await.unwrap();

        assert_eq!(scored[0].relevance_score, Some(80));
        assert_eq!(scored[1].relevance_score, Some(50));
    }

    #[tokio::test]
    async fn test_out_of_range_scores_clamped() {
        let response = r#"[
            {"index": 0, "score": 150, "reason": "x", "relevant": true},
            {"index": 1, "score": -10, "reason": "y", "relevant": false}
        ]"#;
        let scorer = scorer_with(response);
        let scored =
            scorer.score("topic", vec![paper("a"), paper("b")]).await.unwrap();
        assert_eq!(scored[0].relevance_score, Some(100));
        assert_eq!(scored[1].relevance_score, Some(0));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let scorer = scorer_with("[]");
        let scored = scorer.score("topic", Vec::new()).await.unwrap();
        assert!(scored.is_empty());
    }
}
