//! Query planner: turns a free-text topic into a structured search plan.

use std::sync::Arc;

use chrono::Duration;

use crate::cache::{ResultCache, cache_key};
use crate::clock::Clock;
use crate::error::{EngineError, EngineResult};
use crate::genai::{TextGenerator, extract_json};
use crate::models::SearchPlan;

/// Derives a [`SearchPlan`] from a topic via the text-generation capability.
///
/// Plans are cached for 24 hours per topic. A malformed generation response
/// degrades to [`SearchPlan::fallback`]; only credential exhaustion is
/// surfaced to the caller.
pub struct QueryPlanner {
    genai: Arc<dyn TextGenerator>,
    cache: ResultCache<SearchPlan>,
}

impl QueryPlanner {
    /// Create a planner backed by the given generator.
    #[must_use]
    pub fn new(genai: Arc<dyn TextGenerator>, clock: Arc<dyn Clock>) -> Self {
        Self { genai, cache: ResultCache::new(Duration::hours(24), clock) }
    }

    /// Generate (or recall) the plan for a topic.
    ///
    /// # Errors
    ///
    /// `AllCredentialsExhausted` when no generation credential is usable;
    /// every other failure degrades to the fallback plan.
    pub async fn plan(&self, topic: &str) -> EngineResult<SearchPlan> {
        let key = cache_key(&["plan", topic]);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let plan = match self.genai.generate(&build_prompt(topic)).await {
            Ok(raw) => parse_plan(&raw).unwrap_or_else(|| {
                tracing::warn!(topic, "unparseable plan output, using fallback plan");
                SearchPlan::fallback(topic)
            }),
            Err(err @ EngineError::AllCredentialsExhausted { .. }) => return Err(err),
            Err(err) => {
                tracing::warn!(topic, error = %err, "plan generation failed, using fallback plan");
                SearchPlan::fallback(topic)
            }
        };

        self.cache.insert(key, plan.clone());
        Ok(plan)
    }
}

impl std::fmt::Debug for QueryPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryPlanner").field("cached_plans", &self.cache.len()).finish()
    }
}

fn build_prompt(topic: &str) -> String {
    format!(
        "You are a research librarian planning a literature search.\n\
         Topic: {topic}\n\n\
         Respond with ONLY a JSON object, no prose, using exactly these keys:\n\
         {{\n\
           \"target\": string,\n\
           \"focusTags\": [string],\n\
           \"coreKeywords\": [string]  // required terms, most important first,\n\
           \"supportingKeywords\": [string],\n\
           \"excludeKeywords\": [string],\n\
           \"recommendedQueries\": [string]  // 3-5 ready-to-run queries,\n\
           \"recommendedSources\": [\"scholar\" | \"pubmed\"],\n\
           \"filters\": {{\"minCitations\": number|null, \"yearStart\": number|null, \"yearEnd\": number|null}},\n\
           \"reasoning\": string,\n\
           \"intent\": string  // one line,\n\
           \"confidence\": number  // 0 to 1\n\
         }}"
    )
}

fn parse_plan(raw: &str) -> Option<SearchPlan> {
    let value = extract_json(raw)?;
    let mut plan: SearchPlan = serde_json::from_value(value).ok()?;
    plan.normalize();
    if plan.core_keywords.is_empty() && plan.recommended_queries.is_empty() {
        return None;
    }
    Some(plan)
}
