//! Search plan derived from a free-text research topic.

use serde::{Deserialize, Serialize};

use super::SourceTag;

/// Result filters recommended by the planner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanFilters {
    /// Minimum citation count.
    #[serde(default)]
    pub min_citations: Option<i64>,

    /// Earliest publication year.
    #[serde(default)]
    pub year_start: Option<i32>,

    /// Latest publication year.
    #[serde(default)]
    pub year_end: Option<i32>,
}

/// Structured keyword/query strategy for one topic.
///
/// Generated once per topic and consumed read-only by the orchestrator;
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPlan {
    /// What the search is primarily after.
    #[serde(default)]
    pub target: String,

    /// Research-focus tags.
    #[serde(default)]
    pub focus_tags: Vec<String>,

    /// Required terms, ordered most to least important.
    #[serde(default)]
    pub core_keywords: Vec<String>,

    /// Optional broadening terms.
    #[serde(default)]
    pub supporting_keywords: Vec<String>,

    /// Terms to exclude.
    #[serde(default)]
    pub exclude_keywords: Vec<String>,

    /// Ready-to-run queries.
    #[serde(default)]
    pub recommended_queries: Vec<String>,

    /// Sources the planner considers most promising.
    #[serde(default)]
    pub recommended_sources: Vec<SourceTag>,

    /// Result filters.
    #[serde(default)]
    pub filters: PlanFilters,

    /// Why the plan looks the way it does.
    #[serde(default)]
    pub reasoning: String,

    /// One-line intent summary.
    #[serde(default)]
    pub intent: String,

    /// Planner confidence in [0, 1].
    #[serde(default)]
    pub confidence: f64,
}

impl SearchPlan {
    /// Degraded plan used when the text-generation response cannot be parsed:
    /// the topic split into keywords, the topic itself as the only query.
    #[must_use]
    pub fn fallback(topic: &str) -> Self {
        let keywords: Vec<String> = topic
            .split_whitespace()
            .filter(|w| w.len() > 3)
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .filter(|w| !w.is_empty())
            .collect();
        Self {
            target: topic.to_string(),
            focus_tags: Vec::new(),
            core_keywords: keywords,
            supporting_keywords: Vec::new(),
            exclude_keywords: Vec::new(),
            recommended_queries: vec![topic.to_string()],
            recommended_sources: vec![SourceTag::Scholar, SourceTag::PubMed],
            filters: PlanFilters::default(),
            reasoning: "Plan generation unavailable; derived keywords directly from the topic."
                .to_string(),
            intent: topic.to_string(),
            confidence: 0.2,
        }
    }

    /// Clamp confidence into [0, 1] after deserializing model output.
    pub fn normalize(&mut self) {
        if !self.confidence.is_finite() {
            self.confidence = 0.0;
        }
        self.confidence = self.confidence.clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_model_output() {
        let json = r#"{
            "target": "transformer efficiency",
            "focusTags": ["nlp", "efficiency"],
            "coreKeywords": ["transformer", "efficient", "attention"],
            "supportingKeywords": ["sparse"],
            "excludeKeywords": ["vision"],
            "recommendedQueries": ["efficient transformer attention"],
            "recommendedSources": ["scholar"],
            "filters": {"minCitations": 10, "yearStart": 2020},
            "reasoning": "Focus on efficiency work.",
            "intent": "Find efficient attention papers",
            "confidence": 0.85
        }"#;

        let plan: SearchPlan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.core_keywords.len(), 3);
        assert_eq!(plan.recommended_sources, vec![SourceTag::Scholar]);
        assert_eq!(plan.filters.min_citations, Some(10));
        assert!((plan.confidence - 0.85).abs() < f64::EPSILON);
    }

    #[test]
    fn test_deserialize_partial_output() {
        // Models often omit fields; everything defaults.
        let plan: SearchPlan = serde_json::from_str(r#"{"coreKeywords": ["a"]}"#).unwrap();
        assert_eq!(plan.core_keywords, vec!["a"]);
        assert!(plan.recommended_queries.is_empty());
    }

    #[test]
    fn test_normalize_clamps_confidence() {
        let mut plan = SearchPlan::fallback("x");
        plan.confidence = 3.5;
        plan.normalize();
        assert!((plan.confidence - 1.0).abs() < f64::EPSILON);

        plan.confidence = -0.5;
        plan.normalize();
        assert!(plan.confidence.abs() < f64::EPSILON);

        plan.confidence = f64::NAN;
        plan.normalize();
        assert!(plan.confidence.abs() < f64::EPSILON);
    }

    #[test]
    fn test_fallback_plan() {
        let plan = SearchPlan::fallback("graph neural networks for drug discovery");
        assert!(plan.core_keywords.contains(&"graph".to_string()));
        assert!(plan.core_keywords.contains(&"discovery".to_string()));
        // Short words filtered out.
        assert!(!plan.core_keywords.contains(&"for".to_string()));
        assert_eq!(plan.recommended_queries.len(), 1);
        assert!(plan.confidence < 0.5);
    }
}
