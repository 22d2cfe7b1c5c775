//! Compact JSON output formatting.

use serde_json::{Value, json};

use crate::models::{CitationMap, Paper};

/// Compact JSON view of one paper.
#[must_use]
pub fn compact_paper(paper: &Paper) -> Value {
    json!({
        "id": paper.id,
        "title": paper.title,
        "authors": paper.authors,
        "year": paper.year,
        "citations": paper.citation_count,
        "venue": paper.venue,
        "doi": paper.doi,
        "url": paper.url,
        "source": paper.source,
        "relevanceScore": paper.relevance_score,
        "relevanceTag": paper.relevance_tag,
    })
}

/// Compact JSON view of a citation map.
#[must_use]
pub fn compact_map(map: &CitationMap) -> Value {
    json!({
        "center": compact_paper(&map.center),
        "citedBy": map.cited_by.iter().map(compact_paper).collect::<Vec<_>>(),
        "references": map.references.iter().map(compact_paper).collect::<Vec<_>>(),
        "indirectConnections": map.indirect.iter().map(compact_paper).collect::<Vec<_>>(),
        "networkMetrics": map.metrics,
    })
}
