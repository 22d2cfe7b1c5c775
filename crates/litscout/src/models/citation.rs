//! Citation map built around a single center paper.

use serde::{Deserialize, Serialize};

use super::Paper;

/// Summary network metrics derived arithmetically from fetched counts.
///
/// These are deliberately cheap approximations over the one-hop
/// neighborhood, not whole-graph bibliometrics.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkMetrics {
    /// Center paper's citation count.
    pub centrality: f64,

    /// citedBy / (citedBy + references); 0 when both are empty.
    pub betweenness: f64,

    /// min(1, citedBy / 100).
    pub clustering: f64,

    /// total / (total * (total - 1) / 2); 0 when total <= 1.
    pub density: f64,

    /// ln(total + 1).
    pub path_length: f64,
}

impl NetworkMetrics {
    /// Compute metrics from the center paper and fetched neighbor counts.
    #[must_use]
    pub fn compute(center_citations: i64, cited_by: usize, references: usize) -> Self {
        let cb = cited_by as f64;
        let rf = references as f64;
        let total = cb + rf;

        let betweenness = if cited_by + references == 0 { 0.0 } else { cb / (cb + rf) };
        let clustering = (cb / 100.0).min(1.0);
        let density = if total <= 1.0 { 0.0 } else { total / (total * (total - 1.0) / 2.0) };
        let path_length = (total + 1.0).ln();

        Self {
            centrality: center_citations as f64,
            betweenness,
            clustering,
            density,
            path_length,
        }
    }
}

/// One-shot, memory-resident exploration of a paper's citation neighborhood.
///
/// All three paper lists are deduplicated by identifier and disjoint from
/// the center paper's identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationMap {
    /// The paper the map is centered on.
    pub center: Paper,

    /// Papers citing the center (bounded to 50).
    pub cited_by: Vec<Paper>,

    /// Papers the center cites (bounded to 50).
    pub references: Vec<Paper>,

    /// Second-hop sample: references of the top cited-by papers (bounded to 30).
    pub indirect: Vec<Paper>,

    /// Derived network metrics.
    pub metrics: NetworkMetrics,
}
