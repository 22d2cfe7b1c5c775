//! Deduplication and citation-count ranking.

use std::collections::HashSet;

use crate::models::Paper;

/// Remove papers whose identifier already appeared earlier in the list
/// (first occurrence wins), then sort by citation count descending.
///
/// Pure and idempotent: applying it twice yields the same result as once.
/// The sort is stable, so equal-citation papers keep their relative order.
#[must_use]
pub fn dedupe_and_rank(papers: Vec<Paper>) -> Vec<Paper> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Paper> =
        papers.into_iter().filter(|p| seen.insert(p.id.clone())).collect();
    unique.sort_by(|a, b| b.citation_count.cmp(&a.citation_count));
    unique
}
