//! Data models for the discovery engine.
//!
//! All models use `#[serde(default)]` for optional fields and
//! `rename_all = "camelCase"` where the wire format uses camelCase.

mod citation;
mod paper;
mod plan;

pub use citation::{CitationMap, NetworkMetrics};
pub use paper::{Paper, RelevanceTag, SourceTag, is_boilerplate_title, parse_publication_date};
pub use plan::{PlanFilters, SearchPlan};
