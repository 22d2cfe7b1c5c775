//! Output formatting for paper lists and citation maps.

mod json;
mod markdown;

pub use json::{compact_map, compact_paper};
pub use markdown::{format_citation_map_markdown, format_papers_markdown};

use serde::{Deserialize, Serialize};

/// Output format selected by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Human-readable Markdown.
    #[default]
    Markdown,
    /// Compact JSON.
    Json,
}
