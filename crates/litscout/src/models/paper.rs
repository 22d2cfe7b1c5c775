//! Canonical paper entity produced by every source adapter.

use serde::{Deserialize, Serialize};

/// Which external source a paper came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    /// Graph-oriented bibliographic API.
    Scholar,
    /// Biomedical literature API.
    PubMed,
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scholar => write!(f, "scholar"),
            Self::PubMed => write!(f, "pubmed"),
        }
    }
}

/// Binary relevance judgment assigned by the scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceTag {
    /// Judged relevant to the topic.
    Relevant,
    /// Judged not relevant (also the neutral fallback).
    NotRelevant,
}

/// A research paper in canonical form.
///
/// Every source adapter maps its own record shape into this entity; after
/// deduplication the `id` is unique within a result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paper {
    /// Stable identifier from the originating source.
    pub id: String,

    /// Paper title.
    pub title: String,

    /// Abstract, when the source provides one.
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,

    /// Author names.
    #[serde(default)]
    pub authors: Vec<String>,

    /// Publication year. Defaults to the current year when the source date
    /// is unparseable, so sort/filter operations stay total.
    pub year: i32,

    /// Publication month (1-12) when parseable.
    #[serde(default)]
    pub month: Option<u32>,

    /// Publication day (1-31) when parseable.
    #[serde(default)]
    pub day: Option<u32>,

    /// Journal or conference venue.
    #[serde(default)]
    pub venue: Option<String>,

    /// Citation count (0 when the source has no such field).
    #[serde(default)]
    pub citation_count: i64,

    /// Canonical URL for the paper.
    #[serde(default)]
    pub url: Option<String>,

    /// Digital Object Identifier.
    #[serde(default)]
    pub doi: Option<String>,

    /// Whether an open-access version exists, when known.
    #[serde(default)]
    pub open_access: Option<bool>,

    /// Originating source.
    pub source: SourceTag,

    /// Relevance score in [0, 100], set by the scorer.
    #[serde(default)]
    pub relevance_score: Option<u8>,

    /// Short justification for the relevance score.
    #[serde(default)]
    pub relevance_reason: Option<String>,

    /// Binary relevance tag.
    #[serde(default)]
    pub relevance_tag: Option<RelevanceTag>,
}

impl Paper {
    /// Citation count accessor, kept for parity with older call sites.
    #[must_use]
    pub const fn citations(&self) -> i64 {
        self.citation_count
    }

    /// Relevance score or 0 when unscored.
    #[must_use]
    pub fn score(&self) -> u8 {
        self.relevance_score.unwrap_or(0)
    }

    /// Author names as a comma-separated string.
    #[must_use]
    pub fn author_names(&self) -> String {
        self.authors.join(", ")
    }
}

/// Month-name lookup for loosely formatted biomedical dates ("2023 Jan 15").
const MONTHS: &[(&str, u32)] = &[
    ("jan", 1),
    ("feb", 2),
    ("mar", 3),
    ("apr", 4),
    ("may", 5),
    ("jun", 6),
    ("jul", 7),
    ("aug", 8),
    ("sep", 9),
    ("oct", 10),
    ("nov", 11),
    ("dec", 12),
];

/// Best-effort parse of a source-specific date string.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM`, `YYYY`, and the `"2023 Jan 15"` /
/// `"2023 Jan"` forms used by biomedical summaries. Returns
/// `(year, month, day)` with `fallback_year` when no year can be recovered.
#[must_use]
pub fn parse_publication_date(raw: &str, fallback_year: i32) -> (i32, Option<u32>, Option<u32>) {
    let raw = raw.trim();
    if raw.is_empty() {
        return (fallback_year, None, None);
    }

    // ISO-ish: split on '-' and take what parses.
    if raw.contains('-') {
        let mut parts = raw.splitn(3, '-');
        let year = parts.next().and_then(|p| p.parse::<i32>().ok());
        let month = parts.next().and_then(|p| p.parse::<u32>().ok()).filter(|m| (1..=12).contains(m));
        let day = parts.next().and_then(|p| {
            // Tolerate trailing time components ("2023-01-15T00:00:00Z").
            p.split(|c: char| !c.is_ascii_digit()).next().and_then(|d| d.parse::<u32>().ok())
        });
        if let Some(year) = year {
            return (year, month, day.filter(|d| (1..=31).contains(d)));
        }
        return (fallback_year, None, None);
    }

    // Loose form: "2023 Jan 15", "2023 Jan", "2023".
    let mut parts = raw.split_whitespace();
    let year = parts.next().and_then(|p| p.parse::<i32>().ok());
    let Some(year) = year else {
        return (fallback_year, None, None);
    };
    let month = parts.next().and_then(|p| {
        let lower = p.to_ascii_lowercase();
        MONTHS.iter().find(|(name, _)| lower.starts_with(name)).map(|(_, n)| *n)
    });
    let day = parts
        .next()
        .and_then(|p| p.parse::<u32>().ok())
        .filter(|d| (1..=31).contains(d) && month.is_some());
    (year, month, day)
}

/// Whether a title is missing or boilerplate and the record should be dropped.
#[must_use]
pub fn is_boilerplate_title(title: &str) -> bool {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return true;
    }
    let lower = trimmed.to_ascii_lowercase();
    matches!(lower.as_str(), "untitled" | "[no title]" | "no title" | "n/a" | "unknown")
}
