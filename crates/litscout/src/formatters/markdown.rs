//! Markdown output formatting.

use crate::models::{CitationMap, Paper, RelevanceTag};

/// Format a list of papers as Markdown.
#[must_use]
pub fn format_papers_markdown(papers: &[Paper]) -> String {
    if papers.is_empty() {
        return "No papers found.".to_string();
    }

    let mut output = format!("# Papers ({} results)\n\n", papers.len());
    for (i, paper) in papers.iter().enumerate() {
        output.push_str(&format_paper_markdown(paper, i + 1));
        output.push_str("\n---\n\n");
    }
    output
}

/// Format a single paper as Markdown.
#[must_use]
pub fn format_paper_markdown(paper: &Paper, index: usize) -> String {
    let mut output = format!("## {index}. {}\n\n", paper.title);

    if !paper.authors.is_empty() {
        output.push_str(&format!("**Authors**: {}\n\n", paper.author_names()));
    }

    let mut meta = vec![
        format!("**Year**: {}", paper.year),
        format!("**Citations**: {}", paper.citation_count),
        format!("**Source**: {}", paper.source),
    ];
    if let Some(venue) = &paper.venue {
        meta.push(format!("**Venue**: {venue}"));
    }
    output.push_str(&format!("{}\n\n", meta.join(" | ")));

    if let Some(score) = paper.relevance_score {
        let tag = match paper.relevance_tag {
            Some(RelevanceTag::Relevant) => "relevant",
            _ => "not relevant",
        };
        output.push_str(&format!("**Relevance**: {score}/100 ({tag})"));
        if let Some(reason) = &paper.relevance_reason {
            output.push_str(&format!(" — {reason}"));
        }
        output.push_str("\n\n");
    }

    let mut links = Vec::new();
    if let Some(doi) = &paper.doi {
        links.push(format!("[DOI](https://doi.org/{doi})"));
    }
    if let Some(url) = &paper.url {
        links.push(format!("[Link]({url})"));
    }
    if !links.is_empty() {
        output.push_str(&format!("**Links**: {}\n\n", links.join(" | ")));
    }

    if let Some(abstract_text) = &paper.abstract_text {
        let truncated: String = abstract_text.chars().take(300).collect();
        let ellipsis = if abstract_text.chars().count() > 300 { "..." } else { "" };
        output.push_str(&format!("**Abstract**: {truncated}{ellipsis}\n"));
    }

    output
}

/// Format a citation map as Markdown.
#[must_use]
pub fn format_citation_map_markdown(map: &CitationMap) -> String {
    let mut output = format!(
        "# Citation Map\n\n\
         **Center**: {} ({})\n\
         **Cited by**: {} papers | **References**: {} papers | **Indirect**: {} papers\n\n\
         **Metrics**: centrality {:.0} | betweenness {:.3} | clustering {:.3} | \
         density {:.4} | path length {:.3}\n\n",
        map.center.title,
        map.center.year,
        map.cited_by.len(),
        map.references.len(),
        map.indirect.len(),
        map.metrics.centrality,
        map.metrics.betweenness,
        map.metrics.clustering,
        map.metrics.density,
        map.metrics.path_length,
    );

    for (heading, papers) in [
        ("## Cited By", &map.cited_by),
        ("## References", &map.references),
        ("## Indirect Connections", &map.indirect),
    ] {
        output.push_str(heading);
        output.push('\n');
        if papers.is_empty() {
            output.push_str("\n*None found.*\n\n");
            continue;
        }
        output.push('\n');
        for paper in papers {
            output.push_str(&format!(
                "- {} ({}, {} citations)\n",
                paper.title, paper.year, paper.citation_count
            ));
        }
        output.push('\n');
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NetworkMetrics, SourceTag};

    fn paper(id: &str, citations: i64) -> Paper {
        Paper {
            id: id.into(),
            title: format!("Paper {id}"),
            abstract_text: Some("An abstract.".into()),
            authors: vec!["A. Author".into()],
            year: 2024,
            month: None,
            day: None,
            venue: Some("VenueCon".into()),
            citation_count: citations,
            url: Some("https://example.org".into()),
            doi: Some("10.1/x".into()),
            open_access: Some(true),
            source: SourceTag::Scholar,
            relevance_score: Some(80),
            relevance_reason: Some("On topic".into()),
            relevance_tag: Some(RelevanceTag::Relevant),
        }
    }

    #[test]
    fn test_format_papers() {
        let output = format_papers_markdown(&[paper("a", 10)]);
        assert!(output.contains("Paper a"));
        assert!(output.contains("**Citations**: 10"));
        assert!(output.contains("80/100"));
        assert!(output.contains("doi.org/10.1/x"));
    }

    #[test]
    fn test_format_empty() {
        assert_eq!(format_papers_markdown(&[]), "No papers found.");
    }

    #[test]
    fn test_format_citation_map() {
        let map = CitationMap {
            center: paper("center", 100),
            cited_by: vec![paper("c1", 5)],
            references: Vec::new(),
            indirect: Vec::new(),
            metrics: NetworkMetrics::compute(100, 1, 0),
        };
        let output = format_citation_map_markdown(&map);
        assert!(output.contains("Paper center"));
        assert!(output.contains("## Cited By"));
        assert!(output.contains("*None found.*"));
    }
}
