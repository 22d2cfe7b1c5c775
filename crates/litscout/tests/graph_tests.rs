//! Mock-based tests for the citation graph builder.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use litscout::clock::SystemClock;
use litscout::sources::ScholarClient;
use litscout::{CitationGraphBuilder, Config, EngineError};

fn builder_for(mock_server: &MockServer) -> CitationGraphBuilder {
    let config = Config::for_testing(&mock_server.uri());
    let clock = Arc::new(SystemClock);
    let scholar = Arc::new(ScholarClient::new(&config, clock.clone()).unwrap());
    CitationGraphBuilder::new(scholar, clock)
}

fn paper_json(id: &str, title: &str, citations: i64) -> serde_json::Value {
    json!({
        "paperId": id,
        "title": title,
        "year": 2020,
        "citationCount": citations,
        "venue": "Test Venue",
        "authors": [{"authorId": "1", "name": "Author"}]
    })
}

async fn mount_paper(mock_server: &MockServer, id: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/graph/v1/paper/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(mock_server)
        .await;
}

async fn mount_edges(
    mock_server: &MockServer,
    id: &str,
    endpoint: &str,
    edge_field: &str,
    papers: Vec<serde_json::Value>,
) {
    let data: Vec<_> = papers.into_iter().map(|p| json!({edge_field: p})).collect();
    Mock::given(method("GET"))
        .and(path(format!("/graph/v1/paper/{id}/{endpoint}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": data})))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_degenerate_map_has_zero_metrics() {
    let mock_server = MockServer::start().await;
    mount_paper(&mock_server, "lonely", paper_json("lonely", "Uncited Paper", 42)).await;
    mount_edges(&mock_server, "lonely", "citations", "citingPaper", vec![]).await;
    mount_edges(&mock_server, "lonely", "references", "citedPaper", vec![]).await;

    let builder = builder_for(&mock_server);
    let map = builder.build_map("lonely").await.unwrap();

    assert!(map.cited_by.is_empty());
    assert!(map.references.is_empty());
    assert!(map.indirect.is_empty());
    assert!((map.metrics.centrality - 42.0).abs() < f64::EPSILON);
    assert!(map.metrics.betweenness.abs() < f64::EPSILON);
    assert!(map.metrics.clustering.abs() < f64::EPSILON);
    assert!(map.metrics.density.abs() < f64::EPSILON);
    assert!(map.metrics.path_length.abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_full_map_with_indirect_connections() {
    let mock_server = MockServer::start().await;
    mount_paper(&mock_server, "center", paper_json("center", "Center Paper", 100)).await;
    mount_edges(
        &mock_server,
        "center",
        "citations",
        "citingPaper",
        vec![paper_json("c1", "Citing One", 50), paper_json("c2", "Citing Two", 10)],
    )
    .await;
    mount_edges(
        &mock_server,
        "center",
        "references",
        "citedPaper",
        vec![paper_json("r1", "Reference One", 5)],
    )
    .await;
    // Second hop: references of the top cited-by papers.
    mount_edges(
        &mock_server,
        "c1",
        "references",
        "citedPaper",
        vec![paper_json("i1", "Indirect One", 3), paper_json("r1", "Reference One", 5)],
    )
    .await;
    mount_edges(&mock_server, "c2", "references", "citedPaper", vec![]).await;

    let builder = builder_for(&mock_server);
    let map = builder.build_map("center").await.unwrap();

    assert_eq!(map.center.id, "center");
    assert_eq!(map.cited_by.len(), 2);
    // Ranked by citation count descending.
    assert_eq!(map.cited_by[0].id, "c1");
    assert_eq!(map.references.len(), 1);
    // "r1" already appears in references, so only "i1" is indirect.
    assert_eq!(map.indirect.len(), 1);
    assert_eq!(map.indirect[0].id, "i1");

    assert!((map.metrics.centrality - 100.0).abs() < f64::EPSILON);
    assert!((map.metrics.betweenness - 2.0 / 3.0).abs() < 1e-9);
    assert!((map.metrics.clustering - 0.02).abs() < 1e-9);
}

#[tokio::test]
async fn test_doi_resolution_falls_back_to_search() {
    let mock_server = MockServer::start().await;
    let doi = "10.1038/nature12373";

    // Direct and DOI-typed lookups both miss; wiremock answers 404 for
    // unmatched paths, covering them.
    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {
                    "paperId": "resolved",
                    "title": "The Right Paper",
                    "year": 2013,
                    "citationCount": 7,
                    "externalIds": {"DOI": doi}
                },
                paper_json("wrong", "Wrong Paper", 1),
            ]
        })))
        .mount(&mock_server)
        .await;
    mount_edges(&mock_server, "resolved", "citations", "citingPaper", vec![]).await;
    mount_edges(&mock_server, "resolved", "references", "citedPaper", vec![]).await;

    let builder = builder_for(&mock_server);
    let map = builder.build_map(doi).await.unwrap();

    assert_eq!(map.center.id, "resolved");
    assert_eq!(map.center.doi.as_deref(), Some(doi));
}

#[tokio::test]
async fn test_unresolvable_id_is_paper_not_found() {
    let mock_server = MockServer::start().await;
    // Nothing mounted: every lookup misses.

    let builder = builder_for(&mock_server);
    match builder.build_map("does-not-exist").await {
        Err(EngineError::PaperNotFound { query }) => assert_eq!(query, "does-not-exist"),
        other => panic!("expected PaperNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_neighbor_fetch_failure_degrades_to_empty() {
    let mock_server = MockServer::start().await;
    mount_paper(&mock_server, "center", paper_json("center", "Center Paper", 9)).await;
    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/center/citations"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "bad field"})))
        .mount(&mock_server)
        .await;
    mount_edges(
        &mock_server,
        "center",
        "references",
        "citedPaper",
        vec![paper_json("r1", "Reference One", 2)],
    )
    .await;

    let builder = builder_for(&mock_server);
    let map = builder.build_map("center").await.unwrap();

    // Partial data beats a failed request.
    assert!(map.cited_by.is_empty());
    assert_eq!(map.references.len(), 1);
}
