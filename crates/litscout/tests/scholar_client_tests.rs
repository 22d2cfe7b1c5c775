//! Mock-based tests for the graph-oriented bibliographic client.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use litscout::clock::SystemClock;
use litscout::error::ApiError;
use litscout::sources::{ScholarClient, SourceAdapter};
use litscout::{Config, models::SourceTag};

fn client_for(mock_server: &MockServer) -> ScholarClient {
    let config = Config::for_testing(&mock_server.uri());
    ScholarClient::new(&config, Arc::new(SystemClock)).unwrap()
}

fn client_with_key(mock_server: &MockServer, key: &str) -> ScholarClient {
    let mut config = Config::for_testing(&mock_server.uri());
    config.scholar_api_key = Some(key.to_string());
    ScholarClient::new(&config, Arc::new(SystemClock)).unwrap()
}

fn sample_paper_json(id: &str, title: &str, citations: i64) -> serde_json::Value {
    json!({
        "paperId": id,
        "title": title,
        "abstract": format!("Abstract for {title}"),
        "year": 2023,
        "publicationDate": "2023-03-10",
        "citationCount": citations,
        "venue": "Test Conference",
        "url": format!("https://example.org/{id}"),
        "externalIds": {"DOI": format!("10.1234/{id}")},
        "isOpenAccess": true,
        "authors": [{"authorId": "1", "name": "Test Author"}]
    })
}

#[tokio::test]
async fn test_search_maps_records() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/search"))
        .and(query_param("query", "machine learning"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 2,
            "data": [
                sample_paper_json("p1", "ML Paper One", 100),
                sample_paper_json("p2", "ML Paper Two", 50),
            ]
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let papers = client.search_papers("machine learning", 10).await.unwrap();

    assert_eq!(papers.len(), 2);
    assert_eq!(papers[0].id, "p1");
    assert_eq!(papers[0].year, 2023);
    assert_eq!(papers[0].month, Some(3));
    assert_eq!(papers[0].citation_count, 100);
    assert_eq!(papers[0].doi.as_deref(), Some("10.1234/p1"));
    assert_eq!(papers[0].source, SourceTag::Scholar);
}

#[tokio::test]
async fn test_search_drops_invalid_records() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                sample_paper_json("good", "A Real Paper", 10),
                {"title": "No identifier"},
                {"paperId": "boilerplate", "title": "[No Title]"},
            ]
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let papers = client.search_papers("anything", 10).await.unwrap();

    assert_eq!(papers.len(), 1);
    assert_eq!(papers[0].id, "good");
}

#[tokio::test]
async fn test_get_paper_not_found_is_none() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/missing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"error": "Paper not found"})),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    assert!(client.get_paper("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_bad_request_surfaces_upstream_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/search"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "Unrecognized field"})),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    match client.search_papers("q", 10).await {
        Err(ApiError::BadRequest { message }) => assert_eq!(message, "Unrecognized field"),
        other => panic!("expected BadRequest, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rejected_key_falls_back_to_anonymous() {
    let mock_server = MockServer::start().await;

    // The keyed request is rejected; the anonymous retry succeeds.
    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/search"))
        .and(header("x-api-key", "bad-key"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"error": "Forbidden"})))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [sample_paper_json("p1", "Anonymous Result", 5)]
        })))
        .mount(&mock_server)
        .await;

    let client = client_with_key(&mock_server, "bad-key");
    let papers = client.search_papers("q", 10).await.unwrap();
    assert_eq!(papers.len(), 1);
    assert_eq!(papers[0].title, "Anonymous Result");
}

#[tokio::test]
async fn test_citations_and_references_edges() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/p1/citations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"citingPaper": sample_paper_json("c1", "Citing Paper", 7)},
                {"citingPaper": null},
            ]
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/p1/references"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"citedPaper": sample_paper_json("r1", "Referenced Paper", 3)},
            ]
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);

    let citations = client.get_citations("p1", 100).await.unwrap();
    assert_eq!(citations.len(), 1);
    assert_eq!(citations[0].id, "c1");

    let references = client.get_references("p1", 100).await.unwrap();
    assert_eq!(references.len(), 1);
    assert_eq!(references[0].id, "r1");
}

#[tokio::test]
async fn test_source_adapter_surface() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    assert_eq!(client.name(), SourceTag::Scholar);
    let papers = client.search("nothing here", 10).await.unwrap();
    assert!(papers.is_empty());
}
