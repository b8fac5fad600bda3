//! Cursor pagination behaviour against a mock OpenAlex server

use rustopenalex::client::{ClientConfig, OpenAlexClient};
use rustopenalex::fetcher::{self, Query};
use rustopenalex::work;
use rustopenalex::OpenAlexError;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(server: &MockServer, max_retries: u32) -> OpenAlexClient {
    let config = ClientConfig::builder()
        .base_url(server.uri())
        .max_retries(max_retries)
        .backoff(Duration::from_millis(1), Duration::from_millis(4))
        .page_delay(Duration::ZERO)
        .build();
    OpenAlexClient::new(config).unwrap()
}

fn works(n: usize) -> Vec<Value> {
    (1..=n)
        .map(|i| {
            json!({
                "id": format!("https://openalex.org/W{}", i),
                "cited_by_count": i
            })
        })
        .collect()
}

fn cursor_for(page: usize) -> String {
    if page == 0 {
        "*".to_string()
    } else {
        format!("cursor-{}", page)
    }
}

/// Serve `records` in pages of `per_page`, chained by cursor.
async fn mount_pages(server: &MockServer, records: &[Value], per_page: usize) {
    let chunks: Vec<&[Value]> = if records.is_empty() {
        vec![&[] as &[Value]]
    } else {
        records.chunks(per_page).collect()
    };

    for (idx, chunk) in chunks.iter().enumerate() {
        let next = if idx + 1 < chunks.len() {
            json!(cursor_for(idx + 1))
        } else {
            Value::Null
        };

        Mock::given(method("GET"))
            .and(path("/works"))
            .and(query_param("cursor", cursor_for(idx)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "meta": { "count": records.len(), "next_cursor": next },
                "results": chunk
            })))
            .mount(server)
            .await;
    }
}

fn ids(records: &[work::Record]) -> Vec<String> {
    records
        .iter()
        .filter_map(work::id)
        .map(work::short_id)
        .collect()
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap().len()
}

#[tokio::test]
async fn test_fetch_follows_cursor_to_end() {
    let server = MockServer::start().await;
    mount_pages(&server, &works(5), 2).await;

    let client = test_client(&server, 0);
    let query = Query::new("primary_location.source.id:S1")
        .unwrap()
        .per_page(2)
        .unwrap();
    let outcome = fetcher::fetch(&client, &query).await;

    assert!(outcome.is_complete());
    assert_eq!(outcome.pages, 3);
    assert_eq!(ids(&outcome.records), vec!["W1", "W2", "W3", "W4", "W5"]);
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_fetch_spaces_page_requests() {
    let server = MockServer::start().await;
    mount_pages(&server, &works(6), 2).await;

    let config = ClientConfig::builder()
        .base_url(server.uri())
        .max_retries(0)
        .page_delay(Duration::from_millis(50))
        .build();
    let client = OpenAlexClient::new(config).unwrap();
    let query = Query::new("type:article").unwrap().per_page(2).unwrap();

    let started = Instant::now();
    let outcome = fetcher::fetch(&client, &query).await;

    assert!(outcome.is_complete());
    assert_eq!(outcome.pages, 3);
    assert!(started.elapsed() >= Duration::from_millis(100));
}

#[tokio::test]
async fn test_consecutive_fetches_share_throttle() {
    let server = MockServer::start().await;
    mount_pages(&server, &works(1), 200).await;

    let config = ClientConfig::builder()
        .base_url(server.uri())
        .max_retries(0)
        .page_delay(Duration::from_millis(50))
        .build();
    let client = OpenAlexClient::new(config).unwrap();
    let query = Query::new("type:article").unwrap();

    let started = Instant::now();
    for _ in 0..5 {
        let outcome = fetcher::fetch(&client, &query).await;
        assert_eq!(outcome.records.len(), 1);
    }

    assert!(started.elapsed() >= Duration::from_millis(200));
    assert_eq!(request_count(&server).await, 5);
}

#[tokio::test]
async fn test_fetch_sends_query_parameters() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("filter", "authorships.author.id:A5023888391"))
        .and(query_param("per-page", "200"))
        .and(query_param("cursor", "*"))
        .and(query_param("sort", "cited_by_count:desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": { "next_cursor": null },
            "results": works(1)
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server, 0);
    let query = Query::author_works("A5023888391")
        .unwrap()
        .sort("cited_by_count:desc");
    let outcome = fetcher::fetch(&client, &query).await;

    assert!(outcome.is_complete());
    assert_eq!(outcome.records.len(), 1);
}

#[tokio::test]
async fn test_fetch_item_cap_truncates_and_stops() {
    let server = MockServer::start().await;
    mount_pages(&server, &works(10), 2).await;

    let client = test_client(&server, 0);
    let query = Query::new("type:article")
        .unwrap()
        .per_page(2)
        .unwrap()
        .item_cap(3)
        .unwrap();
    let outcome = fetcher::fetch(&client, &query).await;

    assert!(outcome.is_complete());
    assert_eq!(ids(&outcome.records), vec!["W1", "W2", "W3"]);
    assert_eq!(outcome.pages, 2);
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn test_fetch_item_cap_above_total() {
    let server = MockServer::start().await;
    mount_pages(&server, &works(3), 2).await;

    let client = test_client(&server, 0);
    let query = Query::new("type:article")
        .unwrap()
        .per_page(2)
        .unwrap()
        .item_cap(1000)
        .unwrap();
    let outcome = fetcher::fetch(&client, &query).await;

    assert!(outcome.is_complete());
    assert_eq!(outcome.records.len(), 3);
}

#[tokio::test]
async fn test_fetch_recovers_from_transient_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("cursor", cursor_for(1)))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_pages(&server, &works(6), 2).await;

    let client = test_client(&server, 3);
    let query = Query::new("type:article").unwrap().per_page(2).unwrap();
    let outcome = fetcher::fetch(&client, &query).await;

    assert!(outcome.is_complete());
    assert_eq!(ids(&outcome.records), vec!["W1", "W2", "W3", "W4", "W5", "W6"]);
    assert_eq!(outcome.pages, 3);
    assert_eq!(request_count(&server).await, 5);
}

#[tokio::test]
async fn test_fetch_returns_partial_when_retries_exhausted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("cursor", cursor_for(1)))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_pages(&server, &works(6), 2).await;

    let client = test_client(&server, 2);
    let query = Query::new("type:article").unwrap().per_page(2).unwrap();
    let outcome = fetcher::fetch(&client, &query).await;

    assert!(!outcome.is_complete());
    assert_eq!(ids(&outcome.records), vec!["W1", "W2"]);
    assert_eq!(outcome.pages, 1);
    assert!(matches!(
        outcome.failure,
        Some(OpenAlexError::Api { code: 500, .. })
    ));
    // one first page, then the first try plus two retries of page two
    assert_eq!(request_count(&server).await, 4);
}

#[tokio::test]
async fn test_fetch_stops_on_non_retryable_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("cursor", cursor_for(2)))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;
    mount_pages(&server, &works(8), 2).await;

    let client = test_client(&server, 5);
    let query = Query::new("type:article").unwrap().per_page(2).unwrap();
    let outcome = fetcher::fetch(&client, &query).await;

    assert_eq!(ids(&outcome.records), vec!["W1", "W2", "W3", "W4"]);
    assert!(matches!(
        outcome.failure,
        Some(OpenAlexError::Api { code: 404, .. })
    ));
    assert_eq!(request_count(&server).await, 3);

    let err = outcome.into_result().unwrap_err();
    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn test_fetch_empty_result_set() {
    let server = MockServer::start().await;
    mount_pages(&server, &[], 200).await;

    let client = test_client(&server, 0);
    let query = Query::new("primary_location.source.id:S0").unwrap();
    let outcome = fetcher::fetch(&client, &query).await;

    assert!(outcome.is_complete());
    assert!(outcome.records.is_empty());
    assert_eq!(outcome.pages, 1);
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_fetch_malformed_page_keeps_prior_records() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("cursor", "*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": { "next_cursor": "cursor-1" },
            "results": works(2)
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("cursor", "cursor-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": { "next_cursor": "cursor-2" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server, 3);
    let query = Query::new("type:article").unwrap().per_page(2).unwrap();
    let outcome = fetcher::fetch(&client, &query).await;

    assert_eq!(outcome.records.len(), 2);
    assert!(matches!(outcome.failure, Some(OpenAlexError::Parse(_))));
}

#[tokio::test]
async fn test_fetch_cited_by_list_url() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("filter", "cites:W2741809807"))
        .and(query_param("select", "id,publication_year"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": { "next_cursor": "" },
            "results": [{ "id": "https://openalex.org/W9", "publication_year": 2020 }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server, 0);
    let query = Query::from_list_url("https://api.openalex.org/works?filter=cites:W2741809807")
        .unwrap()
        .select("id,publication_year");
    let outcome = fetcher::fetch(&client, &query).await;

    assert!(outcome.is_complete());
    assert_eq!(ids(&outcome.records), vec!["W9"]);
}
