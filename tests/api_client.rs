//! HTTP layer against a mock activity API.

use cluster_dashboard::views::analyses::{ShortestPathOutcome, SHORTEST_PATH_FAILED};
use cluster_dashboard::{
    ApiClient, DashboardConfig, DashboardError, DataFetcher, Page, PageStatus, QueryParams,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ApiClient {
    let mut config = DashboardConfig::default();
    config.api_base_url = format!("{}/api", server.uri());
    ApiClient::new(&config).unwrap()
}

fn activity(date: &str, kind: &str, size: u32) -> serde_json::Value {
    json!({
        "Date": date,
        "ActivityType": kind,
        "ActivitySize": size,
        "Sequence": [],
        "ParticipantIDs": "p1,p2",
        "ParticipantNames": "Ana,Ben",
        "ParticipantRoles": "Tutor,Participant"
    })
}

#[tokio::test]
async fn test_server_error_fails_page_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/unified-data"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = DataFetcher::unified_data(client_for(&server), &QueryParams::default());
    let state = fetcher.fetch().await;

    assert!(!state.loading);
    assert!(state.data.is_empty());
    assert_eq!(state.error.as_deref(), Some("HTTP error! status: 500"));
    assert_eq!(
        state.status().render_placeholder().as_deref(),
        Some("Error: HTTP error! status: 500")
    );
}

#[tokio::test]
async fn test_fetch_sends_query_and_keeps_data_on_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/unified-data"))
        .and(query_param("start_date", "2023-07-01"))
        .and(query_param("cluster", "Philadelphia Cluster"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            activity("2023-07-01", "JYG", 4),
            activity("2023-07-02", "Study Circle", 6)
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/unified-data"))
        .and(query_param("start_date", "2023-09-01"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = DataFetcher::unified_data(client_for(&server), &QueryParams::default());
    let state = fetcher.fetch().await;
    assert_eq!(state.status(), PageStatus::Ready);
    assert_eq!(state.data.len(), 2);

    let state = fetcher.refetch([("start_date", "2023-09-01")]).await;
    assert_eq!(state.error.as_deref(), Some("HTTP error! status: 404"));
    assert_eq!(state.data.len(), 2);
    assert_eq!(fetcher.issued(), 2);
}

#[tokio::test]
async fn test_later_query_wins_over_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/unified-data"))
        .and(query_param("start_date", "2023-07-01"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([activity("2023-07-01", "JYG", 4)]))
                .set_delay(Duration::from_millis(400)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/unified-data"))
        .and(query_param("start_date", "2023-08-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            activity("2023-08-01", "JYG", 4),
            activity("2023-08-02", "Study Circle", 6)
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = DataFetcher::unified_data(client_for(&server), &QueryParams::default());
    let (stale, latest) = tokio::join!(fetcher.fetch(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        fetcher.refetch([("start_date", "2023-08-01")]).await
    });

    assert_eq!(latest.data.len(), 2);
    assert_eq!(stale.data.len(), 2);

    let state = fetcher.state();
    assert_eq!(state.data.len(), 2);
    assert_eq!(state.data[0].date, "2023-08-01");
    assert!(!state.loading);
    assert_eq!(state.error, None);
    assert_eq!(fetcher.issued(), 2);
}

#[tokio::test]
async fn test_net_page_needs_both_resources() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/unified-data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([activity(
            "2023-07-01",
            "JYG",
            4
        )])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/centrality-measures"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .load_page(Page::Net, &QueryParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DashboardError::Http { status_code: Some(503), .. }));

    let data = client
        .load_page(Page::Geo, &QueryParams::default())
        .await
        .unwrap();
    assert_eq!(data.records.len(), 1);
    assert!(data.centrality.is_none());
}

#[tokio::test]
async fn test_centrality_measures_decode() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/centrality-measures"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "centrality": {
                "degree": {"p1": 0.5, "p2": 0.25},
                "betweenness": {"p1": 0.0},
                "communities": {"p1": 0, "p2": 1},
                "avg_shortest_path": 1.25
            }
        })))
        .mount(&server)
        .await;

    let measures = client_for(&server).centrality_measures().await.unwrap();
    assert_eq!(measures.degree.len(), 2);
    assert!(measures.closeness.is_empty());
    assert_eq!(measures.avg_shortest_path, Some(1.25));
}

#[tokio::test]
async fn test_shortest_path_outcomes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/shortest-path"))
        .and(query_param("source", "p1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"path": ["p1", "p2"], "length": 1})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/shortest-path"))
        .and(query_param("source", "p9"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "Node p9 not in graph"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(
        client.shortest_path("p1", "p2").await.lines(),
        vec!["Shortest Path: p1 → p2", "Path Length: 1"]
    );
    assert_eq!(
        client.shortest_path("p9", "p2").await,
        ShortestPathOutcome::Error("Node p9 not in graph".to_string())
    );

    let mut config = DashboardConfig::default();
    config.api_base_url = "http://127.0.0.1:1/api".to_string();
    let unreachable = ApiClient::new(&config).unwrap();
    assert_eq!(
        unreachable.shortest_path("p1", "p2").await,
        ShortestPathOutcome::Error(SHORTEST_PATH_FAILED.to_string())
    );
}

#[tokio::test]
async fn test_census_overlay_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/census-data"))
        .and(query_param("overlay", "income"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "features": [{
                "geometry": {"type": "Polygon", "coordinates": [[[-75.1, 39.9], [-75.0, 39.9], [-75.1, 39.9]]]},
                "properties": {"income": 60000}
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let collection = client_for(&server)
        .census_data(cluster_dashboard::views::geo::OverlayKind::Income)
        .await
        .unwrap();
    assert_eq!(collection.features.len(), 1);
}
