//! Connector tests against loopback HTTP servers.
//!
//! Each test stands up a small axum app on an ephemeral port and points
//! the connector's base_url at it, exercising the real request path
//! including auth headers and non-200 handling.

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use std::collections::HashMap;

use askdocs::config::{ConfluenceConnectorConfig, MantisConnectorConfig};
use askdocs::connector::Connector;
use askdocs::connector_confluence::ConfluenceConnector;
use askdocs::connector_mantis::MantisConnector;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn set_confluence_creds() {
    std::env::set_var("CONFLUENCE_API_USER", "bot@example.com");
    std::env::set_var("CONFLUENCE_API_TOKEN", "token-123");
}

fn page_json(id: &str, title: &str, body_html: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "title": title,
        "body": { "storage": { "value": body_html } }
    })
}

async fn confluence_page(Path(id): Path<String>) -> impl IntoResponse {
    match id.as_str() {
        "100" => Json(page_json("100", "Install", "<p>Install via pip.</p>")).into_response(),
        "200" => Json(page_json("200", "Deploy", "<p>Deploy with docker.</p>")).into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

#[tokio::test]
async fn confluence_skips_failing_page_and_keeps_the_rest() {
    set_confluence_creds();

    let app = Router::new().route("/rest/api/content/{id}", get(confluence_page));
    let base = serve(app).await;

    let connector = ConfluenceConnector::new(ConfluenceConnectorConfig {
        base_url: format!("{}/rest/api/content", base),
        page_ids: vec!["100".into(), "404".into(), "200".into()],
        page_limit: 25,
    });

    // One page 404s; the scan must still succeed with the other two.
    let items = connector.scan().await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].source_id, "100");
    assert_eq!(items[0].body, "Install via pip.");
    assert_eq!(items[1].source_id, "200");
}

async fn confluence_listing(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    let start: usize = params
        .get("start")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    if start == 0 {
        Json(serde_json::json!({
            "results": [ page_json("1", "One", "<p>first page</p>") ],
            "_links": { "next": "/rest/api/content?start=25" }
        }))
    } else {
        Json(serde_json::json!({
            "results": [ page_json("2", "Two", "<p>second page</p>") ],
            "_links": {}
        }))
    }
}

#[tokio::test]
async fn confluence_fetch_all_follows_pagination() {
    set_confluence_creds();

    let app = Router::new().route("/rest/api/content", get(confluence_listing));
    let base = serve(app).await;

    let connector = ConfluenceConnector::new(ConfluenceConnectorConfig {
        base_url: format!("{}/rest/api/content", base),
        page_ids: vec![],
        page_limit: 25,
    });

    let items = connector.scan().await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].body, "first page");
    assert_eq!(items[1].body, "second page");
}

#[tokio::test]
async fn mantis_issues_become_documents() {
    std::env::set_var("MANTIS_API_TOKEN", "mantis-token");

    let app = Router::new().route(
        "/api/rest/issues",
        get(|| async {
            Json(serde_json::json!([
                { "id": 41, "summary": "Crash on start", "description": "Trace attached." },
                { "id": 42, "summary": "Docs typo", "description": "Readme fix." }
            ]))
        }),
    );
    let base = serve(app).await;

    let connector = MantisConnector::new(MantisConnectorConfig {
        base_url: format!("{}/api/rest", base),
    });

    let items = connector.scan().await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].source_id, "41");
    assert_eq!(items[0].body, "Crash on start\nTrace attached.");
}

#[tokio::test]
async fn mantis_error_status_yields_empty_listing() {
    std::env::set_var("MANTIS_API_TOKEN", "mantis-token");

    let app = Router::new().route(
        "/api/rest/issues",
        get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let base = serve(app).await;

    let connector = MantisConnector::new(MantisConnectorConfig {
        base_url: format!("{}/api/rest", base),
    });

    // Logged, not propagated: the adapter returns an empty result set.
    let items = connector.scan().await.unwrap();
    assert!(items.is_empty());
}
