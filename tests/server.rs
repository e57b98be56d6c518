//! HTTP API tests, run in-process against the in-memory store.

use std::sync::Arc;

use adshelf::config::Config;
use adshelf::server::{router, AppState};
use adshelf::stores::Stores;
use adshelf_core::models::{Batch, RawAd};
use adshelf_core::store::memory::InMemoryStore;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

fn raw(page: &str, url: &str) -> RawAd {
    RawAd {
        page_name: Some(page.to_string()),
        ad_text: vec![format!("{} ad", page)],
        image_urls: vec![url.to_string()],
        ..Default::default()
    }
}

fn app_with(config_toml: &str) -> Router {
    let store = InMemoryStore::with_batches(vec![
        Batch {
            keyword: "shoes".to_string(),
            collected_at: Some("2024-01-01T09:00:00".to_string()),
            ads: (0..100)
                .map(|i| raw(if i % 2 == 0 { "Acme" } else { "Beta" }, &format!("https://cdn/x/s{}.jpg", i)))
                .collect(),
        },
        Batch {
            keyword: "bags".to_string(),
            collected_at: Some("2024-01-03T09:00:00".to_string()),
            ads: vec![raw("Carry", "https://cdn/x/b1.jpg?sig=1")],
        },
    ]);
    let config: Config = toml::from_str(config_toml).unwrap();
    router(AppState::new(config, Stores::from_shared(Arc::new(store))))
}

fn app() -> Router {
    app_with("")
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_reports_version() {
    let (status, body) = send(&app(), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn query_defaults_to_first_keyword_and_configured_page_size() {
    let (status, body) = send(&app(), Method::POST, "/api/query", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["keyword"], "shoes");
    assert_eq!(body["total_count"], 100);
    assert_eq!(body["page_count"], 2);
    assert_eq!(body["page_items"].as_array().unwrap().len(), 70);
    assert_eq!(body["keywords"], json!(["shoes", "bags"]));
    assert_eq!(body["advertiser_selection"], "all");
}

#[tokio::test]
async fn query_page_size_is_clamped() {
    let app = app_with("[dashboard]\npage_size = 10\nmax_page_size = 40\n");
    let (_, body) = send(&app, Method::POST, "/api/query", Some(json!({}))).await;
    assert_eq!(body["page_items"].as_array().unwrap().len(), 10);

    let (_, body) = send(&app, Method::POST, "/api/query", Some(json!({"page_size": 1000}))).await;
    assert_eq!(body["page_items"].as_array().unwrap().len(), 40);
    assert_eq!(body["page_count"], 3);
}

#[tokio::test]
async fn full_subset_normalizes_to_all() {
    let (_, body) = send(
        &app(),
        Method::POST,
        "/api/query",
        Some(json!({"advertiser_selection": ["Beta", "Acme"]})),
    )
    .await;
    assert_eq!(body["advertiser_selection"], "all");
    assert_eq!(body["total_count"], 100);

    let (_, body) = send(
        &app(),
        Method::POST,
        "/api/query",
        Some(json!({"advertiser_selection": ["Beta"]})),
    )
    .await;
    assert_eq!(body["advertiser_selection"], json!(["Beta"]));
    assert_eq!(body["total_count"], 50);

    let (_, body) = send(
        &app(),
        Method::POST,
        "/api/query",
        Some(json!({"advertiser_selection": []})),
    )
    .await;
    assert_eq!(body["total_count"], 0);
}

#[tokio::test]
async fn malformed_dates_are_ignored_and_bad_selection_rejected() {
    let (status, body) = send(
        &app(),
        Method::POST,
        "/api/query",
        Some(json!({"date_range": {"from": "yesterday", "to": "2024-13-40"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 100);

    let (status, body) = send(
        &app(),
        Method::POST,
        "/api/query",
        Some(json!({"advertiser_selection": "some"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn highlight_endpoints() {
    let app = app();
    let ad = json!({
        "keyword": "bags",
        "page_name": "Carry",
        "ad_text": ["Carry ad"],
        "primary_image_url": "https://cdn/x/b1.jpg?sig=1",
        "collected_at": "2024-01-03T09:00:00"
    });

    let (status, body) = send(&app, Method::POST, "/api/highlights", Some(ad.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({"status": "created", "id": "b1"}));

    let (status, body) = send(&app, Method::POST, "/api/highlights", Some(ad)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "already_exists");

    let (_, body) = send(&app, Method::GET, "/api/highlights", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/query",
        Some(json!({"view": "highlights", "keyword_selection": ["shoes"]})),
    )
    .await;
    assert_eq!(body["total_count"], 0);
    assert_eq!(body["available_keywords"], json!(["bags"]));

    let (status, _) = send(&app, Method::DELETE, "/api/highlights/b1", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, Method::DELETE, "/api/highlights/b1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn highlight_without_image_is_bad_request() {
    let (status, body) = send(
        &app(),
        Method::POST,
        "/api/highlights",
        Some(json!({"keyword": "bags", "primary_image_url": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn keyword_endpoints() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/keywords",
        Some(json!({"query": "hats", "limit": 20})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "created");

    let (status, _) = send(&app, Method::POST, "/api/keywords", Some(json!({"query": "hats"}))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::POST, "/api/keywords", Some(json!({"query": " "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, Method::GET, "/api/keywords", None).await;
    assert_eq!(body, json!([{"query": "hats", "country": "KR", "limit": 20, "enabled": true}]));

    // Registered keywords lead the sidebar.
    let (_, body) = send(&app, Method::POST, "/api/query", Some(json!({}))).await;
    assert_eq!(body["keywords"], json!(["hats", "shoes", "bags"]));

    let (status, _) = send(&app, Method::DELETE, "/api/keywords/hats", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::DELETE, "/api/keywords/hats", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_ad_endpoint() {
    let app = app();
    let (status, body) = send(&app, Method::DELETE, "/api/ads/s0", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "deleted", "count": 1}));

    let (status, _) = send(&app, Method::DELETE, "/api/ads/s0", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, Method::POST, "/api/query", Some(json!({}))).await;
    assert_eq!(body["total_count"], 99);
}

#[tokio::test]
async fn collect_requires_collector() {
    let (status, body) = send(&app(), Method::POST, "/api/collect/shoes", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("collector"));
}

#[cfg(unix)]
#[tokio::test]
async fn collect_is_accepted_without_waiting() {
    let app = app_with("[collector]\ncommand = [\"true\"]\n");
    let (status, body) = send(&app, Method::POST, "/api/collect/shoes", None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "started");
}
