//! Integration tests for `SiteClient` and the resolver running over it.
//!
//! Each test stands up a local `wiremock` server so no real network traffic
//! is made.

use std::time::{Duration, Instant};

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tilecat_core::{CandidateOrigin, ProductRecord};
use tilecat_scraper::{
    ExistenceProbe, NoDelay, PageSource, Resolver, ResolverSettings, ScoreWeights, ScraperError,
    SiteClient,
};

/// 5-second timeouts, descriptive UA, no retries.
fn test_client() -> SiteClient {
    SiteClient::new(5, 5, "tilecat-test/0.1", 0, 0).expect("failed to build test SiteClient")
}

/// One-second request and probe timeouts, no retries.
fn impatient_client() -> SiteClient {
    SiteClient::new(1, 1, "tilecat-test/0.1", 0, 0).expect("failed to build test SiteClient")
}

fn settings_for(server: &MockServer) -> ResolverSettings {
    ResolverSettings {
        product_url_template: format!("{}/producto/{{slug}}/", server.uri()),
        uploads_base_url: format!("{}/wp-content/uploads/", server.uri()),
        marker: "_C1".to_owned(),
        variant_suffixes: vec!["Malla".to_owned(), "Paver".to_owned()],
        weights: ScoreWeights::default(),
    }
}

// ---------------------------------------------------------------------------
// Page fetches
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_page_returns_body_on_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/producto/alabama/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Alabama</h1>"))
        .mount(&server)
        .await;

    let body = test_client()
        .fetch_page(&format!("{}/producto/alabama/", server.uri()))
        .await;
    assert_eq!(body.as_deref(), Some("<h1>Alabama</h1>"));
}

#[tokio::test]
async fn fetch_page_is_absent_on_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let body = test_client()
        .fetch_page(&format!("{}/producto/missing/", server.uri()))
        .await;
    assert!(body.is_none());
}

#[tokio::test]
async fn fetch_page_is_absent_when_host_unreachable() {
    // Port 9 (discard) on localhost is not listening in test environments.
    let body = test_client().fetch_page("http://127.0.0.1:9/producto/x/").await;
    assert!(body.is_none());
}

#[tokio::test]
async fn fetch_text_maps_rate_limit_to_typed_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let result = test_client().fetch_text(&server.uri()).await;
    match result {
        Err(ScraperError::RateLimited {
            retry_after_secs, ..
        }) => assert_eq!(retry_after_secs, 7),
        other => panic!("expected RateLimited, got: {other:?}"),
    }
}

#[tokio::test]
async fn fetch_text_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let client = SiteClient::new(5, 5, "tilecat-test/0.1", 1, 0).expect("client");
    let body = client.fetch_text(&server.uri()).await.expect("retry should succeed");
    assert_eq!(body, "ok");
}

// ---------------------------------------------------------------------------
// Existence probes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn probe_true_on_head_ok() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/wp-content/uploads/ALPES_C1.jpg"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/wp-content/uploads/ALPES_C1.jpg", server.uri());
    assert!(test_client().exists(&url).await);
}

#[tokio::test]
async fn probe_falls_back_to_ranged_get_when_head_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("range", "bytes=0-0"))
        .respond_with(ResponseTemplate::new(206).set_body_bytes(vec![0xFF]))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/wp-content/uploads/ALPES_C1.jpg", server.uri());
    assert!(test_client().probe(&url).await);
}

#[tokio::test]
async fn probe_false_when_missing() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = format!("{}/wp-content/uploads/NOPE_C1.jpg", server.uri());
    assert!(!test_client().probe(&url).await);
}

#[tokio::test]
async fn probe_false_on_non_ok_head_success_without_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let url = format!("{}/wp-content/uploads/ALPES_C1.jpg", server.uri());
    assert!(!test_client().probe(&url).await);
}

// ---------------------------------------------------------------------------
// Catalog source
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_catalog_decodes_mixed_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 7, "name": "Sunset Maple", "slug": "sunset-maple", "format": "60x60cm", "gallery": "[\"https://x/a_C1.jpg\"]"},
            {"id": "b-2", "name": "Alpes Malla", "slug": null, "gallery": "not json"},
        ])))
        .mount(&server)
        .await;

    let products = test_client()
        .fetch_catalog(&format!("{}/api/products", server.uri()))
        .await
        .expect("catalog should decode");

    assert_eq!(products.len(), 2);
    assert_eq!(products[0].id, "7");
    assert!(products[0].has_marker_image("_C1"));
    assert_eq!(products[1].id, "b-2");
    assert_eq!(products[1].slug, None);
    assert!(products[1].gallery.is_empty());
}

#[tokio::test]
async fn fetch_catalog_skips_records_without_a_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 7, "name": "Sunset Maple"},
            {"id": 8, "name": null},
            {"id": 9, "name": "Alpes"},
            {"name": "No Id"},
        ])))
        .mount(&server)
        .await;

    let products = test_client()
        .fetch_catalog(&format!("{}/api/products", server.uri()))
        .await
        .expect("catalog with some bad records should still load");

    let ids: Vec<&str> = products.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["7", "9"]);
}

#[tokio::test]
async fn fetch_catalog_rejects_non_array_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"error\":\"down\"}"))
        .mount(&server)
        .await;

    let result = test_client().fetch_catalog(&server.uri()).await;
    assert!(
        matches!(result, Err(ScraperError::Deserialize { .. })),
        "expected Deserialize error, got: {result:?}"
    );
}

// ---------------------------------------------------------------------------
// Resolver over HTTP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn resolver_finds_close_up_on_product_page() {
    let server = MockServer::start().await;
    let image = format!("{}/wp-content/uploads/SUNSET_MAPLE_60X60CM_C1.jpg", server.uri());
    Mock::given(method("GET"))
        .and(path("/producto/sunset-maple/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<div><img src="{image}"><img src="{}/wp-content/uploads/OTHER_C1.jpg"></div>"#,
            server.uri()
        )))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client();
    let resolver = Resolver::new(&client, &client, NoDelay, settings_for(&server)).expect("resolver");
    let products = vec![ProductRecord::new("7", "Sunset Maple")
        .with_slug("sunset-maple")
        .with_format("60x60cm")];

    let report = resolver.resolve_all(&products, 1).await;

    assert_eq!(report.resolved.get("7"), Some(&image));
    assert!(report.unresolved.is_empty());
}

#[tokio::test]
async fn resolver_probes_constructed_url_when_page_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/producto/alpes/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/wp-content/uploads/ALPES_C1.jpg"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = test_client();
    let resolver = Resolver::new(&client, &client, NoDelay, settings_for(&server)).expect("resolver");
    let product = ProductRecord::new("3", "Alpes").with_slug("alpes");

    let candidate = resolver.resolve(&product).await.expect("should resolve");
    assert_eq!(candidate.origin, CandidateOrigin::ConstructedProbe);
    assert_eq!(
        candidate.url,
        format!("{}/wp-content/uploads/ALPES_C1.jpg", server.uri())
    );
}

// ---------------------------------------------------------------------------
// Timeouts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_page_is_absent_when_server_is_too_slow() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<h1>late</h1>")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let body = impatient_client()
        .fetch_page(&format!("{}/producto/slow/", server.uri()))
        .await;
    assert_eq!(body, None);
}

#[tokio::test]
async fn exists_is_false_when_head_and_get_time_out() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(206).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let started = Instant::now();
    let found = impatient_client()
        .exists(&format!("{}/wp-content/uploads/SLOW_C1.jpg", server.uri()))
        .await;

    assert!(!found);
    assert!(started.elapsed() < Duration::from_secs(3));
}
