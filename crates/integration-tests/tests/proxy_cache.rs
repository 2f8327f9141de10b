//! Response cache behavior of the getSite endpoint, end to end.

use std::time::Duration;

use reef_integration_tests::{STORE_HASH, spawn_default_middleware, spawn_middleware, test_config};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn stub_site(server: &MockServer, delay: Option<Duration>) {
    let mut template = ResponseTemplate::new(200)
        .set_body_json(json!({ "data": { "urls": ["test-url"] } }));
    if let Some(delay) = delay {
        template = template.set_delay(delay);
    }

    Mock::given(method("GET"))
        .and(path(format!("/stores/{STORE_HASH}/v3/channels/1/site")))
        .respond_with(template)
        .mount(server)
        .await;
}

async fn site_hits(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .expect("request recording")
        .iter()
        .filter(|request| request.url.path().ends_with("/site"))
        .count()
}

async fn get_site(client: &reqwest::Client, base: &str, bypass: bool) -> Value {
    let mut request = client
        .post(format!("{base}/bigcommerce/getSite"))
        .json(&json!([{}]));
    if bypass {
        request = request.header("Cache-Control", "no-cache");
    }

    request
        .send()
        .await
        .expect("proxy reachable")
        .json()
        .await
        .expect("json body")
}

#[tokio::test]
async fn second_call_is_served_from_cache_and_annotated() {
    let upstream = MockServer::start().await;
    stub_site(&upstream, None).await;
    let base = spawn_default_middleware(&upstream.uri()).await;
    let client = reqwest::Client::new();

    let first = get_site(&client, &base, false).await;
    let second = get_site(&client, &base, false).await;

    assert_eq!(first["data"]["urls"], json!(["test-url"]));
    assert!(first.get("cached").is_none());

    assert_eq!(second["data"]["urls"], json!(["test-url"]));
    assert_eq!(second["cached"], json!(true));

    assert_eq!(site_hits(&upstream).await, 1);
}

#[tokio::test]
async fn no_cache_header_forces_fresh_response() {
    let upstream = MockServer::start().await;
    stub_site(&upstream, None).await;
    let base = spawn_default_middleware(&upstream.uri()).await;
    let client = reqwest::Client::new();

    // Populate the cache, then bypass it
    let first = get_site(&client, &base, true).await;
    let second = get_site(&client, &base, false).await;
    let third = get_site(&client, &base, true).await;

    assert!(first.get("cached").is_none());
    assert_eq!(second["cached"], json!(true));
    // The bypassed response is fresh and never marked cached
    assert!(third.get("cached").is_none());

    assert_eq!(site_hits(&upstream).await, 2);
}

#[tokio::test]
async fn entries_expire_after_the_configured_ttl() {
    let upstream = MockServer::start().await;
    stub_site(&upstream, None).await;
    let base = spawn_middleware(test_config(&upstream.uri(), Duration::from_millis(200))).await;
    let client = reqwest::Client::new();

    get_site(&client, &base, false).await;
    tokio::time::sleep(Duration::from_millis(400)).await;
    let late = get_site(&client, &base, false).await;

    assert!(late.get("cached").is_none());
    assert_eq!(site_hits(&upstream).await, 2);
}

#[tokio::test]
async fn concurrent_identical_calls_hit_upstream_once() {
    let upstream = MockServer::start().await;
    stub_site(&upstream, Some(Duration::from_millis(200))).await;
    let base = spawn_default_middleware(&upstream.uri()).await;
    let client = reqwest::Client::new();

    let (a, b) = tokio::join!(
        get_site(&client, &base, false),
        get_site(&client, &base, false)
    );

    assert_eq!(a["data"]["urls"], b["data"]["urls"]);
    assert_eq!(site_hits(&upstream).await, 1);
}

#[tokio::test]
async fn upstream_errors_are_not_cached() {
    let upstream = MockServer::start().await;
    let failing_site = Mock::given(method("GET"))
        .and(path(format!("/stores/{STORE_HASH}/v3/channels/1/site")))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "title": "Site not found" })),
        )
        .expect(1)
        .mount_as_scoped(&upstream)
        .await;

    let base = spawn_default_middleware(&upstream.uri()).await;
    let client = reqwest::Client::new();

    let failed = client
        .post(format!("{base}/bigcommerce/getSite"))
        .json(&json!([{}]))
        .send()
        .await
        .expect("proxy reachable");
    assert_eq!(failed.status().as_u16(), 404);
    drop(failing_site);

    // The failure left no entry: the next call reaches upstream again
    stub_site(&upstream, None).await;
    let recovered = get_site(&client, &base, false).await;
    assert!(recovered.get("cached").is_none());
    assert_eq!(recovered["data"]["urls"], json!(["test-url"]));
}
