//! Integration tests for the lookup service
//!
//! These tests use wiremock to serve product pages and run the full
//! lookup cycle (HTTP fetch, extraction, file cache) end-to-end.

use bookcover_finder::cache::CacheBackend;
use bookcover_finder::config::{CacheConfig, Config, RequestConfig};
use bookcover_finder::{LookupService, ResolveOptions};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COVER: &str = "https://m.media-amazon.com/images/I/91abcdefgh._SX331_SY500_.jpg";

/// Creates a test configuration caching into `dir` with short timeouts
fn create_test_config(dir: &TempDir, redis_url: Option<&str>) -> Config {
    Config {
        cache: CacheConfig {
            key_prefix: "test_book_image".to_string(),
            timeout_secs: 60,
            redis_url: redis_url.map(str::to_string),
            file_path: dir.path().join("covers.bin").display().to_string(),
        },
        request: RequestConfig {
            connect_timeout_secs: 1.0,
            read_timeout_secs: 1.0,
            max_retries: 2,
            backoff_factor_secs: 0.01,
            ..RequestConfig::default()
        },
    }
}

fn product_page() -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Some Book: A Novel</title></head>
<body>
  <div id="nav"><img src="https://m.media-amazon.com/images/G/01/nav-sprite.png"></div>
  <div id="imageBlock_feature_div">
    <img id="imgBlkFront"
         src="https://m.media-amazon.com/images/G/01/grey-pixel.gif"
         data-a-dynamic-image='{{"{cover}":[331,500],"https://m.media-amazon.com/images/I/91abcdefgh._SX218_.jpg":[218,330]}}'>
  </div>
</body>
</html>"#,
        cover = COVER
    )
}

#[tokio::test]
async fn test_lookup_miss_then_cache_hit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/amazon/dp/0000000001"))
        .respond_with(ResponseTemplate::new(200).set_body_string(product_page()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let service = LookupService::from_config(&create_test_config(&dir, None))
        .await
        .expect("Failed to build service");
    assert_eq!(service.cache().backend(), CacheBackend::File);

    let book_url = format!("{}/amazon/dp/0000000001", mock_server.uri());

    let first = service.lookup(Some(&book_url), ResolveOptions::default()).await;
    assert!(first.success, "unexpected failure: {:?}", first.error);
    assert_eq!(first.image_url.as_deref(), Some(COVER));
    assert_eq!(first.cached, Some(false));

    let second = service.lookup(Some(&book_url), ResolveOptions::default()).await;
    assert!(second.success);
    assert_eq!(second.image_url.as_deref(), Some(COVER));
    assert_eq!(second.cached, Some(true));

    assert!(dir.path().join("covers.bin").exists());
}

#[tokio::test]
async fn test_lookup_survives_service_restart() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/amazon/dp/0000000002"))
        .respond_with(ResponseTemplate::new(200).set_body_string(product_page()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, None);
    let book_url = format!("{}/amazon/dp/0000000002", mock_server.uri());

    let service = LookupService::from_config(&config).await.unwrap();
    assert!(service.lookup(Some(&book_url), ResolveOptions::default()).await.success);
    drop(service);

    let restarted = LookupService::from_config(&config).await.unwrap();
    let response = restarted.lookup(Some(&book_url), ResolveOptions::default()).await;
    assert_eq!(response.cached, Some(true));
    assert_eq!(response.image_url.as_deref(), Some(COVER));
}

#[tokio::test]
async fn test_lookup_page_without_cover() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/amazon/dp/0000000003"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><p>Currently unavailable.</p></body></html>"),
        )
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let service = LookupService::from_config(&create_test_config(&dir, None)).await.unwrap();
    let book_url = format!("{}/amazon/dp/0000000003", mock_server.uri());

    let response = service
        .lookup(
            Some(&book_url),
            ResolveOptions {
                debug: true,
                profile: true,
            },
        )
        .await;

    assert!(!response.success);
    assert_eq!(response.status.http_status(), 404);
    assert_eq!(response.error.as_deref(), Some("Could not find book cover image"));

    let timings = response.timings.expect("profiling was requested");
    assert_eq!(timings.strategies.len(), 7);
    assert!(timings.parse.is_some());
}

#[tokio::test]
async fn test_lookup_server_errors_exhaust_retries() {
    let mock_server = MockServer::start().await;

    // One initial attempt plus two retries
    Mock::given(method("GET"))
        .and(path("/amazon/dp/0000000004"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let service = LookupService::from_config(&create_test_config(&dir, None)).await.unwrap();
    let book_url = format!("{}/amazon/dp/0000000004", mock_server.uri());

    let response = service.lookup(Some(&book_url), ResolveOptions::default()).await;

    assert!(!response.success);
    assert_eq!(response.status.http_status(), 404);
    assert!(response.error.unwrap().contains("503"));
    assert!(!dir.path().join("covers.bin").exists());
}

#[tokio::test]
async fn test_lookup_rejects_non_amazon_url() {
    let dir = TempDir::new().unwrap();
    let service = LookupService::from_config(&create_test_config(&dir, None)).await.unwrap();

    let response = service
        .lookup(Some("https://www.example.com/book/1"), ResolveOptions::default())
        .await;

    assert_eq!(response.status.http_status(), 400);
    assert_eq!(
        response.error.as_deref(),
        Some("Only Amazon book URLs are supported")
    );
}

#[tokio::test]
async fn test_unreachable_redis_falls_back_to_file() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/amazon/dp/0000000005"))
        .respond_with(ResponseTemplate::new(200).set_body_string(product_page()))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, Some("redis://127.0.0.1:1/0"));
    let service = LookupService::from_config(&config).await.unwrap();

    assert_eq!(service.cache().backend(), CacheBackend::File);

    let book_url = format!("{}/amazon/dp/0000000005", mock_server.uri());
    let response = service.lookup(Some(&book_url), ResolveOptions::default()).await;

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["cache_backend"], "file");
}
