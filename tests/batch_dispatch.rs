//! End-to-end batch image dispatch against a mock HTTP provider.
//!
//! Exercises the real `HttpImageApi` (submit, poll, classify failures)
//! underneath the dispatcher's cache, limiter, and concurrency control.

use std::sync::Arc;
use std::time::Duration;

use postforge::cache::{CacheConfig, ResponseCache};
use postforge::resilience::{RateLimiter, RateLimiterConfig, RetryPolicy};
use postforge::transport::HttpImageApi;
use postforge::{BatchImageDispatcher, DispatcherConfig, ImageRequest, Settings};

fn dispatcher_for(server: &mockito::Server) -> Arc<BatchImageDispatcher> {
    let mut settings = Settings::default();
    settings.api.image.base_url = server.url();
    settings.api.image.api_key = "test-key".into();

    let api = Arc::new(HttpImageApi::new(&settings.api.image).unwrap());
    let cache = Arc::new(ResponseCache::in_memory(CacheConfig::from_settings(
        &settings,
    )));
    let limiter = Arc::new(RateLimiter::new(RateLimiterConfig::per_minute(10_000)));

    let config = DispatcherConfig {
        model: settings.api.image.model.clone(),
        size: settings.api.image.size.clone(),
        max_concurrent: 3,
        poll_interval: Duration::from_millis(5),
        max_wait: Duration::from_secs(5),
        image_ttl: Duration::from_secs(60),
    };

    Arc::new(
        BatchImageDispatcher::new(api, cache, limiter, config).with_retry_policy(
            RetryPolicy::new()
                .with_max_retries(1)
                .with_initial_delay(Duration::from_millis(1)),
        ),
    )
}

#[tokio::test]
async fn test_single_image_end_to_end() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/images/generations")
        .with_status(200)
        .with_body(r#"{"task_id": "t1"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/images/tasks/t1")
        .with_status(200)
        .with_body(r#"{"status": "succeeded", "image_url": "https://img/t1.png"}"#)
        .create_async()
        .await;

    let d = dispatcher_for(&server);
    let results = d
        .generate_batch(vec![ImageRequest::new("a lighthouse at dusk", 0)])
        .await;

    assert_eq!(results.len(), 1);
    assert!(results[0].success);
    assert_eq!(results[0].image_url.as_deref(), Some("https://img/t1.png"));
    assert!(!results[0].from_cache);
}

#[tokio::test]
async fn test_batch_results_come_back_in_index_order() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/images/generations")
        .with_status(200)
        .with_body(r#"{"task_id": "t1"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/images/tasks/t1")
        .with_status(200)
        .with_body(r#"{"status": "succeeded", "image_url": "https://img/t1.png"}"#)
        .create_async()
        .await;

    let d = dispatcher_for(&server);
    let requests = vec![
        ImageRequest::new("first scene", 0).cover(),
        ImageRequest::new("second scene", 1),
        ImageRequest::new("third scene", 2),
    ];
    let results = d.generate_batch(requests).await;

    assert_eq!(results.len(), 3);
    for (i, r) in results.iter().enumerate() {
        assert_eq!(r.index, i);
        assert!(r.success);
    }
    assert!(results[0].is_cover);
}

#[tokio::test]
async fn test_create_failure_lands_in_the_unit_slot() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/images/generations")
        .with_status(400)
        .with_body(r#"{"error": {"code": "invalid_size", "message": "bad size"}}"#)
        .create_async()
        .await;

    let d = dispatcher_for(&server);
    let results = d
        .generate_batch(vec![ImageRequest::new("anything", 0)])
        .await;

    assert!(!results[0].success);
    assert!(results[0].error.as_deref().unwrap().contains("bad size"));
    assert!(results[0].image_url.is_none());
}

#[tokio::test]
async fn test_moderation_rejection_retries_once_with_simplified_prompt() {
    let mut server = mockito::Server::new_async().await;
    let create = server
        .mock("POST", "/images/generations")
        .with_status(400)
        .with_body(r#"{"error": {"code": "content_policy_violation", "message": "refused"}}"#)
        .expect(2)
        .create_async()
        .await;

    let d = dispatcher_for(&server);
    let results = d
        .generate_batch(vec![ImageRequest::new(
            "a battle scene, dark mood, gory details",
            0,
        )])
        .await;

    assert!(!results[0].success);
    assert!(results[0].error.as_deref().unwrap().contains("moderation"));
    // Original prompt plus exactly one simplified resubmission.
    create.assert_async().await;
}

#[tokio::test]
async fn test_repeat_prompt_is_a_cache_hit() {
    let mut server = mockito::Server::new_async().await;
    let create = server
        .mock("POST", "/images/generations")
        .with_status(200)
        .with_body(r#"{"task_id": "t1"}"#)
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", "/images/tasks/t1")
        .with_status(200)
        .with_body(r#"{"status": "succeeded", "image_url": "https://img/t1.png"}"#)
        .create_async()
        .await;

    let d = dispatcher_for(&server);
    let first = d
        .generate_batch(vec![ImageRequest::new("same prompt", 0)])
        .await;
    let second = d
        .generate_batch(vec![ImageRequest::new("same prompt", 0)])
        .await;

    assert!(!first[0].from_cache);
    assert!(second[0].from_cache);
    assert_eq!(first[0].image_url, second[0].image_url);
    create.assert_async().await;
}
