//! API integration tests.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use reel_api::{create_router, AppState};
use reel_render::RenderConfig;
use reel_storage::{ContentStore, StoreConfig};

fn test_router() -> axum::Router {
    let store = ContentStore::new(StoreConfig {
        endpoint_url: "http://127.0.0.1:1".to_string(),
        access_key_id: "test".to_string(),
        secret_access_key: "test".to_string(),
        bucket_name: "test".to_string(),
        region: "auto".to_string(),
        public_base_url: Some("https://cdn.test".to_string()),
    });

    let state = AppState {
        config: RenderConfig::default(),
        store,
        http: reqwest::Client::new(),
    };

    create_router(state, None)
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // OK when ffmpeg is installed, 503 when it isn't; never a routing error
    assert!(
        response.status() == StatusCode::OK
            || response.status() == StatusCode::SERVICE_UNAVAILABLE
    );
}

#[tokio::test]
async fn test_metrics_endpoint_absent_without_handle() {
    let app = test_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// A request whose timing count disagrees with its image count gets a
/// stream whose only message is the error event.
#[tokio::test]
async fn test_render_rejects_timing_mismatch_via_event_stream() {
    let app = test_router();

    let body = serde_json::json!({
        "projectId": "p1",
        "audioUrl": "https://assets.test/voice.mp3",
        "imageUrls": ["https://assets.test/a.png", "https://assets.test/b.png"],
        "imageTimings": [{"startSeconds": 0.0, "endSeconds": 2.0}]
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/render")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    let text = String::from_utf8_lossy(&bytes);

    assert!(text.contains("\"type\":\"error\""));
    assert!(text.contains("does not match"));
    assert!(!text.contains("\"type\":\"complete\""));
}

#[tokio::test]
async fn test_render_rejects_malformed_json() {
    let app = test_router();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/render")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
