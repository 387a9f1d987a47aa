mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use season_extractor::api::create_router;
use season_extractor::config::{ConfigBuilder, ServerConfig};
use season_extractor::{ApiServer, Config};
use std::sync::Arc;
use tower::ServiceExt;

use common::{spawn_upstream, FakeUpstream};

/// Helper to get response body as string
async fn body_to_string(body: Body) -> String {
    let bytes = body.collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn proxy_for(upstream: &FakeUpstream, api_key: Option<&str>) -> Router {
    let mut builder = ConfigBuilder::new().with_endpoint_base(upstream.base.clone());
    if let Some(key) = api_key {
        builder = builder.with_server_api_key(key);
    }
    router_for(builder.build())
}

fn router_for(config: Config) -> Router {
    let server = ApiServer::new(Arc::new(config.clone()));
    create_router(server.app_state().unwrap(), &config.server)
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_get_is_method_not_allowed() {
    let upstream = spawn_upstream(StatusCode::OK, "{}").await;
    let app = proxy_for(&upstream, Some("secret"));

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/generate")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(upstream.call_count(), 0);
}

#[tokio::test]
async fn test_missing_server_key() {
    let upstream = spawn_upstream(StatusCode::OK, "{}").await;
    let app = proxy_for(&upstream, None);

    let response = app
        .oneshot(post_json("/generate", r#"{"model":"m","contents":[]}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert_eq!(
        body_to_string(response.into_body()).await,
        r#"{"error":"API key is not configured on the server."}"#
    );
    assert_eq!(upstream.call_count(), 0);
}

#[tokio::test]
async fn test_forwards_exactly_once() {
    let upstream = spawn_upstream(StatusCode::OK, r#"{"candidates":[]}"#).await;
    let app = proxy_for(&upstream, Some("secret"));

    let contents = serde_json::json!([{"parts": [{"text": "Show.S01E01.mp4"}]}]);
    let body = serde_json::json!({"model": "m", "contents": contents}).to_string();

    let response = app.oneshot(post_json("/generate", &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_string(response.into_body()).await, r#"{"candidates":[]}"#);

    let calls = upstream.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].call, "m:generateContent");
    assert_eq!(calls[0].query.get("key").map(String::as_str), Some("secret"));

    let forwarded: serde_json::Value = serde_json::from_str(&calls[0].body).unwrap();
    assert_eq!(forwarded, serde_json::json!({ "contents": contents }));
}

#[tokio::test]
async fn test_api_prefixed_route() {
    let upstream = spawn_upstream(StatusCode::OK, r#"{"ok":true}"#).await;
    let app = proxy_for(&upstream, Some("secret"));

    let response = app
        .oneshot(post_json("/api/generate", r#"{"model":"m","contents":[]}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(upstream.call_count(), 1);
}

#[tokio::test]
async fn test_upstream_error_is_relayed_with_ok_status() {
    let upstream_error = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
    let upstream = spawn_upstream(StatusCode::BAD_REQUEST, upstream_error).await;
    let app = proxy_for(&upstream, Some("bad"));

    let response = app
        .oneshot(post_json("/generate", r#"{"model":"m","contents":[]}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let relayed: serde_json::Value =
        serde_json::from_str(&body_to_string(response.into_body()).await).unwrap();
    let expected: serde_json::Value = serde_json::from_str(upstream_error).unwrap();
    assert_eq!(relayed, expected);
}

#[tokio::test]
async fn test_invalid_body_is_internal_error() {
    let upstream = spawn_upstream(StatusCode::OK, "{}").await;
    let app = proxy_for(&upstream, Some("secret"));

    let response = app.oneshot(post_json("/generate", "not json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value =
        serde_json::from_str(&body_to_string(response.into_body()).await).unwrap();
    assert!(!body["error"].as_str().unwrap().is_empty());
    assert_eq!(upstream.call_count(), 0);
}

#[tokio::test]
async fn test_non_json_upstream_is_internal_error() {
    let upstream = spawn_upstream(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>").await;
    let app = proxy_for(&upstream, Some("secret"));

    let response = app
        .oneshot(post_json("/generate", r#"{"model":"m","contents":[]}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value =
        serde_json::from_str(&body_to_string(response.into_body()).await).unwrap();
    assert!(body["error"].is_string());
    assert_eq!(upstream.call_count(), 1);
}

#[tokio::test]
async fn test_unreachable_upstream_is_internal_error() {
    // Bind and drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ConfigBuilder::new()
        .with_endpoint_base(format!("http://{}/v1beta", addr))
        .with_server_api_key("SERVER-SECRET-123")
        .build();
    let app = router_for(config);

    let response = app
        .oneshot(post_json("/generate", r#"{"model":"m","contents":[]}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let text = body_to_string(response.into_body()).await;
    assert!(!text.contains("SERVER-SECRET-123"), "server key leaked: {}", text);
    let body: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_missing_model_still_reports_missing_key() {
    let upstream = spawn_upstream(StatusCode::OK, "{}").await;
    let app = proxy_for(&upstream, None);

    let response = app
        .oneshot(post_json("/generate", r#"{"contents":[]}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_to_string(response.into_body()).await,
        r#"{"error":"API key is not configured on the server."}"#
    );
    assert_eq!(upstream.call_count(), 0);
}

#[tokio::test]
async fn test_missing_model_is_forwarded_unchecked() {
    let upstream = spawn_upstream(
        StatusCode::NOT_FOUND,
        r#"{"error":{"code":404,"message":"models/undefined is not found"}}"#,
    )
    .await;
    let app = proxy_for(&upstream, Some("secret"));

    let response = app
        .oneshot(post_json("/generate", r#"{"contents":[]}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let calls = upstream.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].call, "undefined:generateContent");
}

#[tokio::test]
async fn test_health_endpoint() {
    let upstream = spawn_upstream(StatusCode::OK, "{}").await;
    let app = proxy_for(&upstream, None);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value =
        serde_json::from_str(&body_to_string(response.into_body()).await).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["api_key_configured"], false);
}

#[tokio::test]
async fn test_serves_static_front_end() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>converter</h1>").unwrap();

    let config = Config {
        server: ServerConfig {
            static_dir: Some(dir.path().to_path_buf()),
            ..ServerConfig::default()
        },
        ..Config::default()
    };
    let app = router_for(config);

    let response = app
        .oneshot(Request::builder().uri("/index.html").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_string(response.into_body()).await, "<h1>converter</h1>");
}

#[tokio::test]
async fn test_cors_preflight() {
    let upstream = spawn_upstream(StatusCode::OK, "{}").await;
    let app = proxy_for(&upstream, Some("secret"));

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/generate")
                .header(header::ORIGIN, "https://example.pages.dev")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
    assert_eq!(upstream.call_count(), 0);
}
