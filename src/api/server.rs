//! HTTP server implementation for the proxy

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{any, get},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use super::handlers;
use super::models::ErrorBody;
use crate::config::ServerConfig;
use crate::llm::LLM;

/// Largest request body the proxy reads
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Shared application state. Read-only for the lifetime of the server.
#[derive(Clone)]
pub struct AppState {
    pub llm: Arc<dyn LLM>,
    /// Server-held key, resolved once at start-up. `None` is reported per request.
    pub api_key: Option<Arc<str>>,
}

/// Build the router with all routes and middleware
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let mut app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/health", get(health_handler))
        .route("/generate", any(generate_handler))
        .route("/api/generate", any(generate_handler));

    app = match &config.static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app.route("/", get(serve_info)),
    };

    app.with_state(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(&config.allowed_origins)),
    )
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

/// Configure and start the HTTP server
pub async fn start_http_server(state: AppState, config: &ServerConfig) -> Result<()> {
    let app = create_router(state, config);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!("🌐 Proxy listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Proxy stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Health check handler
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(handlers::health_check(&state).await))
}

/// Generate proxy handler. Only POST is accepted; the body is not read otherwise.
async fn generate_handler(State(state): State<AppState>, request: Request) -> Response {
    if request.method() != Method::POST {
        return (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed").into_response();
    }

    let result = match to_bytes(request.into_body(), MAX_BODY_BYTES).await {
        Ok(body) => handlers::proxy_generate(&state, &body).await,
        Err(e) => Err(handlers::ProxyError::Body(e.to_string())),
    };

    match result {
        Ok(data) => (StatusCode::OK, Json(data)).into_response(),
        Err(e) => {
            warn!("Generate proxy failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody::new(e.to_string()))).into_response()
        }
    }
}

/// Plain info page used when no static front-end is configured
async fn serve_info() -> impl IntoResponse {
    let html = r#"<!DOCTYPE html>
<html>
<head><title>Season Extractor Proxy</title></head>
<body>
    <h1>Season Extractor Proxy</h1>
    <p>The proxy is running. Available endpoints:</p>
    <ul>
        <li><code>GET /health</code> - Health check</li>
        <li><code>POST /generate</code> - Forward <code>{"model", "contents"}</code> to the Gemini API</li>
    </ul>
    <p>Set <code>server.static_dir</code> to serve the converter front-end here.</p>
</body>
</html>"#;
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html")],
        Body::from(html),
    )
}
