//! Fake Gemini upstream for integration tests.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Router,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

/// One request seen by the fake upstream
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Path segment after `models/`, e.g. `m:generateContent`
    pub call: String,
    pub query: HashMap<String, String>,
    pub body: String,
}

#[derive(Clone)]
struct Upstream {
    status: StatusCode,
    body: String,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

pub struct FakeUpstream {
    pub base: String,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl FakeUpstream {
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

async fn record(
    State(upstream): State<Upstream>,
    Path(call): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> impl IntoResponse {
    upstream.calls.lock().unwrap().push(RecordedCall {
        call,
        query,
        body: String::from_utf8_lossy(&body).to_string(),
    });
    (
        upstream.status,
        [("content-type", "application/json")],
        upstream.body.clone(),
    )
}

/// Serve `body` with `status` for every `POST /v1beta/models/{call}`
pub async fn spawn_upstream(status: StatusCode, body: impl Into<String>) -> FakeUpstream {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let state = Upstream {
        status,
        body: body.into(),
        calls: calls.clone(),
    };

    let app = Router::new()
        .route("/v1beta/models/:call", post(record))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeUpstream {
        base: format!("http://{}/v1beta", addr),
        calls,
    }
}

/// Gemini-shaped reply whose first part carries `text`
pub fn gemini_reply(text: &str) -> String {
    serde_json::json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }],
        "usageMetadata": { "totalTokenCount": 42 }
    })
    .to_string()
}
