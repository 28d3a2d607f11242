#![allow(dead_code)]

use axum::Router;
use axum::extract::State;
use axum::http::header::LOCATION;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::any;
use serde_json::{Value as JsonValue, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Requests seen by a test segment endpoint: method and JSON body
pub type Received = Arc<Mutex<Vec<(String, JsonValue)>>>;

/// Starts an HTTP endpoint answering every request with `status`
///
/// Returns the endpoint address and the requests it receives.
pub async fn spawn_segment(status: u16) -> (String, Received) {
    let received: Received = Arc::new(Mutex::new(Vec::new()));

    async fn handler(
        State((status, received)): State<(u16, Received)>,
        method: Method,
        body: String,
    ) -> StatusCode {
        let document = serde_json::from_str(&body).unwrap_or(JsonValue::Null);
        received.lock().unwrap().push((method.to_string(), document));
        StatusCode::from_u16(status).unwrap()
    }

    let app = Router::new()
        .fallback(handler)
        .with_state((status, Arc::clone(&received)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/pipe", addr), received)
}

/// Starts an endpoint at `/pipe` that redirects to `/other`, which accepts
///
/// Returns the `/pipe` address and the paths requested.
pub async fn spawn_redirecting_segment() -> (String, Arc<Mutex<Vec<String>>>) {
    let hits = Arc::new(Mutex::new(Vec::new()));

    async fn redirect(State(hits): State<Arc<Mutex<Vec<String>>>>) -> impl IntoResponse {
        hits.lock().unwrap().push("/pipe".to_string());
        (StatusCode::FOUND, [(LOCATION, "/other")])
    }

    async fn other(State(hits): State<Arc<Mutex<Vec<String>>>>) -> StatusCode {
        hits.lock().unwrap().push("/other".to_string());
        StatusCode::ACCEPTED
    }

    let app = Router::new()
        .route("/pipe", any(redirect))
        .route("/other", any(other))
        .with_state(Arc::clone(&hits));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/pipe", addr), hits)
}

/// Starts an endpoint that answers only after `delay`
pub async fn spawn_slow_segment(delay: Duration) -> String {
    let app = Router::new().fallback(move || async move {
        tokio::time::sleep(delay).await;
        StatusCode::ACCEPTED
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/pipe", addr)
}

/// An address nothing listens on
pub async fn closed_address() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/pipe", addr)
}

/// Pipe document with the given segments as `(segmentNumber, name)`
pub fn pipe_document(name: &str, segments: &[(i64, &str)]) -> JsonValue {
    let segments: Vec<JsonValue> = segments
        .iter()
        .map(|(number, segment)| {
            json!({
                "header": { "segmentNumber": number, "name": segment },
                "body": {}
            })
        })
        .collect();

    json!({
        "header": { "name": name },
        "body": { "segments": segments }
    })
}

pub fn write_pipe(dir: &Path, file: &str, document: &JsonValue) -> PathBuf {
    let path = dir.join(file);
    fs::write(&path, serde_json::to_vec_pretty(document).unwrap()).unwrap();
    path
}

/// Discovery table mapping each segment name to an http address
pub fn discovery(entries: &[(&str, &str)]) -> conveyor_launcher::ServiceDiscovery {
    let mut services = serde_json::Map::new();
    for (segment, address) in entries {
        services.insert(
            segment.to_string(),
            json!({ "endpoints": { "http": { "address": address } } }),
        );
    }
    conveyor_launcher::ServiceDiscovery::new(
        serde_json::from_value(JsonValue::Object(services)).unwrap(),
    )
}
