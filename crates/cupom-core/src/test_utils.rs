//! Test utilities for cupom-core
//!
//! Mock Gemini and Firestore REST servers for development and integration
//! tests. Both bind to an ephemeral port and shut down when dropped.

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::ai::MOCK_RECEIPT_JSON;

/// Bind to an ephemeral port and serve `app` until the sender fires
async fn spawn(app: Router) -> (SocketAddr, oneshot::Sender<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .unwrap();
    });

    (addr, shutdown_tx)
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "error": { "code": status.as_u16(), "message": message } })),
    )
        .into_response()
}

fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ---------------------------------------------------------------------------
// Gemini
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct GeminiState {
    replies: Arc<Mutex<VecDeque<String>>>,
    requests: Arc<Mutex<Vec<Value>>>,
    failing: Arc<AtomicBool>,
}

/// Mock Gemini `generateContent` server
///
/// Replies are served from a queue; when it is empty, JSON-mode requests get
/// a canned receipt and text requests a canned insight.
pub struct MockGeminiServer {
    addr: SocketAddr,
    state: GeminiState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockGeminiServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let state = GeminiState::default();
        let app = Router::new()
            .fallback(handle_gemini)
            .with_state(state.clone());
        let (addr, shutdown_tx) = spawn(app).await;

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Queue the text of the next reply
    pub fn push_reply(&self, text: &str) {
        if let Ok(mut replies) = self.state.replies.lock() {
            replies.push_back(text.to_string());
        }
    }

    /// Make every call fail with 429 RESOURCE_EXHAUSTED
    pub fn fail_requests(&self, failing: bool) {
        self.state.failing.store(failing, AtomicOrdering::SeqCst);
    }

    /// Request bodies received so far
    pub fn requests(&self) -> Vec<Value> {
        self.state
            .requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockGeminiServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_gemini(
    State(state): State<GeminiState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path();

    if headers.get("x-goog-api-key").is_none() {
        return error_body(StatusCode::FORBIDDEN, "Method doesn't allow unregistered callers");
    }

    if method == Method::GET && path.starts_with("/v1beta/models/") {
        let name = path.trim_start_matches("/v1beta/");
        return Json(json!({ "name": name })).into_response();
    }

    if method != Method::POST || !path.ends_with(":generateContent") {
        return error_body(StatusCode::NOT_FOUND, "Not found");
    }

    if state.failing.load(AtomicOrdering::SeqCst) {
        return error_body(StatusCode::TOO_MANY_REQUESTS, "Resource has been exhausted");
    }

    let request: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => return error_body(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    let json_mode =
        request["generationConfig"]["responseMimeType"] == "application/json";
    if let Ok(mut requests) = state.requests.lock() {
        requests.push(request);
    }

    let queued = state.replies.lock().ok().and_then(|mut r| r.pop_front());
    let text = queued.unwrap_or_else(|| {
        if json_mode {
            MOCK_RECEIPT_JSON.to_string()
        } else {
            "1. Mercado concentra a maior parte dos gastos.".to_string()
        }
    });

    Json(json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    }))
    .into_response()
}

// ---------------------------------------------------------------------------
// Firestore
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct FirestoreState {
    /// Documents per collection id, in insertion order
    collections: Arc<Mutex<HashMap<String, Vec<Value>>>>,
    queries: Arc<Mutex<Vec<Value>>>,
    request_log: Arc<Mutex<Vec<String>>>,
    denied: Arc<AtomicBool>,
}

/// Mock Firestore REST server supporting `commit` and `runQuery`
pub struct MockFirestoreServer {
    addr: SocketAddr,
    state: FirestoreState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockFirestoreServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let state = FirestoreState::default();
        let app = Router::new()
            .fallback(handle_firestore)
            .with_state(state.clone());
        let (addr, shutdown_tx) = spawn(app).await;

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Reject every request with 403 PERMISSION_DENIED
    pub fn deny_all(&self, denied: bool) {
        self.state.denied.store(denied, AtomicOrdering::SeqCst);
    }

    /// Insert a raw document (e.g. one written by another client)
    pub fn insert_document(&self, collection: &str, document: Value) {
        if let Ok(mut collections) = self.state.collections.lock() {
            collections
                .entry(collection.to_string())
                .or_default()
                .push(document);
        }
    }

    /// Documents stored in a collection
    pub fn documents(&self, collection: &str) -> Vec<Value> {
        self.state
            .collections
            .lock()
            .ok()
            .and_then(|c| c.get(collection).cloned())
            .unwrap_or_default()
    }

    /// Structured queries received so far
    pub fn queries(&self) -> Vec<Value> {
        self.state
            .queries
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }

    /// `path?query` of every request received
    pub fn request_log(&self) -> Vec<String> {
        self.state
            .request_log
            .lock()
            .map(|l| l.clone())
            .unwrap_or_default()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockFirestoreServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_firestore(
    State(state): State<FirestoreState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    if let Ok(mut log) = state.request_log.lock() {
        log.push(match uri.query() {
            Some(query) => format!("{}?{}", uri.path(), query),
            None => uri.path().to_string(),
        });
    }

    if state.denied.load(AtomicOrdering::SeqCst) {
        return error_body(StatusCode::FORBIDDEN, "Missing or insufficient permissions.");
    }
    if method != Method::POST {
        return error_body(StatusCode::NOT_FOUND, "Not found");
    }

    let request: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => return error_body(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    let path = uri.path();
    if path.ends_with(":commit") {
        firestore_commit(&state, &request)
    } else if path.ends_with(":runQuery") {
        firestore_run_query(&state, &request)
    } else {
        error_body(StatusCode::NOT_FOUND, "Not found")
    }
}

fn firestore_commit(state: &FirestoreState, request: &Value) -> Response {
    let Some(write) = request["writes"].get(0) else {
        return error_body(StatusCode::BAD_REQUEST, "No writes");
    };
    let Some(name) = write["update"]["name"].as_str() else {
        return error_body(StatusCode::BAD_REQUEST, "Write without document name");
    };
    let Some(collection) = name.rsplit('/').nth(1) else {
        return error_body(StatusCode::BAD_REQUEST, "Bad document name");
    };

    let now = timestamp_now();
    let mut fields = write["update"]["fields"].clone();
    if !fields.is_object() {
        fields = json!({});
    }

    let mut transform_results = Vec::new();
    if let Some(transforms) = write["updateTransforms"].as_array() {
        for transform in transforms {
            if transform["setToServerValue"] == "REQUEST_TIME" {
                if let Some(field) = transform["fieldPath"].as_str() {
                    fields[field] = json!({ "timestampValue": now });
                    transform_results.push(json!({ "timestampValue": now }));
                }
            }
        }
    }

    let Ok(mut collections) = state.collections.lock() else {
        return error_body(StatusCode::INTERNAL_SERVER_ERROR, "State poisoned");
    };
    let documents = collections.entry(collection.to_string()).or_default();

    let must_not_exist = write["currentDocument"]["exists"] == false;
    if must_not_exist && documents.iter().any(|d| d["name"] == name) {
        return error_body(StatusCode::CONFLICT, "Document already exists");
    }

    documents.push(json!({
        "name": name,
        "fields": fields,
        "createTime": now,
        "updateTime": now
    }));

    Json(json!({
        "writeResults": [{ "updateTime": now, "transformResults": transform_results }],
        "commitTime": now
    }))
    .into_response()
}

fn firestore_run_query(state: &FirestoreState, request: &Value) -> Response {
    let query = &request["structuredQuery"];
    if let Ok(mut queries) = state.queries.lock() {
        queries.push(query.clone());
    }

    let Some(collection) = query["from"][0]["collectionId"].as_str() else {
        return error_body(StatusCode::BAD_REQUEST, "Query without collection");
    };

    let mut matched: Vec<Value> = state
        .collections
        .lock()
        .ok()
        .and_then(|c| c.get(collection).cloned())
        .unwrap_or_default()
        .into_iter()
        .filter(|doc| matches_filter(&doc["fields"], &query["where"]))
        .collect();

    if let Some(order) = query["orderBy"].get(0) {
        let field = order["field"]["fieldPath"].as_str().unwrap_or_default();
        let descending = order["direction"] == "DESCENDING";
        // Stable sort keeps insertion order for ties
        matched.sort_by(|a, b| {
            let ordering =
                compare_values(&a["fields"][field], &b["fields"][field]).unwrap_or(Ordering::Equal);
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }

    let read_time = timestamp_now();
    let results: Vec<Value> = if matched.is_empty() {
        vec![json!({ "readTime": read_time })]
    } else {
        matched
            .into_iter()
            .map(|doc| json!({ "document": doc, "readTime": read_time }))
            .collect()
    };

    Json(Value::Array(results)).into_response()
}

fn matches_filter(fields: &Value, filter: &Value) -> bool {
    if filter.is_null() {
        return true;
    }

    if let Some(composite) = filter.get("compositeFilter") {
        return composite["filters"]
            .as_array()
            .map(|filters| filters.iter().all(|f| matches_filter(fields, f)))
            .unwrap_or(true);
    }

    let field_filter = &filter["fieldFilter"];
    let path = field_filter["field"]["fieldPath"].as_str().unwrap_or_default();
    let ordering = compare_values(&fields[path], &field_filter["value"]);

    match (field_filter["op"].as_str().unwrap_or_default(), ordering) {
        ("EQUAL", Some(o)) => o == Ordering::Equal,
        ("LESS_THAN", Some(o)) => o == Ordering::Less,
        ("LESS_THAN_OR_EQUAL", Some(o)) => o != Ordering::Greater,
        ("GREATER_THAN", Some(o)) => o == Ordering::Greater,
        ("GREATER_THAN_OR_EQUAL", Some(o)) => o != Ordering::Less,
        _ => false,
    }
}

/// Compare two Firestore values of the same kind
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    for key in ["stringValue", "timestampValue"] {
        if let (Some(x), Some(y)) = (a[key].as_str(), b[key].as_str()) {
            return Some(x.cmp(y));
        }
    }

    let number = |v: &Value| {
        v["doubleValue"].as_f64().or_else(|| match &v["integerValue"] {
            Value::String(s) => s.parse().ok(),
            other => other.as_f64(),
        })
    };
    number(a)?.partial_cmp(&number(b)?)
}
