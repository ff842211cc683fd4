//! Mock target service for tests.
//!
//! Serves the target HTTP contract (`/health`, `/api/hello`,
//! `/api/calculate`) from an axum router on a background tokio runtime.
//! Failures are scriptable per route and requests are counted.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, Uri},
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::sync::oneshot;

use crate::target::Target;

#[derive(Default)]
struct MockState {
    health_failures_left: Mutex<usize>,
    reported_status: Mutex<Option<String>>,
    overrides: Mutex<HashMap<String, u16>>,
    hits: Mutex<HashMap<String, usize>>,
}

impl MockState {
    fn hit(&self, path: &str) {
        *self
            .hits
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default() += 1;
    }

    fn overridden(&self, path: &str) -> Option<(StatusCode, Json<Value>)> {
        let status = *self.overrides.lock().unwrap().get(path)?;
        let code = StatusCode::from_u16(status).unwrap();
        Some((code, Json(json!({"error": "injected failure"}))))
    }
}

type Reply = (StatusCode, Json<Value>);

async fn health(State(state): State<Arc<MockState>>) -> Reply {
    state.hit("/health");
    if let Some(reply) = state.overridden("/health") {
        return reply;
    }
    {
        let mut left = state.health_failures_left.lock().unwrap();
        if *left > 0 {
            *left -= 1;
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "starting"})),
            );
        }
    }
    let status = state
        .reported_status
        .lock()
        .unwrap()
        .clone()
        .unwrap_or_else(|| "healthy".to_string());
    (
        StatusCode::OK,
        Json(json!({
            "status": status,
            "timestamp": "2026-01-01T00:00:00.000Z",
            "version": "1.0.0",
        })),
    )
}

async fn hello(State(state): State<Arc<MockState>>) -> Reply {
    state.hit("/api/hello");
    if let Some(reply) = state.overridden("/api/hello") {
        return reply;
    }
    (
        StatusCode::OK,
        Json(json!({"message": "Hello, World!", "version": "1.0.0"})),
    )
}

fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn bad_request(message: &str) -> Reply {
    (StatusCode::BAD_REQUEST, Json(json!({"error": message})))
}

async fn calculate(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Reply {
    state.hit("/api/calculate");
    if let Some(reply) = state.overridden("/api/calculate") {
        return reply;
    }
    let Some(operation) = body.get("operation").and_then(Value::as_str) else {
        return bad_request("Missing required fields");
    };
    if body.get("a").is_none() || body.get("b").is_none() {
        return bad_request("Missing required fields");
    }
    let (Some(a), Some(b)) = (number(body.get("a")), number(body.get("b"))) else {
        return bad_request("Invalid number format");
    };
    let result = match operation {
        "add" => a + b,
        "subtract" => a - b,
        "multiply" => a * b,
        "divide" if b == 0.0 => return bad_request("Division by zero"),
        "divide" => a / b,
        _ => return bad_request("Invalid operation"),
    };
    (
        StatusCode::OK,
        Json(json!({"result": result, "operation": operation, "a": a, "b": b})),
    )
}

async fn not_found(State(state): State<Arc<MockState>>, uri: Uri) -> Reply {
    state.hit(uri.path());
    (StatusCode::NOT_FOUND, Json(json!({"error": "Not found"})))
}

/// Running mock target; shut down on drop.
pub struct MockTarget {
    addr: SocketAddr,
    state: Arc<MockState>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl MockTarget {
    pub fn start() -> Self {
        let state = Arc::new(MockState::default());
        let router = Router::new()
            .route("/health", get(health))
            .route("/api/hello", get(hello))
            .route("/api/calculate", post(calculate))
            .fallback(not_found)
            .with_state(state.clone());

        let (addr_tx, addr_rx) = std::sync::mpsc::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("mock runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind mock target");
                addr_tx
                    .send(listener.local_addr().expect("mock address"))
                    .expect("report mock address");
                axum::serve(listener, router)
                    .with_graceful_shutdown(async {
                        let _ = shutdown_rx.await;
                    })
                    .await
                    .expect("serve mock target");
            });
        });

        let addr = addr_rx
            .recv_timeout(Duration::from_secs(10))
            .expect("mock target did not start");
        Self {
            addr,
            state,
            shutdown: Some(shutdown_tx),
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn target(&self) -> Target {
        Target::new(&self.url(), Duration::from_secs(2), Duration::from_secs(2))
    }

    /// Answer the next `count` health probes with 503.
    pub fn fail_health(&self, count: usize) {
        *self.state.health_failures_left.lock().unwrap() = count;
    }

    /// Report this `status` value from `/health` with a 200.
    pub fn report_status(&self, status: &str) {
        *self.state.reported_status.lock().unwrap() = Some(status.to_string());
    }

    /// Answer every request to `path` with `status`.
    pub fn override_status(&self, path: &str, status: u16) {
        self.state
            .overrides
            .lock()
            .unwrap()
            .insert(path.to_string(), status);
    }

    pub fn requests_to(&self, path: &str) -> usize {
        self.state
            .hits
            .lock()
            .unwrap()
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    pub fn health_requests(&self) -> usize {
        self.requests_to("/health")
    }
}

impl Drop for MockTarget {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// A local port with nothing listening on it.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind probe port");
    listener.local_addr().expect("probe port").port()
}
