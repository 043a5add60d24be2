//! Analysis pipeline against a local stub endpoint.
//!
//! The stub is an axum router on an ephemeral port that answers each chat
//! request according to a per-test handler and records what it received.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use findex::analysis::{
    AnalysisClient, AnalysisClientConfig, AnalysisDispatcher, AnalysisOutcome, InFlight,
};
use findex::models::{FileRecord, StoredFile};

/// How the stub answers one request.
struct StubReply {
    delay: Duration,
    status: u16,
    body: String,
}

impl StubReply {
    fn ok(body: impl Into<String>) -> Self {
        Self {
            delay: Duration::ZERO,
            status: 200,
            body: body.into(),
        }
    }
}

/// One request as the stub saw it.
#[derive(Debug)]
struct Received {
    path: String,
    authorization: Option<String>,
    body: String,
}

/// Maps a request body to the reply.
type Handler = Arc<dyn Fn(&str) -> StubReply + Send + Sync>;

struct StubState {
    handler: Handler,
    received: mpsc::UnboundedSender<Received>,
}

/// Start a stub server. Returns its URL and a receiver of the requests it saw.
async fn start_stub(handler: Handler) -> (String, mpsc::UnboundedReceiver<Received>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let state = Arc::new(StubState {
        handler,
        received: tx,
    });
    let app = Router::new()
        .route("/chat/completions", post(chat))
        .with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}/chat/completions"), rx)
}

async fn chat(
    State(state): State<Arc<StubState>>,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let reply = (state.handler)(&body);
    let _ = state.received.send(Received {
        path: uri.path().to_string(),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });
    tokio::time::sleep(reply.delay).await;
    (
        StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        [(header::CONTENT_TYPE, "application/json")],
        reply.body,
    )
}

fn record(path: &str, size: i64) -> FileRecord {
    StoredFile::new(path, size)
        .with_times(132_539_328_000_000_000, 0, 132_539_328_000_000_000)
        .to_record()
}

fn client_for(url: &str, request_timeout: Duration) -> AnalysisClient {
    AnalysisClient::new(AnalysisClientConfig {
        endpoint: url.to_string(),
        model: "test-model".into(),
        api_key: "sk-test".into(),
        connect_timeout: Duration::from_secs(2),
        request_timeout,
    })
    .unwrap()
}

#[tokio::test]
async fn answer_is_extracted_from_content_field() {
    let (url, mut requests) = start_stub(Arc::new(|_: &str| {
        StubReply::ok(r#"{"id":"1","choices":[{"index":0,"message":{"role":"assistant","content":"Risk: 10"}}]}"#)
    }))
    .await;
    let client = client_for(&url, Duration::from_secs(5));

    let outcome = client.analyze(&record("/d/report.txt", 120)).await;
    assert_eq!(outcome, AnalysisOutcome::Answer("Risk: 10".into()));

    let request = requests.recv().await.unwrap();
    assert_eq!(request.path, "/chat/completions");
    assert_eq!(request.authorization.as_deref(), Some("Bearer sk-test"));
    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["model"], "test-model");
    assert_eq!(body["stream"], false);
    assert_eq!(body["messages"][0]["role"], "user");
    let prompt = body["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.contains("report.txt"));
    assert!(prompt.contains("120 bytes"));
}

#[tokio::test]
async fn embedded_newlines_are_unescaped() {
    let (url, _requests) = start_stub(Arc::new(|_: &str| {
        StubReply::ok(r#"{"choices":[{"message":{"content":"1. cache\n2. Risk: 5\n3. delete"}}]}"#)
    }))
    .await;
    let outcome = client_for(&url, Duration::from_secs(5))
        .analyze(&record("/d/a.tmp", 1))
        .await;
    assert_eq!(outcome.text(), "1. cache\n2. Risk: 5\n3. delete");
}

#[tokio::test]
async fn timeout_becomes_failure_message() {
    let (url, _requests) = start_stub(Arc::new(|_: &str| StubReply {
        delay: Duration::from_secs(5),
        ..StubReply::ok("{}")
    }))
    .await;
    let client = client_for(&url, Duration::from_millis(300));

    let outcome = client.analyze(&record("/d/slow.bin", 1)).await;
    assert!(outcome.is_failure());
    assert!(outcome.text().contains("analysis failed"), "{outcome}");
    assert!(outcome.text().contains("timed out"), "{outcome}");
}

#[tokio::test]
async fn error_status_becomes_failure_message() {
    let (url, _requests) = start_stub(Arc::new(|_: &str| StubReply {
        status: 401,
        ..StubReply::ok(r#"{"error":{"message":"bad key"}}"#)
    }))
    .await;
    let outcome = client_for(&url, Duration::from_secs(5))
        .analyze(&record("/d/a.txt", 1))
        .await;
    assert!(outcome.is_failure());
    assert!(outcome.text().contains("401"), "{outcome}");
}

#[tokio::test]
async fn body_without_content_is_a_failure() {
    let (url, _requests) = start_stub(Arc::new(|_: &str| StubReply::ok(r#"{"choices":[]}"#))).await;
    let outcome = client_for(&url, Duration::from_secs(5))
        .analyze(&record("/d/a.txt", 1))
        .await;
    assert!(outcome.is_failure());
}

#[tokio::test]
async fn unreachable_endpoint_is_a_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let outcome = client_for(&format!("http://{addr}/"), Duration::from_secs(2))
        .analyze(&record("/d/a.txt", 1))
        .await;
    assert!(outcome.is_failure());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_requests_finish_independently() {
    // The slow file answers after the fast one, even though it was sent first.
    let (url, _requests) = start_stub(Arc::new(|body: &str| {
        if body.contains("slow.bin") {
            StubReply {
                delay: Duration::from_millis(600),
                ..StubReply::ok(r#"{"content":"slow answer"}"#)
            }
        } else {
            StubReply::ok(r#"{"content":"fast answer"}"#)
        }
    }))
    .await;
    let client = Arc::new(client_for(&url, Duration::from_secs(5)));
    let (mut dispatcher, mut events) = AnalysisDispatcher::new(client);
    let mut inflight = InFlight::new();

    let slow = dispatcher.submit(record("/d/slow.bin", 1));
    inflight.show(slow, "/d/slow.bin");
    let fast = dispatcher.submit(record("/d/fast.bin", 2));
    inflight.show(fast, "/d/fast.bin");
    assert_ne!(slow, fast);
    assert_eq!(inflight.len(), 2);

    let first = events.recv().await.unwrap();
    assert_eq!(first.id, fast);
    assert_eq!(first.outcome.text(), "fast answer");
    assert!(inflight.finish(&first));
    assert!(inflight.is_showing(slow));
    assert!(!inflight.is_showing(fast));

    let second = events.recv().await.unwrap();
    assert_eq!(second.id, slow);
    assert_eq!(second.path, "/d/slow.bin");
    assert_eq!(second.outcome.text(), "slow answer");
    assert!(inflight.finish(&second));
    assert!(inflight.is_empty());
}
