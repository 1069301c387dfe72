//! Router-level tests for the JSON API and the web shell.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use ezviewer_core::{Config, Registry};
use ezviewer_server::{router, AppState};
use http_body_util::BodyExt;
use tokio::sync::watch;
use tower::ServiceExt;

struct TestApp {
    dir: tempfile::TempDir,
    registry: Registry,
    _shutdown: watch::Sender<bool>,
    state: AppState,
}

impl TestApp {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::open(dir.path().join("tracked_logs.json"));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = AppState {
            registry: registry.clone(),
            config: Arc::new(Config::default()),
            shutdown: shutdown_rx,
        };
        Self {
            dir,
            registry,
            _shutdown: shutdown_tx,
            state,
        }
    }

    fn track(&self, alias: &str, lines: usize) {
        let path = self.dir.path().join(format!("{alias}.log"));
        let body: String = (1..=lines).map(|i| format!("line {i}\n")).collect();
        std::fs::write(&path, body).unwrap();
        self.registry.add(alias, &path).unwrap();
    }

    async fn get(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = router(self.state.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.to_vec())
    }

    async fn get_json(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        let (status, body) = self.get(uri).await;
        (status, serde_json::from_slice(&body).unwrap())
    }
}

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let app = TestApp::new();
    let (status, body) = app.get_json("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn logs_endpoint_lists_aliases() {
    let app = TestApp::new();
    app.track("api", 1);
    app.track("worker", 1);

    let (status, body) = app.get_json("/api/logs").await;
    assert_eq!(status, StatusCode::OK);
    let logs = body.as_object().unwrap();
    assert_eq!(logs.len(), 2);
    assert!(logs["api"].as_str().unwrap().ends_with("api.log"));
}

#[tokio::test]
async fn history_top_then_up() {
    let app = TestApp::new();
    app.track("api", 1000);

    let (status, top) = app
        .get_json("/api/history?alias=api&direction=top&count=500")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(top["start_line"], 1);
    assert_eq!(top["end_line"], 500);
    assert_eq!(top["has_more"], true);
    assert_eq!(top["total_lines"], 1000);
    assert_eq!(top["lines"].as_array().unwrap().len(), 500);

    let (status, up) = app
        .get_json("/api/history?alias=api&direction=up&before_line=1&count=500")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(up["lines"].as_array().unwrap().is_empty());
    assert_eq!(up["has_more"], false);
}

#[tokio::test]
async fn history_up_returns_preceding_page() {
    let app = TestApp::new();
    app.track("api", 1000);

    let (_, page) = app
        .get_json("/api/history?alias=api&direction=up&before_line=501&count=100")
        .await;
    assert_eq!(page["start_line"], 401);
    assert_eq!(page["end_line"], 500);
    assert_eq!(page["lines"][0], "line 401");
    assert_eq!(page["has_more"], true);
}

#[tokio::test]
async fn history_unknown_alias_is_error_with_empty_lines() {
    let app = TestApp::new();
    let (status, body) = app
        .get_json("/api/history?alias=ghost&direction=top&count=10")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "ghost not found");
    assert_eq!(body["lines"], serde_json::json!([]));
}

#[tokio::test]
async fn history_rejects_zero_count() {
    let app = TestApp::new();
    app.track("api", 10);
    let (status, body) = app
        .get_json("/api/history?alias=api&direction=top&count=0")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["lines"], serde_json::json!([]));
}

#[tokio::test]
async fn history_malformed_query_is_json_error() {
    let app = TestApp::new();
    app.track("api", 10);

    for uri in [
        "/api/history?alias=api&direction=down&count=5",
        "/api/history?alias=api&count=5",
        "/api/history?alias=api&direction=up&before_line=abc",
    ] {
        let (status, body) = app.get_json(uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].as_str().unwrap().contains("query"), "{uri}");
        assert_eq!(body["lines"], serde_json::json!([]), "{uri}");
    }
}

#[tokio::test]
async fn index_inlines_alias_table() {
    let app = TestApp::new();
    app.track("api", 1);
    let (status, body) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("const ALIASES = {\"api\":"));
}
