//! Integration tests for the `/analyze` and `/health` endpoints.
//!
//! A scripted in-memory engine stands in for the real process broker so
//! every error mapping can be exercised without spawning anything.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use tower::ServiceExt;

use tengen_axum::{ApiContext, create_router};
use tengen_core::domain::Document;
use tengen_core::error::{EngineError, EngineResult};
use tengen_core::ports::{AnalysisEngine, EngineStatus};

/// What the scripted engine does with each submit.
enum Script {
    Echo,
    Fail(EngineError),
}

struct ScriptedEngine {
    script: Script,
    status: EngineStatus,
}

impl ScriptedEngine {
    fn echo() -> Self {
        Self {
            script: Script::Echo,
            status: EngineStatus {
                running: true,
                pid: Some(4242),
                exit_code: None,
            },
        }
    }

    fn failing(err: EngineError, status: EngineStatus) -> Self {
        Self {
            script: Script::Fail(err),
            status,
        }
    }
}

#[async_trait]
impl AnalysisEngine for ScriptedEngine {
    async fn submit(&self, query: Document) -> EngineResult<Document> {
        match &self.script {
            Script::Echo => Ok(query),
            Script::Fail(err) => Err(err.clone()),
        }
    }

    async fn status(&self) -> EngineStatus {
        self.status
    }

    async fn shutdown(&self) {}
}

fn app(engine: ScriptedEngine) -> axum::Router {
    create_router(Arc::new(ApiContext {
        engine: Arc::new(engine),
    }))
}

fn analyze_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/analyze")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    serde_json::from_slice(&bytes).expect("valid JSON body")
}

#[tokio::test]
async fn analyze_returns_the_engine_document_verbatim() {
    let response = app(ScriptedEngine::echo())
        .oneshot(analyze_request(r#"{"id":"q1","moves":[["B","Q4"]]}"#))
        .await
        .expect("infallible");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["id"], "q1");
    assert_eq!(body["moves"][0][1], "Q4");
    assert_eq!(body["rules"], "Chinese");
    assert_eq!(body["komi"], 7.5);
}

#[tokio::test]
async fn analyze_generates_an_id_when_none_is_sent() {
    let response = app(ScriptedEngine::echo())
        .oneshot(analyze_request("{}"))
        .await
        .expect("infallible");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let id = body["id"].as_str().expect("id is a string");
    assert!(!id.is_empty());
}

#[tokio::test]
async fn dead_engine_maps_to_503() {
    let engine = ScriptedEngine::failing(
        EngineError::terminated(Some(137)),
        EngineStatus {
            running: false,
            pid: None,
            exit_code: Some(137),
        },
    );
    let response = app(engine)
        .oneshot(analyze_request(r#"{"id":"q1"}"#))
        .await
        .expect("infallible");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert!(body["error"].as_str().expect("error message").contains("137"));
}

#[tokio::test]
async fn spawn_failure_maps_to_503() {
    let engine = ScriptedEngine::failing(
        EngineError::spawn("no such binary"),
        EngineStatus::default(),
    );
    let response = app(engine)
        .oneshot(analyze_request(r#"{"id":"q1"}"#))
        .await
        .expect("infallible");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn duplicate_in_flight_id_maps_to_409() {
    let engine = ScriptedEngine::failing(
        EngineError::protocol("correlation id already in flight: q1"),
        EngineStatus {
            running: true,
            pid: Some(4242),
            exit_code: None,
        },
    );
    let response = app(engine)
        .oneshot(analyze_request(r#"{"id":"q1"}"#))
        .await
        .expect("infallible");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn malformed_body_is_a_client_error() {
    let response = app(ScriptedEngine::echo())
        .oneshot(analyze_request("this is not json"))
        .await
        .expect("infallible");

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn health_reports_the_running_pid() {
    let response = app(ScriptedEngine::echo())
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("infallible");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["pid"], 4242);
}

#[tokio::test]
async fn health_is_503_when_the_engine_is_down() {
    let engine = ScriptedEngine::failing(
        EngineError::terminated(Some(1)),
        EngineStatus {
            running: false,
            pid: None,
            exit_code: Some(1),
        },
    );
    let response = app(engine)
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("infallible");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert!(
        body["error"]
            .as_str()
            .expect("error message")
            .contains("exited with code 1")
    );
}
