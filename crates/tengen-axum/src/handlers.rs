//! Request handlers for the analysis facade.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

use tengen_core::domain::{Document, doc};

use crate::error::HttpError;
use crate::state::AppState;

/// Body of `POST /analyze`.
///
/// Field names follow the engine's analysis protocol, so the validated
/// request serializes directly into the query document. Unset optional
/// fields are omitted rather than sent as null.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyzeRequest {
    pub id: String,
    pub moves: Vec<(String, String)>,
    pub initial_stones: Vec<(String, String)>,
    pub rules: String,
    pub komi: f64,
    pub board_x_size: u32,
    pub board_y_size: u32,
    pub include_policy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_visits: Option<u32>,
    pub priority: i32,
}

impl Default for AnalyzeRequest {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            moves: Vec::new(),
            initial_stones: Vec::new(),
            rules: "Chinese".to_string(),
            komi: 7.5,
            board_x_size: 19,
            board_y_size: 19,
            include_policy: true,
            max_visits: None,
            priority: 0,
        }
    }
}

impl AnalyzeRequest {
    fn into_document(self) -> Result<Document, HttpError> {
        match serde_json::to_value(&self) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(_) => Err(HttpError::Internal(
                "query did not serialize to an object".to_string(),
            )),
            Err(err) => Err(HttpError::Internal(err.to_string())),
        }
    }
}

/// Response from the health endpoint.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub pid: u32,
}

/// Submit one analysis query and return the engine's response document
/// verbatim, engine-side `error` fields included.
///
/// POST /analyze
pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<Document>, HttpError> {
    let query = request.into_document()?;
    let response = state.engine.submit(query).await.map_err(|err| {
        error!(target: "tengen.api", error = %err, "analysis failed");
        HttpError::from(err)
    })?;
    // Engine-side request errors are well-formed responses; the caller
    // gets the document as-is, error field included.
    if doc::has_error(&response) {
        warn!(
            target: "tengen.api",
            id = doc::correlation_id(&response).unwrap_or(""),
            "engine rejected the query"
        );
    }
    Ok(Json(response))
}

/// Liveness of the engine process.
///
/// GET /health
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, HttpError> {
    let status = state.engine.status().await;
    if status.running {
        return Ok(Json(HealthResponse {
            status: "ok",
            pid: status.pid.unwrap_or_default(),
        }));
    }
    match status.exit_code {
        Some(code) => Err(HttpError::ServiceUnavailable(format!(
            "engine process exited with code {code}"
        ))),
        None => Err(HttpError::ServiceUnavailable(
            "engine process not running".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_fills_defaults_and_generates_an_id() {
        let request: AnalyzeRequest = serde_json::from_str("{}").unwrap();
        assert!(!request.id.is_empty());
        assert_eq!(request.rules, "Chinese");
        assert_eq!(request.board_x_size, 19);

        let doc = request.into_document().unwrap();
        assert!(doc.contains_key("id"));
        assert!(!doc.contains_key("maxVisits"), "unset field must be omitted");
    }

    #[test]
    fn protocol_field_names_survive_the_round_trip() {
        let request: AnalyzeRequest = serde_json::from_str(
            r#"{"id":"q1","moves":[["B","Q4"]],"boardXSize":9,"boardYSize":9,"maxVisits":50}"#,
        )
        .unwrap();
        let doc = request.into_document().unwrap();
        assert_eq!(doc.get("boardXSize"), Some(&serde_json::json!(9)));
        assert_eq!(doc.get("maxVisits"), Some(&serde_json::json!(50)));
        assert_eq!(doc.get("moves"), Some(&serde_json::json!([["B", "Q4"]])));
    }
}
