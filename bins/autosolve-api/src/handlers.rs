// HTTP route handlers for the Autosolve API

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use autosolve_common::report::Report;
use autosolve_common::segment::{questions_from_document, split_questions};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::AppState;

/// Pasted text to segment, or questions already split by the caller
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum QuestionsInput {
    Text(String),
    List(Vec<String>),
}

impl QuestionsInput {
    fn into_questions(self) -> Vec<String> {
        match self {
            QuestionsInput::Text(text) => split_questions(&text),
            QuestionsInput::List(list) => list
                .into_iter()
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty())
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub reg_no: String,
    #[serde(default)]
    pub questions: Option<QuestionsInput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveDocumentRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub reg_no: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Json,
    Markdown,
}

#[derive(Debug, Default, Deserialize)]
pub struct FormatQuery {
    #[serde(default)]
    pub format: ReportFormat,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// Extractor rejections keep axum's status but use the JSON error body
fn rejection_response(status: StatusCode, message: String) -> Response {
    warn!(status = status.as_u16(), error = %message, "Rejected request");
    error_response(status, message)
}

fn missing_identity(name: &str, reg_no: &str) -> Option<Response> {
    if name.trim().is_empty() {
        return Some(error_response(StatusCode::BAD_REQUEST, "Missing required field: name"));
    }
    if reg_no.trim().is_empty() {
        return Some(error_response(StatusCode::BAD_REQUEST, "Missing required field: regNo"));
    }
    None
}

/// GET /status - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// POST /solve - Solve pasted or pre-split questions
pub async fn solve(
    State(state): State<Arc<AppState>>,
    query: Result<Query<FormatQuery>, QueryRejection>,
    payload: Result<Json<SolveRequest>, JsonRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return rejection_response(rejection.status(), rejection.body_text()),
    };
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection.status(), rejection.body_text()),
    };

    if let Some(rejection) = missing_identity(&payload.name, &payload.reg_no) {
        return rejection;
    }

    let questions = payload
        .questions
        .map(QuestionsInput::into_questions)
        .unwrap_or_default();

    run_batch(&state, payload.name.trim(), payload.reg_no.trim(), questions, query.format).await
}

/// POST /solve/document - Solve extracted document text, one question per line
pub async fn solve_document(
    State(state): State<Arc<AppState>>,
    query: Result<Query<FormatQuery>, QueryRejection>,
    payload: Result<Json<SolveDocumentRequest>, JsonRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return rejection_response(rejection.status(), rejection.body_text()),
    };
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection.status(), rejection.body_text()),
    };

    if let Some(rejection) = missing_identity(&payload.name, &payload.reg_no) {
        return rejection;
    }

    let questions = questions_from_document(&payload.text);
    run_batch(&state, payload.name.trim(), payload.reg_no.trim(), questions, query.format).await
}

async fn run_batch(
    state: &AppState,
    name: &str,
    reg_no: &str,
    questions: Vec<String>,
    format: ReportFormat,
) -> Response {
    if questions.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No questions found in request");
    }

    let request_id = Uuid::new_v4();
    let start = Instant::now();
    info!(request_id = %request_id, questions = questions.len(), "Batch request accepted");

    let items = match tokio::time::timeout(state.batch_timeout, state.runner.run(&questions)).await {
        Ok(items) => items,
        Err(_) => {
            error!(
                request_id = %request_id,
                timeout_secs = state.batch_timeout.as_secs(),
                "Batch timed out"
            );
            return error_response(
                StatusCode::GATEWAY_TIMEOUT,
                format!(
                    "Batch did not finish within {}s",
                    state.batch_timeout.as_secs()
                ),
            );
        }
    };

    let report = Report::new(name, reg_no, items);
    info!(
        request_id = %request_id,
        solved = report.summary.solved,
        total = report.summary.total,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Batch request finished"
    );

    match format {
        ReportFormat::Json => (StatusCode::OK, Json(report)).into_response(),
        ReportFormat::Markdown => {
            let disposition = format!("attachment; filename=\"solutions_{}.md\"", request_id);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                report.to_markdown(),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use autosolve_common::types::GenerationResult;
    use autosolve_engine::{BatchRunner, CodeGenerator, Executor, ItemPipeline, RawRun, SandboxEngine};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    /// Code is the question upper-cased; questions containing "fail" exhaust generation
    struct UppercaseGenerator;

    #[async_trait]
    impl CodeGenerator for UppercaseGenerator {
        async fn generate(&self, question: &str) -> GenerationResult {
            if question.contains("fail") {
                GenerationResult::failure("Unable to fetch solution from the API after multiple attempts.")
            } else {
                GenerationResult::Success(question.to_uppercase())
            }
        }
    }

    struct SlowGenerator;

    #[async_trait]
    impl CodeGenerator for SlowGenerator {
        async fn generate(&self, _question: &str) -> GenerationResult {
            tokio::time::sleep(Duration::from_secs(5)).await;
            GenerationResult::Success("late".to_string())
        }
    }

    struct EchoEngine;

    #[async_trait]
    impl SandboxEngine for EchoEngine {
        async fn run(&self, code: &str) -> Result<RawRun> {
            Ok(RawRun {
                output: format!("ran {}\n", code),
                exit_code: Some(0),
                timed_out: false,
                truncated: false,
                execution_time_ms: 1,
            })
        }

        fn name(&self) -> &'static str {
            "echo"
        }
    }

    fn test_app(generator: Arc<dyn CodeGenerator>, batch_timeout: Duration) -> axum::Router {
        let pipeline = ItemPipeline::new(generator, Executor::new(Arc::new(EchoEngine)));
        crate::app(Arc::new(AppState {
            runner: BatchRunner::new(pipeline),
            batch_timeout,
        }))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = test_app(Arc::new(UppercaseGenerator), Duration::from_secs(5));
        let response = app
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn test_solve_pasted_text_is_segmented_in_order() {
        let app = test_app(Arc::new(UppercaseGenerator), Duration::from_secs(5));
        let request = post_json(
            "/solve",
            json!({
                "name": "Ada",
                "regNo": "21BCE0001",
                "questions": "1. add two numbers\n2. this one will fail\n3. reverse a string"
            }),
        );

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let report = body_json(response).await;
        assert_eq!(report["name"], "Ada");
        assert_eq!(report["reg_number"], "21BCE0001");
        assert_eq!(report["summary"]["total"], 3);
        assert_eq!(report["summary"]["solved"], 2);
        assert_eq!(report["summary"]["generation_failed"], 1);

        let items = report["items"].as_array().unwrap();
        assert_eq!(items[0]["question"], "add two numbers");
        assert_eq!(items[0]["code"], "ADD TWO NUMBERS");
        assert_eq!(items[0]["output"], "ran ADD TWO NUMBERS");
        assert_eq!(items[1]["status"], "generation_failed");
        assert!(items[1]["output"].as_str().unwrap().starts_with("Invalid code returned: Error"));
        assert_eq!(items[2]["question"], "reverse a string");
    }

    #[tokio::test]
    async fn test_solve_question_list_drops_blanks() {
        let app = test_app(Arc::new(UppercaseGenerator), Duration::from_secs(5));
        let request = post_json(
            "/solve",
            json!({ "name": "Ada", "regNo": "1", "questions": ["  first ", "", "second"] }),
        );

        let report = body_json(app.oneshot(request).await.unwrap()).await;
        let items = report["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["question"], "first");
        assert_eq!(items[1]["question"], "second");
    }

    #[tokio::test]
    async fn test_solve_document_one_question_per_line() {
        let app = test_app(Arc::new(UppercaseGenerator), Duration::from_secs(5));
        let request = post_json(
            "/solve/document",
            json!({ "name": "Ada", "regNo": "1", "text": "sum a list\n\n  print a triangle  \n" }),
        );

        let report = body_json(app.oneshot(request).await.unwrap()).await;
        let items = report["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["question"], "print a triangle");
    }

    #[tokio::test]
    async fn test_markdown_format_is_attachment() {
        let app = test_app(Arc::new(UppercaseGenerator), Duration::from_secs(5));
        let request = post_json(
            "/solve?format=markdown",
            json!({ "name": "Ada", "regNo": "1", "questions": ["hello"] }),
        );

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"solutions_"));
        assert!(disposition.ends_with(".md\""));

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let markdown = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(markdown.contains("# Name: Ada"));
        assert!(markdown.contains("## Question 1:"));
        assert!(markdown.contains("ran HELLO"));
    }

    #[tokio::test]
    async fn test_missing_fields_are_bad_requests() {
        let app = test_app(Arc::new(UppercaseGenerator), Duration::from_secs(5));

        let response = app
            .clone()
            .oneshot(post_json("/solve", json!({ "regNo": "1", "questions": ["q"] })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Missing required field: name");

        let response = app
            .clone()
            .oneshot(post_json("/solve", json!({ "name": "Ada", "questions": ["q"] })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(post_json("/solve/document", json!({ "name": "Ada", "regNo": "1", "text": "  \n" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "No questions found in request");
    }

    #[tokio::test]
    async fn test_extractor_rejections_use_json_error_body() {
        let app = test_app(Arc::new(UppercaseGenerator), Duration::from_secs(5));

        let malformed = Request::builder()
            .method("POST")
            .uri("/solve")
            .header("content-type", "application/json")
            .body(Body::from("{ not json"))
            .unwrap();
        let response = app.clone().oneshot(malformed).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());

        let no_content_type = Request::builder()
            .method("POST")
            .uri("/solve/document")
            .body(Body::from(r#"{"name":"Ada","regNo":"1","text":"q"}"#))
            .unwrap();
        let response = app.clone().oneshot(no_content_type).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(body_json(response).await["error"].is_string());

        let wrong_type = post_json("/solve", json!({ "name": "Ada", "regNo": "1", "questions": 5 }));
        let response = app.clone().oneshot(wrong_type).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_json(response).await["error"].is_string());

        let bad_format = post_json("/solve?format=docx", json!({ "name": "Ada", "regNo": "1", "questions": ["q"] }));
        let response = app.oneshot(bad_format).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_batch_timeout_is_gateway_timeout() {
        let app = test_app(Arc::new(SlowGenerator), Duration::from_millis(50));
        let request = post_json("/solve", json!({ "name": "Ada", "regNo": "1", "questions": ["q"] }));

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert!(body_json(response).await["error"].as_str().unwrap().contains("did not finish"));
    }
}
