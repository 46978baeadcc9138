//! HTTP surface tests driven through `tower::ServiceExt::oneshot`.

use anyhow::Result;
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use vedabot::history::HistoryStore;
use vedabot::llm::{LanguageModel, LlmError};
use vedabot::models::{ChatEntry, DocumentChunk};
use vedabot::prompt::PromptTemplate;
use vedabot::query::{QueryHandler, QUERY_FALLBACK};
use vedabot::retriever::Retriever;
use vedabot::server::{router, AppState};

struct OneChunk;

#[async_trait]
impl Retriever for OneChunk {
    async fn retrieve(&self, _question: &str, _k: usize) -> Result<Vec<DocumentChunk>> {
        Ok(vec![DocumentChunk::new(
            "cold.md#0",
            "cold.md",
            "Ginger tea with honey soothes a cold.",
        )])
    }
}

struct Echo;

#[async_trait]
impl LanguageModel for Echo {
    fn model_name(&self) -> &str {
        "echo"
    }
    async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
        Ok("Drink ginger tea.".to_string())
    }
}

struct Bulleted;

#[async_trait]
impl LanguageModel for Bulleted {
    fn model_name(&self) -> &str {
        "bulleted"
    }
    async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
        Ok("- **Ginger** tea\n- _Tulsi_ <script>alert(1)</script>".to_string())
    }
}

struct Down;

#[async_trait]
impl LanguageModel for Down {
    fn model_name(&self) -> &str {
        "down"
    }
    async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::EmptyResponse)
    }
}

fn app_with(model: Arc<dyn LanguageModel>, tmp: &TempDir) -> axum::Router {
    let handler = QueryHandler::new(Arc::new(OneChunk), model, PromptTemplate::default(), 2);
    let history = HistoryStore::new(tmp.path().join("history"));
    router(AppState::new(Arc::new(handler), Arc::new(history)))
}

fn app(tmp: &TempDir) -> axum::Router {
    app_with(Arc::new(Echo), tmp)
}

fn json_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let tmp = TempDir::new().unwrap();
    let response = app(&tmp).oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_api_ask_records_history() {
    let tmp = TempDir::new().unwrap();
    let app = app(&tmp);

    let response = app
        .clone()
        .oneshot(json_post(
            "/api/ask",
            r#"{"question": "cold remedy", "user": "ravi"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let entry: ChatEntry = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(entry.question, "cold remedy");
    assert_eq!(entry.response.result, "Drink ginger tea.");
    assert_eq!(entry.response.source_documents[0].source, "cold.md");

    let response = app.oneshot(get("/api/history/ravi")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let entries = body_json(response).await;
    assert_eq!(entries.as_array().unwrap().len(), 1);
    assert_eq!(entries[0]["question"], "cold remedy");
}

#[tokio::test]
async fn test_api_ask_blank_question_is_bad_request() {
    let tmp = TempDir::new().unwrap();
    let response = app(&tmp)
        .oneshot(json_post("/api/ask", r#"{"question": "   "}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_api_ask_invalid_user_is_bad_request() {
    let tmp = TempDir::new().unwrap();
    let response = app(&tmp)
        .oneshot(json_post(
            "/api/ask",
            r#"{"question": "cold", "user": "a/b"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_api_ask_pipeline_failure_returns_fallback() {
    let tmp = TempDir::new().unwrap();
    let response = app_with(Arc::new(Down), &tmp)
        .oneshot(json_post("/api/ask", r#"{"question": "cold remedy"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["response"]["result"], QUERY_FALLBACK);
}

#[tokio::test]
async fn test_api_clear_history() {
    let tmp = TempDir::new().unwrap();
    let app = app(&tmp);

    app.clone()
        .oneshot(json_post("/api/ask", r#"{"question": "cold remedy"}"#))
        .await
        .unwrap();

    let delete = Request::builder()
        .method("DELETE")
        .uri("/api/history/default")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(delete).await.unwrap();
    assert_eq!(body_json(response).await["cleared"], true);

    let response = app.oneshot(get("/api/history/default")).await.unwrap();
    assert!(body_json(response).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_form_ask_redirects_to_page() {
    let tmp = TempDir::new().unwrap();
    let app = app(&tmp);

    let request = Request::builder()
        .method("POST")
        .uri("/ask")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from("user=meera&question=cold+remedy"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert!(response.status().is_redirection());
    assert_eq!(response.headers()["location"], "/?user=meera");

    let response = app.oneshot(get("/?user=meera")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("cold remedy"));
    assert!(html.contains("Drink ginger tea."));
}

#[tokio::test]
async fn test_page_renders_answer_as_html() {
    let tmp = TempDir::new().unwrap();
    let app = app_with(Arc::new(Bulleted), &tmp);

    let request = Request::builder()
        .method("POST")
        .uri("/ask")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from("question=cold"))
        .unwrap();
    app.clone().oneshot(request).await.unwrap();

    let response = app.oneshot(get("/")).await.unwrap();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("<h3>🌿 Ayurvedic Insights</h3>"));
    assert!(html.contains("<strong>Ginger</strong>"));
    assert!(html.contains("<em>Tulsi</em>"));
    assert!(html.contains("<strong>Note:</strong>"));
    assert!(!html.contains("<script>"));
    assert!(!html.contains("**Ginger**"));
}
