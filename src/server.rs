//! Web UI and JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Chat page for `?user=` (default `default`) |
//! | `POST` | `/ask` | Form submit: answer a question, save it, redirect to `/` |
//! | `POST` | `/history/clear` | Form submit: clear a user's log |
//! | `POST` | `/api/ask` | JSON `{question, user?}` → saved chat entry |
//! | `GET`  | `/api/history/{user}` | A user's chat log |
//! | `DELETE` | `/api/history/{user}` | Clear a user's log |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `internal` (500). Pipeline failures are
//! not errors: they come back as the fallback answer.

use axum::{
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::format::{escape_html, format_response, render_markdown};
use crate::history::{validate_user, HistoryStore, DEFAULT_USER};
use crate::models::ChatEntry;
use crate::query::QueryHandler;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    handler: Arc<QueryHandler>,
    history: Arc<HistoryStore>,
    consult_url: Option<Arc<str>>,
}

impl AppState {
    pub fn new(handler: Arc<QueryHandler>, history: Arc<HistoryStore>) -> Self {
        Self {
            handler,
            history,
            consult_url: None,
        }
    }

    /// Show a "Consult Nearest Doctor" link pointing at `url` on the chat page.
    pub fn with_consult_url(mut self, url: Option<String>) -> Self {
        self.consult_url = url.filter(|u| !u.trim().is_empty()).map(Arc::from);
        self
    }
}

/// Starts the web server on `[server].bind`.
///
/// The query pipeline is built before binding, so configuration problems
/// (missing access token, missing index) stop startup.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let handler = Arc::new(QueryHandler::from_config(config)?);
    let history = Arc::new(HistoryStore::new(config.history.dir.clone()));
    let state = AppState::new(handler, history).with_consult_url(config.server.consult_url.clone());
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "Vedabot listening");
    println!("Vedabot listening on http://{}", config.server.bind);

    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_page))
        .route("/ask", post(handle_form_ask))
        .route("/history/clear", post(handle_form_clear))
        .route("/api/ask", post(handle_api_ask))
        .route(
            "/api/history/{user}",
            get(handle_api_history).delete(handle_api_clear),
        )
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    tracing::error!(error = %format!("{:#}", err), "request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: err.to_string(),
    }
}

fn resolve_user(user: Option<String>) -> Result<String, AppError> {
    let user = user
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_USER.to_string());
    validate_user(&user).map_err(|e| bad_request(e.to_string()))?;
    Ok(user)
}

/// Run the pipeline and record the exchange. A failed save is logged, not surfaced.
async fn answer_and_record(state: &AppState, user: &str, question: &str) -> ChatEntry {
    let response = state.handler.handle(question).await;
    let entry = ChatEntry::new(question, response);
    if let Err(e) = state.history.append(user, entry.clone()).await {
        tracing::error!(user, error = %format!("{:#}", e), "failed to save chat history");
    }
    entry
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ HTML UI ============

#[derive(Deserialize)]
struct UserParams {
    user: Option<String>,
}

#[derive(Deserialize)]
struct AskForm {
    user: Option<String>,
    question: String,
}

async fn handle_page(
    State(state): State<AppState>,
    Query(params): Query<UserParams>,
) -> Result<Html<String>, AppError> {
    let user = resolve_user(params.user)?;
    let entries = state.history.load(&user).await.map_err(internal)?;
    Ok(Html(render_page(&user, &entries, state.consult_url.as_deref())))
}

async fn handle_form_ask(
    State(state): State<AppState>,
    Form(form): Form<AskForm>,
) -> Result<Redirect, AppError> {
    let user = resolve_user(form.user)?;
    let question = form.question.trim();
    if !question.is_empty() {
        answer_and_record(&state, &user, question).await;
    }
    Ok(Redirect::to(&format!("/?user={}", user)))
}

async fn handle_form_clear(
    State(state): State<AppState>,
    Form(params): Form<UserParams>,
) -> Result<Redirect, AppError> {
    let user = resolve_user(params.user)?;
    state.history.clear(&user).await.map_err(internal)?;
    Ok(Redirect::to(&format!("/?user={}", user)))
}

const PAGE_STYLE: &str = "\
body{font-family:system-ui,sans-serif;margin:0;background:#f6f3ea;color:#1f2a1f}\
.main-header{background:#2f5d34;color:#fff;padding:24px 32px}\
.main-header h1{margin:0}.main-header h2{margin:4px 0 0;font-weight:400}\
.layout{display:flex;gap:24px;padding:24px 32px}\
.chat{flex:2}.sidebar{flex:1;background:#fff;padding:16px;border-radius:8px}\
.bubble{padding:12px 16px;border-radius:12px;margin:8px 0;white-space:pre-wrap}\
.question{background:#dfeedd;margin-left:20%}\
.answer{background:#fff;margin-right:10%;border:1px solid #d8d2c0;white-space:normal}\
.meta{font-size:12px;color:#6b6b6b}\
form.ask{display:flex;gap:8px}form.ask input[type=text]{flex:1;padding:8px}\
footer{text-align:center;padding:24px;color:#000}";

fn render_page(user: &str, entries: &[ChatEntry], consult_url: Option<&str>) -> String {
    let user = escape_html(user);
    let mut html = String::with_capacity(4096);

    html.push_str("<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">");
    html.push_str("<title>Vedabot - Your Health Companion</title>");
    html.push_str(&format!("<style>{}</style></head><body>", PAGE_STYLE));
    html.push_str(
        "<div class=\"main-header\"><h1>Welcome to Vedabot</h1>\
         <h2>Your Home Remedies Buddy</h2>\
         <p>Explore health solutions based on Ayurvedic knowledge</p></div>",
    );

    html.push_str("<div class=\"layout\"><div class=\"chat\">");
    html.push_str(&format!(
        "<form class=\"ask\" method=\"post\" action=\"/ask\">\
         <input type=\"hidden\" name=\"user\" value=\"{user}\">\
         <input type=\"text\" name=\"question\" \
         placeholder=\"e.g., What are Ayurvedic remedies for cold?\" \
         aria-label=\"Ask your health-related question here\">\
         <button type=\"submit\">Submit</button></form>"
    ));

    for entry in entries {
        html.push_str(&format!(
            "<div class=\"bubble question\"><div class=\"meta\">{}</div>{}</div>",
            escape_html(entry.time_display()),
            escape_html(entry.question_display())
        ));
        if !entry.response.result.is_empty() {
            html.push_str(&format!(
                "<div class=\"bubble answer\">{}</div>",
                render_markdown(&format_response(&entry.response.result))
            ));
        }
    }
    html.push_str("</div>");

    html.push_str("<div class=\"sidebar\"><h3>Vedabot</h3><p>Your Ayurvedic Chatbot Assistant</p>");
    html.push_str(
        "<p><strong>Instructions:</strong></p><ul>\
         <li>Enter your query related to health.</li>\
         <li>Receive Ayurvedic insights.</li>\
         <li>In case of severe problem consult the Doctor</li></ul>",
    );
    if !entries.is_empty() {
        html.push_str("<h3>💬 Chat History</h3><ul>");
        for entry in entries {
            html.push_str(&format!(
                "<li><strong>{}</strong> - {}</li>",
                escape_html(entry.time_display()),
                escape_html(entry.question_display())
            ));
        }
        html.push_str("</ul>");
        html.push_str(&format!(
            "<form method=\"post\" action=\"/history/clear\">\
             <input type=\"hidden\" name=\"user\" value=\"{user}\">\
             <button type=\"submit\">Clear Chat History</button></form>"
        ));
    }
    html.push_str("</div></div>");

    html.push_str("<footer>");
    if let Some(url) = consult_url {
        html.push_str(&format!(
            "<p><a href=\"{}\" rel=\"noopener\" target=\"_blank\">Consult Nearest Doctor</a></p>",
            escape_html(url)
        ));
    }
    html.push_str("<hr>© Vedabot | Built with ❤️ for Ayurveda and AI</footer></body></html>");
    html
}

// ============ JSON API ============

#[derive(Deserialize)]
struct AskRequest {
    question: String,
    #[serde(default)]
    user: Option<String>,
}

async fn handle_api_ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<ChatEntry>, AppError> {
    let user = resolve_user(req.user)?;
    let question = req.question.trim();
    if question.is_empty() {
        return Err(bad_request("question must not be empty"));
    }
    Ok(Json(answer_and_record(&state, &user, question).await))
}

async fn handle_api_history(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<Vec<ChatEntry>>, AppError> {
    let user = resolve_user(Some(user))?;
    let entries = state.history.load(&user).await.map_err(internal)?;
    Ok(Json(entries))
}

async fn handle_api_clear(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = resolve_user(Some(user))?;
    let cleared = state.history.clear(&user).await.map_err(internal)?;
    Ok(Json(serde_json::json!({ "cleared": cleared })))
}
