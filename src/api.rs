//! HTTP surface for the PDF assistant.
//!
//! One process-wide chat session sits behind a mutex, so actions run one at a time:
//!
//! - `GET /status` – Index id, listed and indexed documents, last index time, selected model.
//! - `POST /index` – Upload the listed PDFs unless they are already indexed.
//! - `POST /ask` – Answer `{ "question", "model"? }` from the indexed documents.
//! - `GET /chat` – Transcript, newest turn first. `DELETE /chat` clears it.
//! - `GET /presets` – Offered preset questions and models.

use crate::session::{
    AVAILABLE_MODELS, AskOutcome, Assistant, BLANK_QUESTION, ChatSession, ChatTurn, IndexOutcome,
    PRESET_QUESTIONS, StatusSummary,
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Assistant and transcript shared by the HTTP handlers.
pub struct ServerState {
    assistant: Assistant,
    session: ChatSession,
}

impl ServerState {
    /// Wrap a started assistant with an empty transcript.
    pub fn new(assistant: Assistant) -> Self {
        Self {
            assistant,
            session: ChatSession::new(),
        }
    }
}

type SharedState = Arc<Mutex<ServerState>>;

/// Build the HTTP router exposing the assistant actions.
pub fn create_router(state: ServerState) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/index", post(index_documents))
        .route("/ask", post(ask_question))
        .route("/chat", get(get_chat).delete(clear_chat))
        .route("/presets", get(get_presets))
        .with_state(Arc::new(Mutex::new(state)))
}

async fn get_status(State(state): State<SharedState>) -> Json<StatusSummary> {
    Json(state.lock().await.assistant.status())
}

/// Upload the listed documents; a failed upload maps to `502 Bad Gateway`.
async fn index_documents(State(state): State<SharedState>) -> Result<Json<IndexOutcome>, ApiError> {
    let mut guard = state.lock().await;
    let outcome = guard.assistant.index().await;
    tracing::info!(outcome = ?outcome, "Index request completed");
    match outcome {
        IndexOutcome::Failed(message) => Err(ApiError::Upstream(message)),
        other => Ok(Json(other)),
    }
}

/// Request body for `POST /ask`.
#[derive(Deserialize)]
struct AskRequest {
    question: String,
    /// Optional model switch applied before answering a non-blank question.
    #[serde(default)]
    model: Option<String>,
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
    model: String,
}

async fn ask_question(
    State(state): State<SharedState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    if request.question.trim().is_empty() {
        return Err(ApiError::BadRequest(BLANK_QUESTION.into()));
    }

    let mut guard = state.lock().await;
    let ServerState { assistant, session } = &mut *guard;

    if let Some(model) = request.model.as_deref()
        && !assistant.select_model(model)
    {
        return Err(ApiError::BadRequest(format!("Unknown model: {model}")));
    }

    match assistant.ask(session, &request.question).await {
        AskOutcome::Answered(answer) => Ok(Json(AskResponse {
            answer,
            model: assistant.model().to_string(),
        })),
        AskOutcome::Rejected(message) => Err(ApiError::BadRequest(message)),
        AskOutcome::Failed(message) => Err(ApiError::Upstream(message)),
    }
}

#[derive(Serialize)]
struct ChatResponse {
    turns: Vec<ChatTurn>,
}

async fn get_chat(State(state): State<SharedState>) -> Json<ChatResponse> {
    let guard = state.lock().await;
    Json(ChatResponse {
        turns: guard.session.turns_newest_first().cloned().collect(),
    })
}

async fn clear_chat(State(state): State<SharedState>) -> StatusCode {
    state.lock().await.session.clear();
    StatusCode::NO_CONTENT
}

#[derive(Serialize)]
struct PresetsResponse {
    questions: &'static [&'static str],
    models: &'static [&'static str],
}

async fn get_presets() -> Json<PresetsResponse> {
    Json(PresetsResponse {
        questions: &PRESET_QUESTIONS,
        models: &AVAILABLE_MODELS,
    })
}

enum ApiError {
    BadRequest(String),
    Upstream(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Upstream(message) => (StatusCode::BAD_GATEWAY, message),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
