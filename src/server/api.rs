use crate::agent::{ AssistantError, ConversationAssistant };
use crate::config::scenario::list_scenarios;
use crate::history::{ tail, HistoryStore };
use crate::llm::CompletionError;
use crate::models::api::{ ApiResponse, HealthStatus };
use crate::models::chat::{ ConversationTurn, SuggestRequest, SuggestionResult };
use std::sync::Arc;
use axum::{
    routing::{ get, post },
    Router,
    extract::{ State, Query, rejection::{ JsonRejection, QueryRejection } },
    response::{ IntoResponse, Response },
    http::{ Method, StatusCode, Uri },
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{ json, Value as JsonValue };
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, warn, error };

const SERVICE_NAME: &str = "Conversation Assistant";

#[derive(Clone)]
pub struct AppState {
    assistant: Arc<ConversationAssistant>,
    history: Arc<dyn HistoryStore>,
    verbose_errors: bool,
}

impl AppState {
    pub fn new(assistant: ConversationAssistant, verbose_errors: bool) -> Self {
        let history = assistant.history();
        Self { assistant: Arc::new(assistant), history, verbose_errors }
    }
}

#[derive(Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

/// Every failure leaves the server as `{ "success": false, "error": ... }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self { status: StatusCode::NOT_FOUND, message: message.into() }
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self { status: StatusCode::METHOD_NOT_ALLOWED, message: message.into() }
    }

    fn internal(detail: impl std::fmt::Display, verbose: bool) -> Self {
        let message = if verbose {
            format!("internal error: {}", detail)
        } else {
            "internal error".to_string()
        };
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, message }
    }

    pub fn from_assistant(err: AssistantError, verbose: bool) -> Self {
        match err {
            AssistantError::Completion(e) => {
                let status = match e {
                    CompletionError::Auth(_) => StatusCode::INTERNAL_SERVER_ERROR,
                    CompletionError::Transport(_) | CompletionError::Upstream(_) =>
                        StatusCode::BAD_GATEWAY,
                    CompletionError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                };
                let message = if verbose { e.to_string() } else { e.summary().to_string() };
                Self { status, message }
            }
            AssistantError::History(e) => Self::internal(e, verbose),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::failure(self.message))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/api/conversation-suggest", post(suggest_handler))
        .route(
            "/api/conversation-history",
            get(history_handler).delete(clear_history_handler)
        )
        .route("/api/scenarios", get(scenarios_handler))
        .route("/api/test", post(echo_handler))
        .fallback(not_found_handler)
        .method_not_allowed_fallback(method_not_allowed_handler)
        .layer(cors)
        .with_state(state)
}

async fn index_handler() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "running",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
    })
}

async fn suggest_handler(
    State(state): State<AppState>,
    payload: Result<Json<SuggestRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<SuggestionResult>>, ApiError> {
    let Json(req) = payload.map_err(|rejection| {
        warn!("Rejected suggestion request body: {}", rejection.body_text());
        ApiError::validation(format!("Invalid request data: {}", rejection.body_text()))
    })?;

    let message = req.message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| {
            warn!("Rejected suggestion request: empty message");
            ApiError::validation("Message must not be empty")
        })?;
    let context = req.context.unwrap_or_default();

    let result = state.assistant
        .generate_suggestion(&message, &context).await
        .map_err(|e| ApiError::from_assistant(e, state.verbose_errors))?;

    Ok(Json(ApiResponse::ok(result)))
}

async fn history_handler(
    State(state): State<AppState>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<ConversationTurn>>>, ApiError> {
    let Query(params) = params.map_err(|rejection| {
        ApiError::validation(format!("Invalid query: {}", rejection.body_text()))
    })?;

    let turns = state.history.list().await.map_err(|e| {
        error!("Failed to read conversation history: {}", e);
        ApiError::internal(e, state.verbose_errors)
    })?;

    Ok(Json(ApiResponse::ok(tail(turns, params.limit))))
}

async fn clear_history_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.history.clear().await.map_err(|e| {
        error!("Failed to clear conversation history: {}", e);
        ApiError::internal(e, state.verbose_errors)
    })?;
    info!("Conversation history cleared");
    Ok(Json(ApiResponse::done("Conversation history cleared")))
}

async fn scenarios_handler() -> impl IntoResponse {
    Json(ApiResponse::ok(list_scenarios()))
}

async fn echo_handler(
    payload: Result<Json<JsonValue>, JsonRejection>,
) -> Result<Json<JsonValue>, ApiError> {
    let Json(body) = payload.map_err(|rejection| {
        ApiError::validation(format!("Invalid request data: {}", rejection.body_text()))
    })?;
    info!("Test endpoint received: {}", body);

    Ok(Json(json!({
        "success": true,
        "message": "Test successful",
        "echo": body,
        "timestamp": Utc::now().to_rfc3339(),
    })))
}

async fn not_found_handler(uri: Uri) -> ApiError {
    ApiError::not_found(format!("not found: {}", uri.path()))
}

async fn method_not_allowed_handler(method: Method, uri: Uri) -> ApiError {
    ApiError::method_not_allowed(format!("method not allowed: {} {}", method, uri.path()))
}
