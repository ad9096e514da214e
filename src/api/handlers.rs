//! HTTP request handlers

use super::types::{ChatRequest, ChatResponse, ErrorResponse, HistoryResponse};
use super::AppState;
use crate::relay::RelayError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Prompt submission
        .route("/api/chat", post(chat))
        // Full ordered history
        .route("/api/history", get(history))
        .with_state(state)
}

async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let response = state.relay.submit(&req.prompt).await?;
    Ok(Json(ChatResponse { response }))
}

async fn history(State(state): State<AppState>) -> Result<Json<HistoryResponse>, AppError> {
    let chats = state.relay.history()?;
    Ok(Json(HistoryResponse { chats }))
}

// ============================================================
// Error Handling
// ============================================================

struct AppError(RelayError);

impl From<RelayError> for AppError {
    fn from(err: RelayError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            RelayError::EmptyPrompt => StatusCode::BAD_REQUEST,
            // Persistence failures never reach this path (the relay logs
            // them and still returns the response); listed for completeness.
            RelayError::Upstream(_)
            | RelayError::Persistence(_)
            | RelayError::Retrieval(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.0.to_string()));
        (status, body).into_response()
    }
}
