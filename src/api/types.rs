//! API request and response types

use crate::store::ChatRecord;
use serde::{Deserialize, Serialize};

/// Request to send a chat prompt
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
}

/// Response for a completed chat prompt
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Response for the history read path: oldest to newest
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct HistoryResponse {
    pub chats: Vec<ChatRecord>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
