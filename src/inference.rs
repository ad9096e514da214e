//! Inference client
//!
//! Talks to a locally running Ollama-compatible server. The relay treats it
//! as an opaque completion endpoint: prompt in, completion text out.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Inference error with classification
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference endpoint unreachable: {0}")]
    Network(String),
    #[error("inference endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed inference response: {0}")]
    MalformedResponse(String),
}

/// Completion service contract.
///
/// Object-safe so the relay can be tested against a scripted fake.
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Send a prompt, return the raw completion text.
    async fn generate(&self, prompt: &str) -> Result<String, InferenceError>;
}

/// Client for the Ollama `/api/generate` endpoint
pub struct OllamaClient {
    client: Client,
    endpoint: String,
    model: String,
}

impl OllamaClient {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        // The HTTP-level timeout lives here; the relay defines none of its own.
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl InferenceService for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, InferenceError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InferenceError::Network(format!("request timeout: {e}"))
                } else if e.is_connect() {
                    InferenceError::Network(format!("connection failed: {e}"))
                } else {
                    InferenceError::Network(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| InferenceError::Network(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| InferenceError::MalformedResponse(format!("{e} - body: {body}")))?;

        Ok(parsed.response)
    }
}

// Ollama API types

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}
