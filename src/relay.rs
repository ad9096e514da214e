//! Conversation relay
//!
//! Bridges the chat surface and the inference endpoint: validate the prompt,
//! obtain a completion, persist the exchange, hand the completion back.

use crate::inference::{InferenceError, InferenceService};
use crate::store::{ChatRecord, HistoryStore, StoreError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("prompt is empty")]
    EmptyPrompt,
    #[error("upstream unavailable: {0}")]
    Upstream(#[from] InferenceError),
    #[error("failed to persist chat record: {0}")]
    Persistence(#[source] StoreError),
    #[error("failed to read chat history: {0}")]
    Retrieval(#[source] StoreError),
}

pub struct RelayService {
    inference: Arc<dyn InferenceService>,
    store: Arc<dyn HistoryStore>,
}

impl RelayService {
    pub fn new(inference: Arc<dyn InferenceService>, store: Arc<dyn HistoryStore>) -> Self {
        Self { inference, store }
    }

    /// Forward a prompt to the inference endpoint and persist the exchange.
    ///
    /// Returns the raw completion text. Empty or whitespace-only prompts are
    /// rejected before any network call. A persistence failure after a
    /// successful completion is logged but never suppresses delivery of the
    /// response.
    pub async fn submit(&self, prompt: &str) -> Result<String, RelayError> {
        if prompt.trim().is_empty() {
            return Err(RelayError::EmptyPrompt);
        }

        let response = self.inference.generate(prompt).await?;

        // The record keeps the raw response, reasoning delimiters included.
        if let Err(e) = self.store.append(prompt, &response) {
            let err = RelayError::Persistence(e);
            tracing::error!(error = %err, "chat record not persisted; returning response anyway");
        }

        Ok(response)
    }

    /// All persisted exchanges, oldest to newest.
    ///
    /// A read failure is a distinct error, never a silently empty list.
    pub fn history(&self) -> Result<Vec<ChatRecord>, RelayError> {
        self.store.history().map_err(RelayError::Retrieval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::InferenceError;
    use crate::store::{ChatStore, StoreResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted inference service: pops the next queued outcome per call.
    struct FakeInference {
        outcomes: Mutex<Vec<Result<String, InferenceError>>>,
        calls: AtomicUsize,
    }

    impl FakeInference {
        fn returning(outcomes: Vec<Result<String, InferenceError>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes),
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl InferenceService for FakeInference {
        async fn generate(&self, _prompt: &str) -> Result<String, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes.lock().unwrap().remove(0)
        }
    }

    /// Store whose appends always fail; reads delegate to nothing.
    struct BrokenStore;

    impl HistoryStore for BrokenStore {
        fn append(&self, _prompt: &str, _response: &str) -> StoreResult<ChatRecord> {
            Err(StoreError::Sqlite(rusqlite::Error::InvalidQuery))
        }

        fn history(&self) -> StoreResult<Vec<ChatRecord>> {
            Err(StoreError::Sqlite(rusqlite::Error::InvalidQuery))
        }
    }

    fn relay_with(
        inference: Arc<FakeInference>,
        store: Arc<dyn HistoryStore>,
    ) -> RelayService {
        RelayService::new(inference, store)
    }

    #[tokio::test]
    async fn test_submit_persists_raw_response() {
        let inference =
            FakeInference::returning(vec![Ok("<think>reasoning</think>4".to_string())]);
        let store = Arc::new(ChatStore::open_in_memory().unwrap());
        let relay = relay_with(inference, store.clone());

        let response = relay.submit("2+2?").await.unwrap();
        assert_eq!(response, "<think>reasoning</think>4");

        // Exactly one record, with the unsanitized response.
        let history = store.history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].prompt, "2+2?");
        assert_eq!(history[0].response, "<think>reasoning</think>4");
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected_before_inference() {
        let inference = FakeInference::returning(vec![]);
        let store = Arc::new(ChatStore::open_in_memory().unwrap());
        let relay = relay_with(inference.clone(), store.clone());

        for prompt in ["", "   ", "\n\t "] {
            let err = relay.submit(prompt).await.unwrap_err();
            assert!(matches!(err, RelayError::EmptyPrompt));
        }

        assert_eq!(inference.call_count(), 0);
        assert!(store.history().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upstream_failure_persists_nothing() {
        let inference = FakeInference::returning(vec![Err(InferenceError::Network(
            "connection refused".to_string(),
        ))]);
        let store = Arc::new(ChatStore::open_in_memory().unwrap());
        let relay = relay_with(inference, store.clone());

        let err = relay.submit("x").await.unwrap_err();
        assert!(matches!(err, RelayError::Upstream(_)));
        assert!(store.history().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_does_not_suppress_response() {
        let inference = FakeInference::returning(vec![Ok("4".to_string())]);
        let relay = relay_with(inference, Arc::new(BrokenStore));

        let response = relay.submit("2+2?").await.unwrap();
        assert_eq!(response, "4");
    }

    #[tokio::test]
    async fn test_history_read_failure_is_explicit() {
        let inference = FakeInference::returning(vec![]);
        let relay = relay_with(inference, Arc::new(BrokenStore));

        let err = relay.history().unwrap_err();
        assert!(matches!(err, RelayError::Retrieval(_)));
    }

    #[tokio::test]
    async fn test_history_passes_through_ordered_records() {
        let inference = FakeInference::returning(vec![
            Ok("first answer".to_string()),
            Ok("second answer".to_string()),
        ]);
        let store = Arc::new(ChatStore::open_in_memory().unwrap());
        let relay = relay_with(inference, store);

        relay.submit("first").await.unwrap();
        relay.submit("second").await.unwrap();

        let history = relay.history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].prompt, "first");
        assert_eq!(history[1].prompt, "second");
        assert!(history[0].created_at < history[1].created_at);
    }
}
