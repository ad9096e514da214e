//! deepchat - conversation relay server
//!
//! Bridges a chat client and a locally running Ollama-compatible inference
//! server, persisting each prompt/response exchange to SQLite.

mod api;
mod inference;
mod relay;
mod store;

use api::{create_router, AppState};
use inference::OllamaClient;
use relay::RelayService;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use store::ChatStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Connection endpoints are fixed constants in this version.
const PORT: u16 = 3001;
const OLLAMA_ENDPOINT: &str = "http://localhost:11434/api/generate";
const OLLAMA_MODEL: &str = "deepseek-r1:1.5b";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "deepchat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let db_path = {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        format!("{home}/.deepchat/chat.db")
    };

    // Ensure database directory exists
    if let Some(parent) = PathBuf::from(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Open the store with an explicit, owned handle
    tracing::info!(path = %db_path, "Opening chat store");
    let store = Arc::new(ChatStore::open(&db_path)?);

    let inference = Arc::new(OllamaClient::new(OLLAMA_ENDPOINT, OLLAMA_MODEL));
    tracing::info!(endpoint = OLLAMA_ENDPOINT, model = OLLAMA_MODEL, "Inference client ready");

    let state = AppState::new(RelayService::new(inference, store));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], PORT));
    tracing::info!("deepchat relay listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
