mod configuration;
mod error;
mod memory;
mod routes;
mod state;

use std::sync::Arc;

use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use configuration::Settings;
use memory::{HashingEmbedder, MemoryDocuments, MemoryTranscripts, NoSqlBackend};
use state::AppState;
use tome::config::AgentConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let settings = Settings::new()?;
    let addr = settings.server.socket_addr()?;

    let state = AppState {
        model: settings.llm.into_model_config(),
        agent: AgentConfig::default(),
        documents: Arc::new(MemoryDocuments::default()),
        transcripts: Arc::new(MemoryTranscripts::default()),
        embedder: Arc::new(HashingEmbedder),
        sql: Arc::new(NoSqlBackend),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
