use std::sync::Arc;

use tome::agent::AgentLoop;
use tome::config::{AgentConfig, ModelConfig};
use tome::errors::CompletionError;
use tome::providers::openai::OpenAiProvider;
use tome::retrieval::RetrievalPipeline;
use tome::store::{DocumentStore, Embedder, SqlExecutor, TranscriptStore};
use tome::subagent::SubAgent;
use tome::tools::sql::SqlTool;
use tome::tools::ToolDispatcher;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub model: ModelConfig,
    pub agent: AgentConfig,
    pub documents: Arc<dyn DocumentStore>,
    pub transcripts: Arc<dyn TranscriptStore>,
    pub embedder: Arc<dyn Embedder>,
    pub sql: Arc<dyn SqlExecutor>,
}

impl AppState {
    /// Assemble a fresh agent loop for one request. Fails with
    /// `NotConfigured` before any streaming starts when credentials are
    /// missing.
    pub fn agent_loop(&self) -> Result<AgentLoop, CompletionError> {
        let provider = Arc::new(OpenAiProvider::new(self.model.clone())?);
        let retrieval = RetrievalPipeline::new(
            provider.clone(),
            self.documents.clone(),
            self.embedder.clone(),
        );
        let sql = SqlTool::new(provider.clone(), self.sql.clone());
        let subagent = SubAgent::new(provider.clone(), self.documents.clone());
        Ok(AgentLoop::new(
            provider,
            ToolDispatcher::new(retrieval, sql),
            subagent,
            self.transcripts.clone(),
            self.agent.clone(),
        ))
    }
}
