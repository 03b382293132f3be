//! Shared in-memory collaborators for integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::Value;

use tome::agent::AgentLoop;
use tome::config::AgentConfig;
use tome::models::chunk::Chunk;
use tome::models::message::Message;
use tome::providers::base::CompletionProvider;
use tome::retrieval::RetrievalPipeline;
use tome::store::{
    DocumentMeta, DocumentStore, Embedder, SqlExecutor, ToolAudit, TranscriptStore,
};
use tome::subagent::SubAgent;
use tome::tools::sql::SqlTool;
use tome::tools::ToolDispatcher;

/// Document store with canned chunk results and optional failure injection.
#[derive(Default)]
pub struct StubDocuments {
    pub hybrid_results: Option<Vec<Chunk>>,
    pub vector_results: Option<Vec<Chunk>>,
    pub document: Option<DocumentMeta>,
    pub chunks: Vec<String>,
}

#[async_trait]
impl DocumentStore for StubDocuments {
    async fn hybrid_search(
        &self,
        _embedding: &[f32],
        _query_text: &str,
        _limit: usize,
        _user_scope: &str,
        _metadata_filter: Option<&Value>,
    ) -> Result<Vec<Chunk>> {
        match &self.hybrid_results {
            Some(chunks) => Ok(chunks.clone()),
            None => bail!("hybrid search unavailable"),
        }
    }

    async fn vector_search(
        &self,
        _embedding: &[f32],
        _threshold: f32,
        _limit: usize,
        _user_scope: &str,
        _metadata_filter: Option<&Value>,
    ) -> Result<Vec<Chunk>> {
        match &self.vector_results {
            Some(chunks) => Ok(chunks.clone()),
            None => bail!("vector search unavailable"),
        }
    }

    async fn get_document(
        &self,
        _document_id: &str,
        _user_scope: &str,
    ) -> Result<Option<DocumentMeta>> {
        Ok(self.document.clone())
    }

    async fn get_document_chunks(&self, _document_id: &str) -> Result<Vec<String>> {
        Ok(self.chunks.clone())
    }

    async fn has_completed_documents(&self, _user_scope: &str) -> Result<bool> {
        Ok(true)
    }
}

/// A persisted assistant row, captured for assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedMessage {
    pub thread_id: String,
    pub content: String,
    pub audit: Option<ToolAudit>,
}

/// Transcript store that records every write.
#[derive(Default)]
pub struct RecordingTranscripts {
    pub assistant_messages: Mutex<Vec<PersistedMessage>>,
    pub touched_threads: Mutex<Vec<String>>,
}

#[async_trait]
impl TranscriptStore for RecordingTranscripts {
    async fn thread_messages(&self, _thread_id: &str, _user_scope: &str) -> Result<Vec<Message>> {
        Ok(Vec::new())
    }

    async fn append_user_message(
        &self,
        _thread_id: &str,
        _user_scope: &str,
        _content: &str,
    ) -> Result<()> {
        Ok(())
    }

    async fn append_assistant_message(
        &self,
        thread_id: &str,
        _user_scope: &str,
        content: &str,
        audit: Option<&ToolAudit>,
    ) -> Result<()> {
        self.assistant_messages.lock().unwrap().push(PersistedMessage {
            thread_id: thread_id.to_string(),
            content: content.to_string(),
            audit: audit.cloned(),
        });
        Ok(())
    }

    async fn touch_thread(&self, thread_id: &str) -> Result<()> {
        self.touched_threads.lock().unwrap().push(thread_id.to_string());
        Ok(())
    }
}

/// Embedder returning one fixed vector per input.
pub struct FixedEmbedder;

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![0.1, 0.2, 0.3]).collect())
    }
}

/// Embedder that always fails.
pub struct BrokenEmbedder;

#[async_trait]
impl Embedder for BrokenEmbedder {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(anyhow!("embedding service unreachable"))
    }
}

pub struct NoSql;

#[async_trait]
impl SqlExecutor for NoSql {
    async fn execute_readonly(&self, _query_text: &str, _user_scope: &str) -> Result<Vec<Value>> {
        bail!("not wired in this test")
    }
}

pub fn chunk(content: &str, similarity: f64, filename: &str) -> Chunk {
    Chunk::new(
        content,
        similarity,
        serde_json::json!({ "filename": filename }),
    )
}

/// Assemble a full agent loop around the given provider and stores.
pub fn agent_loop(
    provider: Arc<dyn CompletionProvider>,
    documents: Arc<StubDocuments>,
    transcripts: Arc<RecordingTranscripts>,
) -> AgentLoop {
    let retrieval = RetrievalPipeline::new(
        provider.clone(),
        documents.clone(),
        Arc::new(FixedEmbedder),
    );
    let sql = SqlTool::new(provider.clone(), Arc::new(NoSql));
    let subagent = SubAgent::new(provider.clone(), documents);
    AgentLoop::new(
        provider,
        ToolDispatcher::new(retrieval, sql),
        subagent,
        transcripts,
        AgentConfig::default(),
    )
}
