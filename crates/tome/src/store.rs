//! Collaborator seams for the external storage, embedding, and SQL layers.
//!
//! The engine only depends on these traits. Production wiring points them at
//! the relational store's RPCs; tests use small in-memory implementations.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::models::chunk::Chunk;
use crate::models::message::Message;

/// Metadata for a stored document, scoped to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMeta {
    pub id: String,
    pub filename: String,
}

/// Access to documents and chunk search.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fused vector + full-text search, ranked by reciprocal rank fusion.
    async fn hybrid_search(
        &self,
        embedding: &[f32],
        query_text: &str,
        limit: usize,
        user_scope: &str,
        metadata_filter: Option<&Value>,
    ) -> Result<Vec<Chunk>>;

    /// Vector-only search with a similarity threshold. Narrower fallback for
    /// when the fused request fails.
    async fn vector_search(
        &self,
        embedding: &[f32],
        threshold: f32,
        limit: usize,
        user_scope: &str,
        metadata_filter: Option<&Value>,
    ) -> Result<Vec<Chunk>>;

    /// Look up a document by id within the given scope. `None` when the
    /// document does not exist or belongs to someone else.
    async fn get_document(&self, document_id: &str, user_scope: &str)
        -> Result<Option<DocumentMeta>>;

    /// All chunk contents for a document, ordered by chunk index.
    async fn get_document_chunks(&self, document_id: &str) -> Result<Vec<String>>;

    /// Whether the scope has at least one fully ingested document. Computed
    /// once per request to decide tool availability.
    async fn has_completed_documents(&self, user_scope: &str) -> Result<bool>;
}

/// Per-call audit record kept alongside a persisted assistant message.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub arguments: String,
    /// Result text truncated to a fixed preview length
    pub result: String,
}

/// The tool-call log persisted with a transcript row.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ToolAudit {
    pub calls: Vec<ToolCallRecord>,
    /// Set when the round budget ran out before a terminal stop, so these
    /// transcripts stay distinguishable from normally completed ones.
    pub truncated: bool,
}

/// Read/write access to thread transcripts.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// All messages for a thread in conversation order. The scope guards
    /// access: a thread owned by someone else reads as empty.
    async fn thread_messages(&self, thread_id: &str, user_scope: &str) -> Result<Vec<Message>>;

    async fn append_user_message(
        &self,
        thread_id: &str,
        user_scope: &str,
        content: &str,
    ) -> Result<()>;

    async fn append_assistant_message(
        &self,
        thread_id: &str,
        user_scope: &str,
        content: &str,
        audit: Option<&ToolAudit>,
    ) -> Result<()>;

    /// Refresh the thread's last-activity marker.
    async fn touch_thread(&self, thread_id: &str) -> Result<()>;
}

/// Order-preserving text embedding; one fixed-dimension vector per input.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Executes an already validated read-only SQL query within a scope.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn execute_readonly(&self, query_text: &str, user_scope: &str) -> Result<Vec<Value>>;
}
