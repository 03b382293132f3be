//! In-memory storage backends.
//!
//! These back the standalone binary so it runs without external services.
//! Production deployments swap in implementations over their own document
//! store and transcript database through the same traits.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;

use tome::models::chunk::Chunk;
use tome::models::message::Message;
use tome::store::{
    DocumentMeta, DocumentStore, Embedder, SqlExecutor, ToolAudit, TranscriptStore,
};

#[derive(Clone)]
pub struct StoredDocument {
    pub meta: DocumentMeta,
    pub chunks: Vec<String>,
}

/// Documents and chunks held in process memory. Search is vector-only
/// cosine similarity over the hashing embedder's output.
#[derive(Default)]
pub struct MemoryDocuments {
    documents: Mutex<HashMap<String, (String, StoredDocument)>>,
}

impl MemoryDocuments {
    pub fn insert(&self, user_scope: &str, document: StoredDocument) {
        self.documents.lock().unwrap().insert(
            document.meta.id.clone(),
            (user_scope.to_string(), document),
        );
    }

    fn scored_chunks(&self, embedding: &[f32], user_scope: &str) -> Vec<Chunk> {
        let documents = self.documents.lock().unwrap();
        let mut chunks: Vec<Chunk> = documents
            .values()
            .filter(|(scope, _)| scope == user_scope)
            .flat_map(|(_, document)| {
                document.chunks.iter().map(|content| {
                    let similarity = cosine(embedding, &hash_embed(content));
                    Chunk::new(
                        content.clone(),
                        similarity,
                        serde_json::json!({ "filename": document.meta.filename }),
                    )
                })
            })
            .collect();
        chunks.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        chunks
    }
}

#[async_trait]
impl DocumentStore for MemoryDocuments {
    async fn hybrid_search(
        &self,
        embedding: &[f32],
        _query_text: &str,
        limit: usize,
        user_scope: &str,
        _metadata_filter: Option<&Value>,
    ) -> Result<Vec<Chunk>> {
        let mut chunks = self.scored_chunks(embedding, user_scope);
        chunks.truncate(limit);
        Ok(chunks)
    }

    async fn vector_search(
        &self,
        embedding: &[f32],
        threshold: f32,
        limit: usize,
        user_scope: &str,
        _metadata_filter: Option<&Value>,
    ) -> Result<Vec<Chunk>> {
        let mut chunks = self.scored_chunks(embedding, user_scope);
        chunks.retain(|chunk| chunk.similarity >= threshold as f64);
        chunks.truncate(limit);
        Ok(chunks)
    }

    async fn get_document(
        &self,
        document_id: &str,
        user_scope: &str,
    ) -> Result<Option<DocumentMeta>> {
        let documents = self.documents.lock().unwrap();
        Ok(documents
            .get(document_id)
            .filter(|(scope, _)| scope == user_scope)
            .map(|(_, document)| document.meta.clone()))
    }

    async fn get_document_chunks(&self, document_id: &str) -> Result<Vec<String>> {
        let documents = self.documents.lock().unwrap();
        Ok(documents
            .get(document_id)
            .map(|(_, document)| document.chunks.clone())
            .unwrap_or_default())
    }

    async fn has_completed_documents(&self, user_scope: &str) -> Result<bool> {
        let documents = self.documents.lock().unwrap();
        Ok(documents.values().any(|(scope, _)| scope == user_scope))
    }
}

/// Thread transcripts held in process memory, keyed by owner.
#[derive(Default)]
pub struct MemoryTranscripts {
    threads: Mutex<HashMap<String, (String, Vec<Message>)>>,
}

impl MemoryTranscripts {
    fn push(&self, thread_id: &str, user_scope: &str, message: Message) {
        let mut threads = self.threads.lock().unwrap();
        let (_, messages) = threads
            .entry(thread_id.to_string())
            .or_insert_with(|| (user_scope.to_string(), Vec::new()));
        messages.push(message);
    }
}

#[async_trait]
impl TranscriptStore for MemoryTranscripts {
    async fn thread_messages(&self, thread_id: &str, user_scope: &str) -> Result<Vec<Message>> {
        let threads = self.threads.lock().unwrap();
        Ok(threads
            .get(thread_id)
            .filter(|(scope, _)| scope == user_scope)
            .map(|(_, messages)| messages.clone())
            .unwrap_or_default())
    }

    async fn append_user_message(
        &self,
        thread_id: &str,
        user_scope: &str,
        content: &str,
    ) -> Result<()> {
        self.push(thread_id, user_scope, Message::user(content));
        Ok(())
    }

    async fn append_assistant_message(
        &self,
        thread_id: &str,
        user_scope: &str,
        content: &str,
        _audit: Option<&ToolAudit>,
    ) -> Result<()> {
        self.push(thread_id, user_scope, Message::assistant(content));
        Ok(())
    }

    async fn touch_thread(&self, _thread_id: &str) -> Result<()> {
        Ok(())
    }
}

/// Deterministic local embedder: hashes character trigrams into a small
/// fixed-dimension vector. Not semantically meaningful, but stable and
/// dependency-free for the standalone binary.
pub struct HashingEmbedder;

const EMBED_DIM: usize = 64;

fn hash_embed(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; EMBED_DIM];
    let lowered = text.to_lowercase();
    let chars: Vec<char> = lowered.chars().collect();
    for window in chars.windows(3) {
        let mut hash: u64 = 1469598103934665603;
        for c in window {
            hash ^= *c as u64;
            hash = hash.wrapping_mul(1099511628211);
        }
        vector[(hash % EMBED_DIM as u64) as usize] += 1.0;
    }
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}

fn cosine(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x * y) as f64).sum()
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| hash_embed(text)).collect())
    }
}

/// SQL is not available against the in-memory store; the tool reports the
/// failure as its result text.
pub struct NoSqlBackend;

#[async_trait]
impl SqlExecutor for NoSqlBackend {
    async fn execute_readonly(&self, _query_text: &str, _user_scope: &str) -> Result<Vec<Value>> {
        bail!("no SQL backend configured")
    }
}
