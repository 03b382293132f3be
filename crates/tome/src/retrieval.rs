//! Hybrid search pipeline: HyDE query transformation, fused candidate
//! fetching, and LLM reranking, each with its own fallback.

pub mod rerank;
pub mod transform;

use std::sync::Arc;

use serde_json::Value;

use crate::models::chunk::Chunk;
use crate::providers::base::CompletionProvider;
use crate::store::{DocumentStore, Embedder};

pub const DEFAULT_TOP_K: usize = 10;

/// Similarity floor applied only on the vector-only fallback path.
const FALLBACK_THRESHOLD: f32 = 0.3;

/// The single entry point for all tool-level document search.
///
/// Every stage degrades rather than fails: a transform failure falls back to
/// the raw query, a hybrid fetch failure retries vector-only, and a rerank
/// failure keeps the store's native order. The caller never sees an error,
/// only a possibly empty ranked sequence.
pub struct RetrievalPipeline {
    provider: Arc<dyn CompletionProvider>,
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn Embedder>,
}

impl RetrievalPipeline {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            provider,
            store,
            embedder,
        }
    }

    /// Search the scope's documents; returns at most `top_k` chunks ranked
    /// by final relevance.
    pub async fn search(
        &self,
        query: &str,
        user_scope: &str,
        top_k: usize,
        metadata_filter: Option<&Value>,
    ) -> Vec<Chunk> {
        // Step 1: HyDE transform; the raw query still drives lexical matching.
        let embed_input = match transform::hyde_transform(self.provider.as_ref(), query).await {
            Ok(passage) => passage,
            Err(e) => {
                tracing::warn!("HyDE transform failed, using raw query: {e}");
                query.to_string()
            }
        };

        let embedding = match self.embedder.embed(&[embed_input]).await {
            Ok(mut vectors) if !vectors.is_empty() => vectors.remove(0),
            Ok(_) => {
                tracing::warn!("embedding service returned no vectors");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!("embedding failed: {e}");
                return Vec::new();
            }
        };

        // Step 2: fetch extra candidates so the reranker has room to work.
        let fetch_limit = top_k * 2;
        let mut candidates = match self
            .store
            .hybrid_search(&embedding, query, fetch_limit, user_scope, metadata_filter)
            .await
        {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::warn!("hybrid search failed, falling back to vector search: {e}");
                match self
                    .store
                    .vector_search(
                        &embedding,
                        FALLBACK_THRESHOLD,
                        fetch_limit,
                        user_scope,
                        metadata_filter,
                    )
                    .await
                {
                    Ok(chunks) => chunks,
                    Err(e) => {
                        tracing::warn!("vector search fallback failed: {e}");
                        return Vec::new();
                    }
                }
            }
        };

        // Step 3: rerank only when there is more than a page of candidates.
        if candidates.len() > top_k {
            match rerank::rerank_chunks(self.provider.as_ref(), query, &candidates, top_k).await {
                Ok(reranked) => candidates = reranked,
                Err(e) => {
                    tracing::warn!("reranking failed, using raw results: {e}");
                    candidates.truncate(top_k);
                }
            }
        } else {
            candidates.truncate(top_k);
        }

        tracing::info!(
            count = candidates.len(),
            "retrieval pipeline returned ranked chunks"
        );
        candidates
    }
}
