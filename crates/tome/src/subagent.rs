//! Deep document analysis delegated to a single-shot sub-agent.
//!
//! The sub-agent reads one document's full content, independent of the main
//! chat loop's context budget, and answers one question about it. It never
//! raises: every failure mode resolves to a `Result` event carrying
//! human-readable text.

use std::sync::Arc;

use async_stream::stream;
use futures::stream::BoxStream;

use crate::providers::base::CompletionProvider;
use crate::store::DocumentStore;

/// Hard cap on concatenated document content fed to the model.
pub const MAX_CONTENT_CHARS: usize = 100_000;

const TRUNCATION_MARKER: &str = "\n\n[Content truncated...]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubAgentEvent {
    Thinking(String),
    Result(String),
}

pub struct SubAgent {
    provider: Arc<dyn CompletionProvider>,
    store: Arc<dyn DocumentStore>,
}

impl SubAgent {
    pub fn new(provider: Arc<dyn CompletionProvider>, store: Arc<dyn DocumentStore>) -> Self {
        Self { provider, store }
    }

    /// Analyze a full document against `query`. Yields a finite sequence of
    /// thinking events followed by exactly one result event.
    pub fn analyze(
        &self,
        document_id: String,
        query: String,
        user_scope: String,
    ) -> BoxStream<'_, SubAgentEvent> {
        Box::pin(stream! {
            // Ownership check before anything is loaded or sent anywhere.
            let document = match self.store.get_document(&document_id, &user_scope).await {
                Ok(Some(document)) => document,
                Ok(None) => {
                    yield SubAgentEvent::Result(
                        "Error: Document not found or access denied.".to_string(),
                    );
                    return;
                }
                Err(e) => {
                    yield SubAgentEvent::Result(format!("Error: failed to load document: {e}"));
                    return;
                }
            };

            let chunks = match self.store.get_document_chunks(&document_id).await {
                Ok(chunks) => chunks,
                Err(e) => {
                    yield SubAgentEvent::Result(format!("Error: failed to load content: {e}"));
                    return;
                }
            };
            if chunks.is_empty() {
                yield SubAgentEvent::Result(
                    "Error: No content found for this document.".to_string(),
                );
                return;
            }

            let chunk_count = chunks.len();
            let mut full_content = chunks.join("\n\n");
            if full_content.chars().count() > MAX_CONTENT_CHARS {
                full_content = full_content.chars().take(MAX_CONTENT_CHARS).collect();
                full_content.push_str(TRUNCATION_MARKER);
            }

            yield SubAgentEvent::Thinking(format!(
                "Reading {} ({chunk_count} chunks)...",
                document.filename
            ));
            yield SubAgentEvent::Thinking("Analyzing document content...".to_string());

            let system = format!(
                "You are analyzing the document '{}'. The full document content is \
                 provided below. Answer the user's question thoroughly based on the \
                 document content. Be detailed and comprehensive in your analysis.",
                document.filename
            );
            let user = format!(
                "Document content:\n\n{full_content}\n\n---\n\nQuestion: {query}"
            );

            match self.provider.complete(&system, &user, None, None).await {
                Ok(answer) if !answer.trim().is_empty() => {
                    yield SubAgentEvent::Result(answer);
                }
                Ok(_) => {
                    yield SubAgentEvent::Result("No analysis generated.".to_string());
                }
                Err(e) => {
                    tracing::error!(document_id = %document_id, "sub-agent completion failed: {e}");
                    yield SubAgentEvent::Result(format!("Error during analysis: {e}"));
                }
            }
        })
    }
}
