use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use crate::errors::CompletionError;
use crate::models::event::CompletionEvent;
use crate::models::message::Message;

pub type CompletionStream = BoxStream<'static, Result<CompletionEvent, CompletionError>>;

/// Seam to an LLM completion endpoint.
///
/// `stream` drives the main chat loop; `complete` serves the single-shot
/// callers (query transform, sub-agent); `complete_structured` guarantees a
/// schema-conformant JSON body for the reranker and the SQL generator.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Open a streaming completion request. The request itself is issued
    /// eagerly so configuration and connection failures surface before any
    /// event is produced; failures after that arrive as stream items.
    async fn stream(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Value],
    ) -> Result<CompletionStream, CompletionError>;

    /// Single-shot completion returning the response text.
    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<String, CompletionError>;

    /// Single-shot completion constrained to a strict JSON schema; returns
    /// the decoded body.
    async fn complete_structured(
        &self,
        system: &str,
        user: &str,
        schema_name: &str,
        schema: Value,
    ) -> Result<Value, CompletionError>;
}
