//! Tool dispatch: routes a model-issued tool call to the retrieval pipeline
//! or the SQL answerer and renders the outcome as conversation text.

pub mod schema;
pub mod sql;

use serde::de::DeserializeOwned;

use crate::errors::{ToolError, ToolResult};
use crate::models::chunk::Chunk;
use crate::models::message::ToolCall;
use crate::retrieval::{RetrievalPipeline, DEFAULT_TOP_K};
use schema::{SearchArgs, SqlArgs, ToolKind};
use sql::SqlTool;

pub const NO_RESULTS_TEXT: &str = "No relevant documents found.";

/// Decode a tool's raw argument text into its typed argument struct.
pub fn decode_args<T: DeserializeOwned>(raw: &str) -> ToolResult<T> {
    serde_json::from_str(raw).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// Render ranked chunks for the model's context window.
pub fn format_search_results(chunks: &[Chunk]) -> String {
    if chunks.is_empty() {
        return NO_RESULTS_TEXT.to_string();
    }
    chunks
        .iter()
        .map(|chunk| {
            format!(
                "[Source: {}] (similarity: {:.2})\n{}",
                chunk.filename(),
                chunk.similarity,
                chunk.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

pub struct ToolDispatcher {
    retrieval: RetrievalPipeline,
    sql: SqlTool,
}

impl ToolDispatcher {
    pub fn new(retrieval: RetrievalPipeline, sql: SqlTool) -> Self {
        Self { retrieval, sql }
    }

    /// Resolve a tool call to its result text. Tool results are always
    /// appended as conversation content, so failures become the text itself
    /// rather than propagating.
    pub async fn dispatch(&self, call: &ToolCall, user_scope: &str) -> String {
        match self.try_dispatch(call, user_scope).await {
            Ok(text) => text,
            Err(e) => format!("Error: {e}"),
        }
    }

    async fn try_dispatch(&self, call: &ToolCall, user_scope: &str) -> ToolResult<String> {
        let Some(kind) = ToolKind::from_name(&call.name) else {
            tracing::warn!(name = %call.name, "unknown tool requested");
            return Err(ToolError::UnknownTool(call.name.clone()));
        };

        match kind {
            ToolKind::SearchDocuments => {
                let args: SearchArgs = decode_args(&call.arguments)?;
                let filter = args.filters.filter(|f| f.is_object());
                let chunks = self
                    .retrieval
                    .search(&args.query, user_scope, DEFAULT_TOP_K, filter.as_ref())
                    .await;
                Ok(format_search_results(&chunks))
            }
            ToolKind::QueryDocumentsSql => {
                let args: SqlArgs = decode_args(&call.arguments)?;
                Ok(self.sql.answer(&args.question, user_scope).await)
            }
            // The agent loop intercepts the sub-agent tool before dispatch;
            // reaching here means a routing bug, reported in-band.
            ToolKind::AnalyzeDocument => Err(ToolError::ExecutionFailed(
                "analyze_document is handled by the agent loop".to_string(),
            )),
        }
    }
}
