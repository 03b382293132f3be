use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A failure local to a single tool call. The dispatcher renders these as
/// the tool's result text so the conversation continues.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum ToolError {
    #[error("Unknown tool '{0}'")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool execution failed: {0}")]
    ExecutionFailed(String),
}

pub type ToolResult<T> = Result<T, ToolError>;

/// A failure talking to the completion endpoint.
///
/// `NotConfigured` is distinct so the HTTP layer can report missing
/// credentials as service-unavailable before any streaming begins; every
/// other variant surfaces mid-request.
#[derive(Error, Debug, Clone)]
pub enum CompletionError {
    #[error("LLM not configured: {0}")]
    NotConfigured(String),

    #[error("completion request failed: {0}")]
    Request(String),

    #[error("unexpected completion response: {0}")]
    Response(String),

    #[error("completion stream interrupted: {0}")]
    Stream(String),
}
