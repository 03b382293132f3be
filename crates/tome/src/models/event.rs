use serde::{Deserialize, Serialize};

use super::message::ToolCall;

/// An event produced by the agent loop for a single request.
///
/// This is the wire contract between the loop and its caller: the HTTP layer
/// forwards each variant as a named server-sent-event frame, except
/// `ToolCalls`, which is internal bookkeeping and never leaves the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    TextDelta { content: String },
    ToolCalls { tool_calls: Vec<ToolCall> },
    SubAgentStart { document_id: String, query: String },
    SubAgentThinking { content: String },
    SubAgentResult { content: String },
    Error { error: String },
    Done,
}

/// An event yielded by a streaming completion.
///
/// A round ends with either `ToolCalls` (finish reason `tool_calls`,
/// carrying the fully assembled calls for the round) or `Completed` (finish
/// reason `stop`, carrying the accumulated text of this stream).
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionEvent {
    TextDelta { content: String },
    ToolCalls { tool_calls: Vec<ToolCall> },
    Completed { content: String },
}
