use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single tool invocation requested by the model.
///
/// `arguments` is the raw JSON text exactly as the model emitted it. It is
/// untrusted and only decoded by the tool that handles the call, so a
/// malformed blob surfaces as that tool's error result rather than a parse
/// failure here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl ToolCall {
    pub fn new<I, N, A>(id: I, name: N, arguments: A) -> Self
    where
        I: Into<String>,
        N: Into<String>,
        A: Into<String>,
    {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// A message to or from an LLM, in conversation order.
///
/// Messages are immutable once appended to a conversation. A `tool` message
/// always answers a call listed in the immediately preceding assistant
/// message's `tool_calls`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    pub created: i64,
}

impl Message {
    fn new(role: Role, content: Option<String>) -> Self {
        Message {
            role,
            content,
            tool_calls: None,
            tool_call_id: None,
            created: Utc::now().timestamp(),
        }
    }

    /// Create a user message with the current timestamp
    pub fn user<S: Into<String>>(content: S) -> Self {
        Message::new(Role::User, Some(content.into()))
    }

    /// Create an assistant message carrying final text
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Message::new(Role::Assistant, Some(content.into()))
    }

    /// Create an assistant message recording a round of tool calls.
    /// Content is null, matching what the model emitted.
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        let mut message = Message::new(Role::Assistant, None);
        message.tool_calls = Some(tool_calls);
        message
    }

    /// Create a tool result message answering the call with the given id
    pub fn tool<I: Into<String>, S: Into<String>>(tool_call_id: I, content: S) -> Self {
        let mut message = Message::new(Role::Tool, Some(content.into()));
        message.tool_call_id = Some(tool_call_id.into());
        message
    }

    /// Get the message text, or an empty string for tool-call-only messages
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}
