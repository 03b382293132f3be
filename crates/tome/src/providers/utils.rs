use serde_json::{json, Value};

use crate::models::message::Message;

/// Convert internal messages to the chat-completions message specification.
/// Our internal shape is already wire-adjacent; this drops the local
/// timestamp and expands tool calls into the function-call envelope.
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec = Vec::new();

    for message in messages {
        let mut converted = json!({
            "role": message.role,
            "content": message.content,
        });

        if let Some(tool_calls) = &message.tool_calls {
            let calls: Vec<Value> = tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": call.arguments,
                        }
                    })
                })
                .collect();
            converted["tool_calls"] = Value::Array(calls);
        }

        if let Some(tool_call_id) = &message.tool_call_id {
            converted["tool_call_id"] = json!(tool_call_id);
        }

        messages_spec.push(converted);
    }

    messages_spec
}
