use std::collections::BTreeMap;
use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use super::base::{CompletionProvider, CompletionStream};
use super::utils::messages_to_openai_spec;
use crate::config::ModelConfig;
use crate::errors::CompletionError;
use crate::models::event::CompletionEvent;
use crate::models::message::{Message, ToolCall};

/// Completion client for OpenAI-compatible chat-completions endpoints.
pub struct OpenAiProvider {
    client: Client,
    config: ModelConfig,
}

/// Tool calls arrive as indexed fragments spread across stream frames; this
/// accumulates them until the finish signal.
#[derive(Default)]
struct ToolCallFragments {
    id: String,
    name: String,
    arguments: String,
}

fn merge_fragment(buffer: &mut BTreeMap<u64, ToolCallFragments>, fragment: &Value) {
    let index = fragment["index"].as_u64().unwrap_or(buffer.len() as u64);
    let entry = buffer.entry(index).or_default();
    if let Some(id) = fragment["id"].as_str() {
        if !id.is_empty() {
            entry.id = id.to_string();
        }
    }
    if let Some(name) = fragment["function"]["name"].as_str() {
        if !name.is_empty() {
            entry.name = name.to_string();
        }
    }
    if let Some(arguments) = fragment["function"]["arguments"].as_str() {
        entry.arguments.push_str(arguments);
    }
}

impl OpenAiProvider {
    pub fn new(config: ModelConfig) -> Result<Self, CompletionError> {
        if config.api_key.trim().is_empty() {
            return Err(CompletionError::NotConfigured(
                "no API key set".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()
            .map_err(|e| CompletionError::Request(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        )
    }

    fn base_payload(&self, system: &str, messages: Vec<Value>) -> Value {
        let mut messages_array = vec![json!({"role": "system", "content": system})];
        messages_array.extend(messages);
        json!({
            "model": self.config.model,
            "messages": messages_array,
        })
    }

    async fn post(&self, payload: &Value) -> Result<Value, CompletionError> {
        let response = self
            .client
            .post(self.url())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(payload)
            .send()
            .await
            .map_err(|e| CompletionError::Request(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Response(format!(
                "status {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| CompletionError::Response(e.to_string()))
    }

    fn message_content(response: &Value) -> Result<String, CompletionError> {
        response["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CompletionError::Response("missing message content".to_string()))
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn stream(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Value],
    ) -> Result<CompletionStream, CompletionError> {
        let mut payload = self.base_payload(system, messages_to_openai_spec(messages));
        payload["stream"] = json!(true);
        if !tools.is_empty() {
            payload["tools"] = json!(tools);
        }

        let response = self
            .client
            .post(self.url())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| CompletionError::Request(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Response(format!(
                "status {status}: {body}"
            )));
        }

        let mut body = response.bytes_stream();

        Ok(Box::pin(stream! {
            let mut buffer = String::new();
            let mut full_response = String::new();
            let mut fragments: BTreeMap<u64, ToolCallFragments> = BTreeMap::new();

            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(CompletionError::Stream(e.to_string()));
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                // Process complete lines; a partial line stays buffered
                // until the next chunk arrives.
                while let Some(newline) = buffer.find('\n') {
                    let line: String = buffer.drain(..=newline).collect();
                    let line = line.trim();
                    let Some(data) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let data = data.trim();
                    if data == "[DONE]" {
                        continue;
                    }
                    // Non-JSON frames (keep-alives) are skipped.
                    let frame: Value = match serde_json::from_str(data) {
                        Ok(frame) => frame,
                        Err(_) => continue,
                    };
                    let choice = &frame["choices"][0];

                    if let Some(content) = choice["delta"]["content"].as_str() {
                        if !content.is_empty() {
                            full_response.push_str(content);
                            yield Ok(CompletionEvent::TextDelta {
                                content: content.to_string(),
                            });
                        }
                    }

                    if let Some(calls) = choice["delta"]["tool_calls"].as_array() {
                        for fragment in calls {
                            merge_fragment(&mut fragments, fragment);
                        }
                    }

                    match choice["finish_reason"].as_str() {
                        Some("tool_calls") => {
                            let tool_calls = fragments
                                .values()
                                .map(|f| ToolCall::new(&f.id, &f.name, &f.arguments))
                                .collect();
                            yield Ok(CompletionEvent::ToolCalls { tool_calls });
                        }
                        Some("stop") => {
                            yield Ok(CompletionEvent::Completed {
                                content: full_response.clone(),
                            });
                        }
                        _ => {}
                    }
                }
            }
        }))
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<String, CompletionError> {
        let mut payload =
            self.base_payload(system, vec![json!({"role": "user", "content": user})]);
        if let Some(temperature) = temperature.or(self.config.temperature) {
            payload["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = max_tokens.or(self.config.max_tokens) {
            payload["max_tokens"] = json!(max_tokens);
        }

        let response = self.post(&payload).await?;
        Self::message_content(&response)
    }

    async fn complete_structured(
        &self,
        system: &str,
        user: &str,
        schema_name: &str,
        schema: Value,
    ) -> Result<Value, CompletionError> {
        let mut payload =
            self.base_payload(system, vec![json!({"role": "user", "content": user})]);
        payload["response_format"] = json!({
            "type": "json_schema",
            "json_schema": {
                "name": schema_name,
                "strict": true,
                "schema": schema,
            }
        });

        let response = self.post(&payload).await?;
        let content = Self::message_content(&response)?;
        serde_json::from_str(&content)
            .map_err(|e| CompletionError::Response(format!("malformed structured output: {e}")))
    }
}
