//! The tool-calling agent loop.
//!
//! One `reply` call handles one user turn: stream a completion, execute any
//! tool calls the model issued, feed the results back, and repeat until the
//! model stops or the round budget runs out. Every observable step is
//! yielded as a [`StreamEvent`]; persistence happens as a side effect once
//! the turn resolves.

use std::sync::Arc;

use async_stream::stream;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::Value;

use crate::config::AgentConfig;
use crate::models::event::{CompletionEvent, StreamEvent};
use crate::models::message::{Message, ToolCall};
use crate::providers::base::CompletionProvider;
use crate::store::{ToolAudit, ToolCallRecord, TranscriptStore};
use crate::subagent::{SubAgent, SubAgentEvent};
use crate::tools::schema::{AnalyzeArgs, ToolKind};
use crate::tools::{decode_args, ToolDispatcher};

pub struct AgentLoop {
    provider: Arc<dyn CompletionProvider>,
    dispatcher: ToolDispatcher,
    subagent: SubAgent,
    transcripts: Arc<dyn TranscriptStore>,
    config: AgentConfig,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        dispatcher: ToolDispatcher,
        subagent: SubAgent,
        transcripts: Arc<dyn TranscriptStore>,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            subagent,
            transcripts,
            config,
        }
    }

    /// Run one user turn against `messages` (the full thread history, ending
    /// with the new user message). The returned stream always ends with
    /// either `Done` or `Error`.
    pub fn reply(
        &self,
        thread_id: String,
        user_scope: String,
        mut messages: Vec<Message>,
        tools: Vec<Value>,
    ) -> BoxStream<'_, StreamEvent> {
        Box::pin(stream! {
            let mut response_text = String::new();
            let mut audit = ToolAudit {
                calls: Vec::new(),
                truncated: false,
            };

            for round in 0..self.config.max_rounds {
                tracing::debug!(round, thread_id = %thread_id, "starting completion round");

                let mut completion = match self
                    .provider
                    .stream(&self.config.system_prompt, &messages, &tools)
                    .await
                {
                    Ok(completion) => completion,
                    Err(e) => {
                        tracing::error!("completion request failed: {e}");
                        yield StreamEvent::Error { error: e.to_string() };
                        return;
                    }
                };

                let mut round_calls: Option<Vec<ToolCall>> = None;
                let mut stopped = false;

                while let Some(event) = completion.next().await {
                    match event {
                        Ok(CompletionEvent::TextDelta { content }) => {
                            response_text.push_str(&content);
                            yield StreamEvent::TextDelta { content };
                        }
                        Ok(CompletionEvent::ToolCalls { tool_calls }) => {
                            round_calls = Some(tool_calls);
                        }
                        Ok(CompletionEvent::Completed { .. }) => {
                            stopped = true;
                        }
                        Err(e) => {
                            tracing::error!("completion stream failed: {e}");
                            yield StreamEvent::Error { error: e.to_string() };
                            return;
                        }
                    }
                }

                if let Some(tool_calls) = round_calls {
                    yield StreamEvent::ToolCalls {
                        tool_calls: tool_calls.clone(),
                    };
                    messages.push(Message::assistant_tool_calls(tool_calls.clone()));

                    for call in &tool_calls {
                        let mut result = String::new();
                        if ToolKind::from_name(&call.name) == Some(ToolKind::AnalyzeDocument) {
                            match decode_args::<AnalyzeArgs>(&call.arguments) {
                                Ok(args) => {
                                    yield StreamEvent::SubAgentStart {
                                        document_id: args.document_id.clone(),
                                        query: args.query.clone(),
                                    };
                                    let mut analysis = self.subagent.analyze(
                                        args.document_id,
                                        args.query,
                                        user_scope.clone(),
                                    );
                                    while let Some(event) = analysis.next().await {
                                        match event {
                                            SubAgentEvent::Thinking(content) => {
                                                yield StreamEvent::SubAgentThinking { content };
                                            }
                                            SubAgentEvent::Result(content) => {
                                                yield StreamEvent::SubAgentResult {
                                                    content: content.clone(),
                                                };
                                                result = content;
                                            }
                                        }
                                    }
                                }
                                Err(e) => {
                                    result = format!("Error: {e}");
                                }
                            }
                        } else {
                            result = self.dispatcher.dispatch(call, &user_scope).await;
                        }

                        audit.calls.push(ToolCallRecord {
                            name: call.name.clone(),
                            arguments: call.arguments.clone(),
                            result: preview(&result, self.config.result_preview_chars),
                        });
                        messages.push(Message::tool(call.id.clone(), result));
                    }
                    continue;
                }

                if stopped {
                    self.persist(&thread_id, &user_scope, &response_text, &audit).await;
                    yield StreamEvent::Done;
                    return;
                }
            }

            // Round budget exhausted while the model was still calling tools.
            tracing::warn!(
                thread_id = %thread_id,
                rounds = self.config.max_rounds,
                "tool round budget exhausted"
            );
            audit.truncated = true;
            self.persist(&thread_id, &user_scope, &response_text, &audit).await;
            yield StreamEvent::Done;
        })
    }

    /// Persist the resolved turn. A turn that produced no text writes
    /// nothing, tool activity or not. Storage failures are logged, not
    /// surfaced: the user already has the streamed response.
    async fn persist(&self, thread_id: &str, user_scope: &str, content: &str, audit: &ToolAudit) {
        if content.is_empty() {
            return;
        }
        let audit = (!audit.calls.is_empty()).then_some(audit);
        if let Err(e) = self
            .transcripts
            .append_assistant_message(thread_id, user_scope, content, audit)
            .await
        {
            tracing::error!(thread_id = %thread_id, "failed to persist assistant message: {e}");
            return;
        }
        if let Err(e) = self.transcripts.touch_thread(thread_id).await {
            tracing::error!(thread_id = %thread_id, "failed to touch thread: {e}");
        }
    }
}

fn preview(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
