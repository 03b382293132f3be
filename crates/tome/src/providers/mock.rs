use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;
use serde_json::Value;

use super::base::{CompletionProvider, CompletionStream};
use crate::errors::CompletionError;
use crate::models::event::CompletionEvent;
use crate::models::message::Message;

type ScriptedRound = Vec<Result<CompletionEvent, CompletionError>>;

/// A provider that replays pre-configured responses for testing.
///
/// Streaming rounds are consumed front to back; a `repeating` round is
/// replayed forever once the scripted ones run out, which is how the round
/// budget tests model an LLM that never stops calling tools. Single-shot
/// completions and structured completions pop from their own queues and
/// fail once exhausted, so a test that wants a stage to degrade simply
/// scripts nothing for it.
pub struct MockProvider {
    rounds: Mutex<VecDeque<ScriptedRound>>,
    repeating: Option<ScriptedRound>,
    completions: Mutex<VecDeque<String>>,
    structured: Mutex<VecDeque<Value>>,
    pub stream_requests: AtomicUsize,
    pub completion_requests: AtomicUsize,
    pub structured_requests: AtomicUsize,
    /// The conversation passed to each streaming round, for assertions on
    /// what the loop appended between rounds.
    pub seen_messages: Mutex<Vec<Vec<Message>>>,
}

impl MockProvider {
    pub fn new(rounds: Vec<Vec<CompletionEvent>>) -> Self {
        Self {
            rounds: Mutex::new(
                rounds
                    .into_iter()
                    .map(|round| round.into_iter().map(Ok).collect())
                    .collect(),
            ),
            repeating: None,
            completions: Mutex::new(VecDeque::new()),
            structured: Mutex::new(VecDeque::new()),
            stream_requests: AtomicUsize::new(0),
            completion_requests: AtomicUsize::new(0),
            structured_requests: AtomicUsize::new(0),
            seen_messages: Mutex::new(Vec::new()),
        }
    }

    /// A provider that replays the same round on every streaming request.
    pub fn repeating(round: Vec<CompletionEvent>) -> Self {
        let mut provider = Self::new(Vec::new());
        provider.repeating = Some(round.into_iter().map(Ok).collect());
        provider
    }

    /// Append a round that fails mid-stream with the given error.
    pub fn with_stream_error(self, error: CompletionError) -> Self {
        self.rounds.lock().unwrap().push_back(vec![Err(error)]);
        self
    }

    /// Queue a response for the next single-shot `complete` call.
    pub fn with_completion<S: Into<String>>(self, text: S) -> Self {
        self.completions.lock().unwrap().push_back(text.into());
        self
    }

    /// Queue a body for the next `complete_structured` call.
    pub fn with_structured(self, body: Value) -> Self {
        self.structured.lock().unwrap().push_back(body);
        self
    }

    fn next_round(&self) -> ScriptedRound {
        let mut rounds = self.rounds.lock().unwrap();
        if let Some(round) = rounds.pop_front() {
            return round;
        }
        if let Some(round) = &self.repeating {
            return round.clone();
        }
        // Out of script: behave like a model that stops with nothing to say.
        vec![Ok(CompletionEvent::Completed {
            content: String::new(),
        })]
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    async fn stream(
        &self,
        _system: &str,
        messages: &[Message],
        _tools: &[Value],
    ) -> Result<CompletionStream, CompletionError> {
        self.stream_requests.fetch_add(1, Ordering::SeqCst);
        self.seen_messages.lock().unwrap().push(messages.to_vec());
        Ok(Box::pin(stream::iter(self.next_round())))
    }

    async fn complete(
        &self,
        _system: &str,
        _user: &str,
        _temperature: Option<f32>,
        _max_tokens: Option<u32>,
    ) -> Result<String, CompletionError> {
        self.completion_requests.fetch_add(1, Ordering::SeqCst);
        self.completions
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| CompletionError::Response("no scripted completion".to_string()))
    }

    async fn complete_structured(
        &self,
        _system: &str,
        _user: &str,
        _schema_name: &str,
        _schema: Value,
    ) -> Result<Value, CompletionError> {
        self.structured_requests.fetch_add(1, Ordering::SeqCst);
        self.structured
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| CompletionError::Response("no scripted structured body".to_string()))
    }
}
