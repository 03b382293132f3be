use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{self, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use futures::{stream::StreamExt, Stream};
use serde::Deserialize;
use serde_json::{json, Value};
use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tome::errors::CompletionError;
use tome::models::event::StreamEvent;
use tome::models::message::Message;
use tome::tools::schema::available_tools;

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
}

/// SSE response streaming named event frames.
pub struct SseResponse {
    rx: ReceiverStream<String>,
}

impl SseResponse {
    fn new(rx: ReceiverStream<String>) -> Self {
        Self { rx }
    }
}

impl Stream for SseResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx)
            .poll_next(cx)
            .map(|opt| opt.map(|s| Ok(Bytes::from(s))))
    }
}

impl IntoResponse for SseResponse {
    fn into_response(self) -> axum::response::Response {
        let body = axum::body::Body::from_stream(self);

        match http::Response::builder()
            .header("Content-Type", "text/event-stream")
            .header("Cache-Control", "no-cache")
            .header("Connection", "keep-alive")
            .body(body)
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("failed to build SSE response: {e}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// Render one agent event as a named SSE frame. `ToolCalls` is internal
/// bookkeeping and produces no frame.
fn event_frame(event: &StreamEvent) -> Option<String> {
    if matches!(event, StreamEvent::ToolCalls { .. }) {
        return None;
    }
    let mut value = serde_json::to_value(event).ok()?;
    let name = value
        .as_object_mut()?
        .remove("type")?
        .as_str()?
        .to_string();
    Some(format!("event: {name}\ndata: {value}\n\n"))
}

fn user_scope(headers: &HeaderMap) -> Result<String, StatusCode> {
    headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(StatusCode::BAD_REQUEST)
}

async fn send_message(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<SseResponse, StatusCode> {
    let user_scope = user_scope(&headers)?;

    // Credentials are checked before any streaming starts so a missing key
    // is a plain 503 rather than an error frame.
    let agent = state.agent_loop().map_err(|e| match e {
        CompletionError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    })?;

    state
        .transcripts
        .append_user_message(&thread_id, &user_scope, &request.message)
        .await
        .map_err(|e| {
            tracing::error!("failed to persist user message: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let mut messages = state
        .transcripts
        .thread_messages(&thread_id, &user_scope)
        .await
        .unwrap_or_default();
    if messages.is_empty() {
        messages.push(Message::user(&request.message));
    }

    // Tool availability is computed once per request.
    let has_documents = state
        .documents
        .has_completed_documents(&user_scope)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("document availability check failed: {e}");
            false
        });
    let tools = available_tools(has_documents);

    let (tx, rx) = mpsc::channel(100);
    let stream = ReceiverStream::new(rx);

    tokio::spawn(async move {
        let mut events = agent.reply(thread_id, user_scope, messages, tools);
        while let Some(event) = events.next().await {
            if let Some(frame) = event_frame(&event) {
                if tx.send(frame).await.is_err() {
                    tracing::debug!("client disconnected mid-stream");
                    break;
                }
            }
        }
    });

    Ok(SseResponse::new(stream))
}

async fn thread_messages(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    let user_scope = user_scope(&headers)?;
    let messages = state
        .transcripts
        .thread_messages(&thread_id, &user_scope)
        .await
        .map_err(|e| {
            tracing::error!("failed to load thread: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(Json(json!({ "messages": messages })))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/threads/:thread_id/messages",
            post(send_message).get(thread_messages),
        )
        .with_state(state)
}
