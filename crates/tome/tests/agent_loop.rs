//! End-to-end tests of the agent loop over scripted completions.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures::StreamExt;

use tome::errors::CompletionError;
use tome::models::event::{CompletionEvent, StreamEvent};
use tome::models::message::{Message, Role, ToolCall};
use tome::providers::mock::MockProvider;
use tome::store::DocumentMeta;
use tome::tools::NO_RESULTS_TEXT;

use common::{agent_loop, RecordingTranscripts, StubDocuments};

fn delta(content: &str) -> CompletionEvent {
    CompletionEvent::TextDelta {
        content: content.to_string(),
    }
}

fn completed(content: &str) -> CompletionEvent {
    CompletionEvent::Completed {
        content: content.to_string(),
    }
}

fn search_call(id: &str) -> ToolCall {
    ToolCall::new(id, "search_documents", r#"{"query":"refund policy"}"#)
}

async fn collect(
    provider: Arc<MockProvider>,
    documents: StubDocuments,
) -> (Vec<StreamEvent>, Arc<RecordingTranscripts>, Arc<MockProvider>) {
    let transcripts = Arc::new(RecordingTranscripts::default());
    let agent = agent_loop(provider.clone(), Arc::new(documents), transcripts.clone());
    let events = agent
        .reply(
            "t-1".to_string(),
            "u-1".to_string(),
            vec![Message::user("hello")],
            Vec::new(),
        )
        .collect()
        .await;
    (events, transcripts, provider)
}

#[tokio::test]
async fn test_plain_text_turn_streams_and_persists() {
    let provider = Arc::new(MockProvider::new(vec![vec![
        delta("Hel"),
        delta("lo"),
        completed("Hello"),
    ]]));

    let (events, transcripts, _) = collect(provider, StubDocuments::default()).await;

    assert_eq!(
        events,
        vec![
            StreamEvent::TextDelta {
                content: "Hel".to_string()
            },
            StreamEvent::TextDelta {
                content: "lo".to_string()
            },
            StreamEvent::Done,
        ]
    );

    let persisted = transcripts.assistant_messages.lock().unwrap().clone();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].content, "Hello");
    assert_eq!(persisted[0].audit, None);
    assert_eq!(
        transcripts.touched_threads.lock().unwrap().as_slice(),
        ["t-1".to_string()]
    );
}

#[tokio::test]
async fn test_tool_round_feeds_result_back_to_model() {
    let provider = Arc::new(MockProvider::new(vec![
        vec![CompletionEvent::ToolCalls {
            tool_calls: vec![search_call("call_1")],
        }],
        vec![delta("Nothing found."), completed("Nothing found.")],
    ]));

    let (events, transcripts, provider) = collect(provider, StubDocuments::default()).await;

    assert!(matches!(events[0], StreamEvent::ToolCalls { .. }));
    assert_eq!(events.last(), Some(&StreamEvent::Done));

    // The second round sees the assistant tool-call message and the paired
    // tool result appended after the original conversation.
    let seen = provider.seen_messages.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    let appended = &seen[1][seen[0].len()..];
    assert_eq!(appended.len(), 2);
    assert_eq!(appended[0].role, Role::Assistant);
    assert_eq!(appended[0].content, None);
    assert_eq!(
        appended[0].tool_calls.as_ref().unwrap()[0].id,
        "call_1"
    );
    assert_eq!(appended[1].role, Role::Tool);
    assert_eq!(appended[1].tool_call_id.as_deref(), Some("call_1"));
    // No search backends are wired in this test, so retrieval degrades to
    // the canonical empty-result text.
    assert_eq!(appended[1].text(), NO_RESULTS_TEXT);

    let persisted = transcripts.assistant_messages.lock().unwrap().clone();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].content, "Nothing found.");
    let audit = persisted[0].audit.as_ref().unwrap();
    assert!(!audit.truncated);
    assert_eq!(audit.calls.len(), 1);
    assert_eq!(audit.calls[0].name, "search_documents");
    assert_eq!(audit.calls[0].result, NO_RESULTS_TEXT);
}

#[tokio::test]
async fn test_round_budget_bounds_a_looping_model() {
    let provider = Arc::new(MockProvider::repeating(vec![CompletionEvent::ToolCalls {
        tool_calls: vec![search_call("call_n")],
    }]));

    let (events, transcripts, provider) = collect(provider, StubDocuments::default()).await;

    assert_eq!(provider.stream_requests.load(Ordering::SeqCst), 5);
    let tool_rounds = events
        .iter()
        .filter(|e| matches!(e, StreamEvent::ToolCalls { .. }))
        .count();
    assert_eq!(tool_rounds, 5);
    assert_eq!(events.last(), Some(&StreamEvent::Done));

    // The model never produced text, so no assistant row is written even
    // though five tool calls ran.
    assert!(transcripts.assistant_messages.lock().unwrap().is_empty());
    assert!(transcripts.touched_threads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_round_exhaustion_with_text_persists_truncated_audit() {
    let provider = Arc::new(MockProvider::repeating(vec![
        delta("Still searching. "),
        CompletionEvent::ToolCalls {
            tool_calls: vec![search_call("call_n")],
        },
    ]));

    let (events, transcripts, _) = collect(provider, StubDocuments::default()).await;
    assert_eq!(events.last(), Some(&StreamEvent::Done));

    let persisted = transcripts.assistant_messages.lock().unwrap().clone();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].content, "Still searching. ".repeat(5));
    let audit = persisted[0].audit.as_ref().unwrap();
    assert!(audit.truncated);
    assert_eq!(audit.calls.len(), 5);
}

#[tokio::test]
async fn test_stream_error_is_terminal_and_unpersisted() {
    let provider = Arc::new(
        MockProvider::new(Vec::new())
            .with_stream_error(CompletionError::Stream("connection reset".to_string())),
    );

    let (events, transcripts, _) = collect(provider, StubDocuments::default()).await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        StreamEvent::Error { error } => assert!(error.contains("connection reset")),
        other => panic!("expected error event, got {other:?}"),
    }
    assert!(transcripts.assistant_messages.lock().unwrap().is_empty());
    assert!(transcripts.touched_threads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_analyze_document_relays_sub_agent_events() {
    let provider = Arc::new(
        MockProvider::new(vec![
            vec![CompletionEvent::ToolCalls {
                tool_calls: vec![ToolCall::new(
                    "call_1",
                    "analyze_document",
                    r#"{"document_id":"d1","query":"summarize"}"#,
                )],
            }],
            vec![delta("Summary ready."), completed("Summary ready.")],
        ])
        .with_completion("The document argues for caching."),
    );
    let documents = StubDocuments {
        document: Some(DocumentMeta {
            id: "d1".to_string(),
            filename: "design.md".to_string(),
        }),
        chunks: vec!["part a".to_string(), "part b".to_string()],
        ..Default::default()
    };

    let (events, transcripts, provider) = collect(provider, documents).await;

    let expected_prefix = vec![
        StreamEvent::ToolCalls {
            tool_calls: vec![ToolCall::new(
                "call_1",
                "analyze_document",
                r#"{"document_id":"d1","query":"summarize"}"#,
            )],
        },
        StreamEvent::SubAgentStart {
            document_id: "d1".to_string(),
            query: "summarize".to_string(),
        },
        StreamEvent::SubAgentThinking {
            content: "Reading design.md (2 chunks)...".to_string(),
        },
        StreamEvent::SubAgentThinking {
            content: "Analyzing document content...".to_string(),
        },
        StreamEvent::SubAgentResult {
            content: "The document argues for caching.".to_string(),
        },
    ];
    assert_eq!(&events[..expected_prefix.len()], &expected_prefix[..]);
    assert_eq!(events.last(), Some(&StreamEvent::Done));

    // The sub-agent's answer is what the model sees as the tool result.
    let seen = provider.seen_messages.lock().unwrap().clone();
    let tool_message = seen[1].last().unwrap().clone();
    assert_eq!(tool_message.role, Role::Tool);
    assert_eq!(tool_message.text(), "The document argues for caching.");

    let persisted = transcripts.assistant_messages.lock().unwrap().clone();
    assert_eq!(persisted[0].content, "Summary ready.");
    assert_eq!(
        persisted[0].audit.as_ref().unwrap().calls[0].result,
        "The document argues for caching."
    );
}

#[tokio::test]
async fn test_malformed_analyze_arguments_stay_tool_local() {
    let provider = Arc::new(MockProvider::new(vec![
        vec![CompletionEvent::ToolCalls {
            tool_calls: vec![ToolCall::new("call_1", "analyze_document", "not json")],
        }],
        vec![completed("")],
    ]));

    let (events, transcripts, provider) = collect(provider, StubDocuments::default()).await;

    // No sub-agent events fire; the decode failure becomes the tool result.
    assert!(!events
        .iter()
        .any(|e| matches!(e, StreamEvent::SubAgentStart { .. })));
    assert_eq!(events.last(), Some(&StreamEvent::Done));

    let seen = provider.seen_messages.lock().unwrap().clone();
    let tool_message = seen[1].last().unwrap().clone();
    assert!(tool_message.text().starts_with("Error: Invalid arguments:"));

    // A stop with no accumulated text writes nothing.
    assert!(transcripts.assistant_messages.lock().unwrap().is_empty());
}
