// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::sync::Arc;
use std::time::Duration;

use iris::chat::{
    Attachment, ChatSession, InvocationState, TurnConfig, TurnOutcome, TurnPhase,
    EMPTY_PROMPT_MESSAGE,
};
use iris::error::IrisError;
use iris::llm::mock_transport::{ScriptedFailure, ScriptedTransport};
use iris::llm::Mode;
use iris::tools::{ToolOutput, ToolRegistry};

const DONE: &str = "d:{\"finishReason\":\"stop\"}";

fn session_with(transport: ScriptedTransport) -> Arc<ChatSession> {
    Arc::new(ChatSession::new(
        Arc::new(transport),
        ToolRegistry::with_builtins(),
        TurnConfig::default(),
    ))
}

#[tokio::test]
async fn test_blank_prompt_is_rejected_without_a_request() {
    let transport = ScriptedTransport::new().with_frames([DONE]);
    let session = session_with(transport.clone());

    let err = session.submit("   \n", vec![]).await.err().unwrap();
    assert!(matches!(err, IrisError::Validation(ref m) if m == EMPTY_PROMPT_MESSAGE));
    assert_eq!(transport.call_count(), 0);
    assert!(session.snapshot().messages.is_empty());
}

#[tokio::test]
async fn test_attachment_only_prompt_is_sent() {
    let transport = ScriptedTransport::new().with_frames(["0:\"A cat.\"", DONE]);
    let session = session_with(transport.clone());
    let attachment = Attachment::from_bytes("cat.png", "image/png", b"\x89PNG");

    let outcome = session.submit("", vec![attachment.clone()]).await.unwrap();
    assert_eq!(outcome, TurnOutcome::Completed);

    let request = transport.last_request().unwrap();
    let sent = request.last_user_message().unwrap();
    assert_eq!(sent.attachments, vec![attachment]);
    assert!(sent.attachments[0].url.starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn test_second_submit_while_streaming_is_rejected() {
    let transport = ScriptedTransport::new().with_held_open(["0:\"thinking\""]);
    let session = session_with(transport.clone());

    let running = {
        let session = session.clone();
        tokio::spawn(async move { session.submit("first", vec![]).await })
    };

    let mut updates = session.subscribe();
    updates
        .wait_for(|s| s.phase == TurnPhase::Streaming)
        .await
        .unwrap();

    let err = session.submit("second", vec![]).await.err().unwrap();
    assert!(matches!(err, IrisError::TurnInProgress));
    assert_eq!(transport.call_count(), 1);

    assert!(session.cancel());
    let outcome = running.await.unwrap().unwrap();
    assert_eq!(outcome, TurnOutcome::Cancelled);
}

#[tokio::test]
async fn test_cancel_keeps_partial_reply() {
    let session = session_with(ScriptedTransport::new().with_held_open(["0:\"Once upon\"", "0:\" a time\""]));

    let running = {
        let session = session.clone();
        tokio::spawn(async move { session.submit("Tell me a story", vec![]).await })
    };

    let mut updates = session.subscribe();
    updates
        .wait_for(|s| {
            s.last_assistant()
                .is_some_and(|m| m.content == "Once upon a time")
        })
        .await
        .unwrap();
    assert!(session.cancel());

    assert_eq!(running.await.unwrap().unwrap(), TurnOutcome::Cancelled);
    let snapshot = session.snapshot();
    assert_eq!(snapshot.phase, TurnPhase::Idle);
    let reply = snapshot.last_assistant().unwrap();
    assert_eq!(reply.content, "Once upon a time");
    assert!(reply.metadata.cancelled);
    assert!(!session.cancel());
}

#[tokio::test]
async fn test_interrupted_stream_fails_but_keeps_text() {
    let session = session_with(
        ScriptedTransport::new().with_interruption(["0:\"Partial\""], "connection reset"),
    );

    let outcome = session.submit("Hi", vec![]).await.unwrap();
    assert!(matches!(outcome, TurnOutcome::Failed(ref m) if m.contains("connection reset")));

    let snapshot = session.snapshot();
    let reply = snapshot.last_assistant().unwrap();
    assert_eq!(reply.content, "Partial");
    assert!(reply.has_error());
}

#[tokio::test]
async fn test_session_recovers_after_failure() {
    let transport = ScriptedTransport::new()
        .with_send_failure(ScriptedFailure::Status {
            status: 503,
            message: "unavailable".to_string(),
        })
        .with_frames(["0:\"back online\"", DONE]);
    let session = session_with(transport);

    let first = session.submit("ping", vec![]).await.unwrap();
    assert!(matches!(first, TurnOutcome::Failed(_)));

    let second = session.submit("ping again", vec![]).await.unwrap();
    assert_eq!(second, TurnOutcome::Completed);
    assert_eq!(session.snapshot().messages.len(), 4);
}

#[tokio::test]
async fn test_tool_error_result_is_not_a_turn_failure() {
    let session = session_with(ScriptedTransport::new().with_frames([
        r#"9:{"toolCallId":"call_9","toolName":"youtubeTranscription","args":{"url":"https://youtu.be/x"}}"#,
        r#"a:{"toolCallId":"call_9","result":{"error":"Transcript unavailable","details":"captions disabled"}}"#,
        r#"0:"I could not read that video.""#,
        DONE,
    ]));

    let outcome = session.submit("Summarize this video", vec![]).await.unwrap();
    assert_eq!(outcome, TurnOutcome::Completed);

    let snapshot = session.snapshot();
    let invocation = &snapshot.last_assistant().unwrap().tool_invocations[0];
    assert_eq!(invocation.state, InvocationState::Result);
    match invocation.output.as_ref().unwrap() {
        ToolOutput::Failed { error, details } => {
            assert_eq!(error, "Transcript unavailable");
            assert_eq!(details.as_deref(), Some("captions disabled"));
        }
        other => panic!("expected failed output, got {:?}", other),
    }
}

#[tokio::test]
async fn test_orphan_result_is_counted_and_skipped() {
    let session = session_with(ScriptedTransport::new().with_frames([
        r#"a:{"toolCallId":"ghost","result":{"ok":true}}"#,
        r#"0:"done""#,
        DONE,
    ]));

    let outcome = session.submit("hi", vec![]).await.unwrap();
    assert_eq!(outcome, TurnOutcome::Completed);

    let snapshot = session.snapshot();
    assert_eq!(snapshot.orphan_results, 1);
    assert!(snapshot.last_assistant().unwrap().tool_invocations.is_empty());
}

#[tokio::test]
async fn test_mode_flags_pick_model() {
    let transport = ScriptedTransport::new().with_frames([DONE]);
    let session = session_with(transport.clone());

    session.submit("one", vec![]).await.unwrap();
    session.toggle_mode(Mode::Think);
    session.submit("two", vec![]).await.unwrap();
    session.toggle_mode(Mode::Search);
    session.submit("three", vec![]).await.unwrap();

    let models: Vec<String> = transport
        .recorded_requests()
        .into_iter()
        .map(|r| r.model)
        .collect();
    assert_eq!(models, vec!["openai", "deepseek-reasoning", "searchgpt"]);
}

#[tokio::test]
async fn test_history_grows_across_turns() {
    let transport = ScriptedTransport::new()
        .with_frames(["0:\"Hi!\"", DONE])
        .with_frames(["0:\"Fine.\"", DONE]);
    let session = session_with(transport.clone());

    session.submit("Hello", vec![]).await.unwrap();
    session.submit("How are you?", vec![]).await.unwrap();

    let requests = transport.recorded_requests();
    assert_eq!(requests[0].messages.len(), 1);
    let contents: Vec<&str> = requests[1]
        .messages
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(contents, vec!["Hello", "Hi!", "How are you?"]);
}

#[tokio::test]
async fn test_reset_during_turn_ignores_late_events() {
    let session = session_with(ScriptedTransport::new().with_held_open(["0:\"stale\""]));

    let running = {
        let session = session.clone();
        tokio::spawn(async move { session.submit("hi", vec![]).await })
    };
    let mut updates = session.subscribe();
    updates
        .wait_for(|s| s.phase == TurnPhase::Streaming)
        .await
        .unwrap();

    session.reset();
    let outcome = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(outcome, TurnOutcome::Cancelled);

    let snapshot = session.snapshot();
    assert!(snapshot.messages.is_empty());
    assert_eq!(snapshot.phase, TurnPhase::Idle);
}

#[tokio::test]
async fn test_unknown_usage_still_completes() {
    let session = session_with(ScriptedTransport::new().with_frames([
        "0:\"All done.\"",
        r#"d:{"finishReason":"stop","usage":{"promptTokens":null,"completionTokens":null}}"#,
    ]));

    let outcome = session.submit("hi", vec![]).await.unwrap();
    assert_eq!(outcome, TurnOutcome::Completed);

    let snapshot = session.snapshot();
    let reply = snapshot.last_assistant().unwrap();
    assert_eq!(reply.content, "All done.");
    assert!(reply.metadata.usage.is_none());
    assert!(!reply.has_error());
}
