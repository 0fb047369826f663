// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::collections::HashMap;

use proptest::prelude::*;
use serde_json::json;

use iris::chat::{ConversationState, InvocationState};
use iris::llm::{DecodedEvent, StreamDecoder};

fn text_frames(parts: &[String]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(b"0:");
        body.extend_from_slice(serde_json::to_string(part).unwrap().as_bytes());
        body.push(b'\n');
    }
    body.extend_from_slice(b"d:{\"finishReason\":\"stop\"}\n");
    body
}

fn split_at_points(body: &[u8], mut points: Vec<usize>) -> Vec<&[u8]> {
    points.iter_mut().for_each(|p| *p %= body.len() + 1);
    points.sort_unstable();
    points.dedup();

    let mut chunks = Vec::new();
    let mut start = 0;
    for point in points {
        chunks.push(&body[start..point]);
        start = point;
    }
    chunks.push(&body[start..]);
    chunks
}

#[derive(Debug, Clone)]
enum ToolStep {
    Start(usize),
    Delta(usize, String),
    Complete(usize),
    Result(usize),
}

fn tool_step() -> impl Strategy<Value = ToolStep> {
    prop_oneof![
        (0..3usize).prop_map(ToolStep::Start),
        (0..3usize, "[a-z\"{}:]{0,6}").prop_map(|(i, s)| ToolStep::Delta(i, s)),
        (0..3usize).prop_map(ToolStep::Complete),
        (0..3usize).prop_map(ToolStep::Result),
    ]
}

fn to_event(step: &ToolStep) -> DecodedEvent {
    let id = |i: &usize| format!("call_{}", i);
    match step {
        ToolStep::Start(i) => DecodedEvent::ToolCallStart {
            tool_call_id: id(i),
            tool_name: "webSearchTool".to_string(),
        },
        ToolStep::Delta(i, fragment) => DecodedEvent::ToolCallArgsDelta {
            tool_call_id: id(i),
            args_fragment: fragment.clone(),
        },
        ToolStep::Complete(i) => DecodedEvent::ToolCallArgsComplete {
            tool_call_id: id(i),
            tool_name: "webSearchTool".to_string(),
            args: json!({"query": "rust"}),
        },
        ToolStep::Result(i) => DecodedEvent::ToolCallResult {
            tool_call_id: id(i),
            result: json!({"summary": "Rust 1.x released", "sources": []}),
        },
    }
}

proptest! {
    #[test]
    fn text_survives_any_chunking(
        parts in prop::collection::vec("\\PC{0,12}", 1..8),
        points in prop::collection::vec(any::<usize>(), 0..16),
    ) {
        let body = text_frames(&parts);
        let mut decoder = StreamDecoder::new();
        let mut text = String::new();
        let mut done = false;

        for chunk in split_at_points(&body, points) {
            for event in decoder.feed(chunk).unwrap() {
                match event {
                    DecodedEvent::TextDelta { text: delta } => text.push_str(&delta),
                    DecodedEvent::Done => done = true,
                    other => prop_assert!(false, "unexpected event {:?}", other),
                }
            }
        }
        prop_assert!(decoder.finish().unwrap().is_empty());

        prop_assert!(done);
        prop_assert_eq!(text, parts.concat());
    }

    #[test]
    fn invocation_state_never_moves_backwards(steps in prop::collection::vec(tool_step(), 0..24)) {
        let mut state = ConversationState::default();
        let ticket = state.begin_turn("search something", vec![]).unwrap();
        let mut seen: HashMap<String, InvocationState> = HashMap::new();

        for step in &steps {
            state.apply(ticket.turn_id, to_event(step));

            let reply = state.messages().last().unwrap();
            for invocation in &reply.tool_invocations {
                if let Some(previous) = seen.get(&invocation.tool_call_id) {
                    prop_assert!(invocation.state >= *previous);
                }
                seen.insert(invocation.tool_call_id.clone(), invocation.state);
            }
            // One entry per call id, no matter how often it was started.
            prop_assert_eq!(seen.len(), reply.tool_invocations.len());
        }
    }
}
