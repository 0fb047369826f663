// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Decoded stream events
//!
//! The typed vocabulary the decoder produces and the reducer consumes.

use serde::{Deserialize, Serialize};

/// A single event decoded from the completion stream, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedEvent {
    /// Assistant text to append
    TextDelta { text: String },

    /// Model reasoning text (shown separately from the reply)
    Reasoning { text: String },

    /// A tool call has begun streaming its arguments
    ToolCallStart {
        tool_call_id: String,
        tool_name: String,
    },

    /// A fragment of the tool call's JSON arguments
    ToolCallArgsDelta {
        tool_call_id: String,
        args_fragment: String,
    },

    /// The tool call's arguments are complete and it is being executed
    ToolCallArgsComplete {
        tool_call_id: String,
        tool_name: String,
        args: serde_json::Value,
    },

    /// The backend finished executing the tool
    ToolCallResult {
        tool_call_id: String,
        result: serde_json::Value,
    },

    /// A citation the model relied on
    Source(Source),

    /// One internal backend step finished
    StepFinish {
        finish_reason: FinishReason,
        is_continued: bool,
    },

    /// Token accounting for the whole turn
    Usage(TokenUsage),

    /// The backend reported an error; terminal for the turn
    Error { message: String },

    /// The stream completed normally
    Done,
}

impl DecodedEvent {
    /// The tool call this event refers to, if any.
    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            DecodedEvent::ToolCallStart { tool_call_id, .. }
            | DecodedEvent::ToolCallArgsDelta { tool_call_id, .. }
            | DecodedEvent::ToolCallArgsComplete { tool_call_id, .. }
            | DecodedEvent::ToolCallResult { tool_call_id, .. } => Some(tool_call_id),
            _ => None,
        }
    }

    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DecodedEvent::Done | DecodedEvent::Error { .. })
    }
}

/// A web source cited by the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

impl TokenUsage {
    /// Get total tokens used
    pub fn total_tokens(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

/// Why a backend step stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    ToolCalls,
    Error,
    Other,
    #[default]
    #[serde(other)]
    Unknown,
}
