// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::collections::HashMap;
use std::future::Future;
use std::io::{self, Write};

use crossterm::{
    style::{Color, ResetColor, SetForegroundColor},
    ExecutableCommand,
};

use iris::chat::display::{
    format_pending_label, format_sources, format_tool_input_summary, format_tool_output,
    format_turn_outcome,
};
use iris::chat::{ChatSession, ConversationSnapshot, InvocationState, Message, TurnOutcome};
use iris::error::Result;

/// A piece of output produced by a new snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Chunk {
    Reasoning(String),
    Text(String),
    ToolPending(String),
    ToolDone { summary: String, body: String },
}

/// Tracks what of the streaming reply has already been printed, so each
/// snapshot only prints what is new.
#[derive(Debug, Default)]
pub(super) struct StreamPrinter {
    message_id: Option<String>,
    printed_content: usize,
    printed_reasoning: usize,
    tools: HashMap<String, InvocationState>,
}

impl StreamPrinter {
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// What changed in the newest assistant message since the last call
    pub(super) fn diff(&mut self, snapshot: &ConversationSnapshot) -> Vec<Chunk> {
        let Some(message) = snapshot.last_assistant() else {
            return Vec::new();
        };
        if self.message_id.as_deref() != Some(message.id.as_str()) {
            *self = Self {
                message_id: Some(message.id.clone()),
                ..Self::default()
            };
        }
        self.diff_message(message)
    }

    fn diff_message(&mut self, message: &Message) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        if let Some(new) = message.metadata.reasoning.get(self.printed_reasoning..) {
            if !new.is_empty() {
                chunks.push(Chunk::Reasoning(new.to_string()));
                self.printed_reasoning = message.metadata.reasoning.len();
            }
        }

        for invocation in &message.tool_invocations {
            let seen = self.tools.get(&invocation.tool_call_id).copied();
            if seen.is_none() && !invocation.is_finished() {
                chunks.push(Chunk::ToolPending(format_pending_label(&invocation.tool_name)));
            }
            if invocation.is_finished() && seen != Some(InvocationState::Result) {
                let body = invocation
                    .output
                    .as_ref()
                    .map(format_tool_output)
                    .unwrap_or_default();
                chunks.push(Chunk::ToolDone {
                    summary: format_tool_input_summary(&invocation.tool_name, &invocation.args),
                    body,
                });
            }
            self.tools
                .insert(invocation.tool_call_id.clone(), invocation.state);
        }

        if let Some(new) = message.content.get(self.printed_content..) {
            if !new.is_empty() {
                chunks.push(Chunk::Text(new.to_string()));
                self.printed_content = message.content.len();
            }
        }
        chunks
    }

    /// Print whatever is new in `snapshot`
    pub(super) fn render(&mut self, snapshot: &ConversationSnapshot) -> Result<()> {
        let mut stdout = io::stdout();
        for chunk in self.diff(snapshot) {
            match chunk {
                Chunk::Reasoning(text) => {
                    stdout.execute(SetForegroundColor(Color::DarkGrey))?;
                    print!("{}", text);
                    stdout.execute(ResetColor)?;
                }
                Chunk::Text(text) => print!("{}", text),
                Chunk::ToolPending(label) => {
                    stdout.execute(SetForegroundColor(Color::Yellow))?;
                    println!("\n  {}", label);
                    stdout.execute(ResetColor)?;
                }
                Chunk::ToolDone { summary, body } => {
                    stdout.execute(SetForegroundColor(Color::Green))?;
                    println!("\n  ✓ {}", summary);
                    stdout.execute(ResetColor)?;
                    for line in body.lines() {
                        println!("    {}", line);
                    }
                }
            }
        }
        stdout.flush()?;
        Ok(())
    }
}

/// Drive one turn to completion while printing its progress. Ctrl-C
/// cancels the turn instead of exiting.
pub(super) async fn stream_turn<F>(session: &ChatSession, turn: F) -> Result<TurnOutcome>
where
    F: Future<Output = Result<TurnOutcome>>,
{
    let mut updates = session.subscribe();
    let mut printer = StreamPrinter::new();

    tokio::pin!(turn);
    let outcome = loop {
        tokio::select! {
            outcome = &mut turn => break outcome?,
            changed = updates.changed() => {
                if changed.is_ok() {
                    let snapshot = updates.borrow_and_update().clone();
                    printer.render(&snapshot)?;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                session.cancel();
            }
        }
    };

    let snapshot = session.snapshot();
    printer.render(&snapshot)?;
    println!();
    if let Some(reply) = snapshot.last_assistant() {
        if !reply.metadata.sources.is_empty() {
            stdout_colored(Color::DarkGrey, &format_sources(&reply.metadata.sources))?;
        }
    }
    if let Some(message) = format_turn_outcome(&outcome) {
        let color = match outcome {
            TurnOutcome::Cancelled => Color::Yellow,
            _ => Color::Red,
        };
        stdout_colored(color, &message)?;
    }
    Ok(outcome)
}

/// Print a line in one color
pub(super) fn stdout_colored(color: Color, text: &str) -> Result<()> {
    let mut stdout = io::stdout();
    stdout.execute(SetForegroundColor(color))?;
    println!("{}", text);
    stdout.execute(ResetColor)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use iris::chat::{ConversationState, TurnPhase};
    use iris::llm::DecodedEvent;
    use serde_json::json;

    fn text(t: &str) -> DecodedEvent {
        DecodedEvent::TextDelta {
            text: t.to_string(),
        }
    }

    #[test]
    fn test_diff_prints_only_new_text() {
        let mut state = ConversationState::default();
        let turn = state.begin_turn("Hi", vec![]).unwrap().turn_id;
        let mut printer = StreamPrinter::new();

        state.apply(turn, text("Hel"));
        assert_eq!(
            printer.diff(&state.snapshot()),
            vec![Chunk::Text("Hel".to_string())]
        );
        state.apply(turn, text("lo"));
        assert_eq!(
            printer.diff(&state.snapshot()),
            vec![Chunk::Text("lo".to_string())]
        );
        assert!(printer.diff(&state.snapshot()).is_empty());
    }

    #[test]
    fn test_diff_reports_tool_progress_once() {
        let mut state = ConversationState::default();
        let turn = state.begin_turn("Weather of Paris", vec![]).unwrap().turn_id;
        let mut printer = StreamPrinter::new();

        state.apply(
            turn,
            DecodedEvent::ToolCallStart {
                tool_call_id: "c1".to_string(),
                tool_name: "displayWeather".to_string(),
            },
        );
        assert_eq!(
            printer.diff(&state.snapshot()),
            vec![Chunk::ToolPending("Analysing Weather...".to_string())]
        );

        state.apply(
            turn,
            DecodedEvent::ToolCallArgsComplete {
                tool_call_id: "c1".to_string(),
                tool_name: "displayWeather".to_string(),
                args: json!({"location": "Paris"}),
            },
        );
        assert!(printer.diff(&state.snapshot()).is_empty());

        state.apply(
            turn,
            DecodedEvent::ToolCallResult {
                tool_call_id: "c1".to_string(),
                result: json!({"error": "no data"}),
            },
        );
        assert_eq!(
            printer.diff(&state.snapshot()),
            vec![Chunk::ToolDone {
                summary: "Weather for Paris".to_string(),
                body: "Error: no data".to_string(),
            }]
        );
        assert!(printer.diff(&state.snapshot()).is_empty());
    }

    #[test]
    fn test_diff_resets_for_new_reply() {
        let mut state = ConversationState::default();
        let first = state.begin_turn("one", vec![]).unwrap().turn_id;
        state.apply(first, text("first reply"));
        state.apply(first, DecodedEvent::Done);

        let mut printer = StreamPrinter::new();
        printer.diff(&state.snapshot());

        let second = state.begin_turn("two", vec![]).unwrap().turn_id;
        state.apply(second, text("2"));
        assert_eq!(state.phase(), TurnPhase::Streaming);
        assert_eq!(
            printer.diff(&state.snapshot()),
            vec![Chunk::Text("2".to_string())]
        );
    }
}
