// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Conversation reducer
//!
//! The synchronous core of a chat session. It owns the message list and
//! folds decoded stream events into it, one at a time, in arrival order.
//! It performs no I/O; [`ChatSession`](crate::chat::ChatSession) drives it.
//!
//! A turn moves `Idle -> Submitting -> Streaming` and then ends as
//! completed, cancelled or failed, after which the phase is `Idle` again.
//! Partial output is kept whichever way a turn ends.

use crate::chat::message::{Attachment, InvocationState, Message, ToolInvocation};
use crate::chat::tracker::{InvocationSlot, ToolCallIndex};
use crate::error::{IrisError, Result};
use crate::llm::event::DecodedEvent;
use crate::llm::model::{Mode, ModeFlags};
use crate::tools::output::ToolOutput;
use crate::tools::registry::ToolRegistry;

/// Message shown when the user submits nothing
pub const EMPTY_PROMPT_MESSAGE: &str = "Please enter a prompt first";

/// Where the current turn is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// No turn in flight
    Idle,
    /// Request sent, nothing received yet
    Submitting,
    /// At least one event received
    Streaming,
}

/// How a turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    Cancelled,
    Failed(String),
}

impl TurnOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TurnOutcome::Completed)
    }
}

/// Handle to a turn that has been started
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnTicket {
    pub turn_id: u64,
    pub assistant_id: String,
}

#[derive(Debug, Clone, Copy)]
struct ActiveTurn {
    turn_id: u64,
    assistant_index: usize,
}

/// Read-only view handed to the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSnapshot {
    pub messages: Vec<Message>,
    pub phase: TurnPhase,
    pub flags: ModeFlags,
    pub last_outcome: Option<TurnOutcome>,
    pub orphan_results: usize,
}

impl ConversationSnapshot {
    pub fn is_in_flight(&self) -> bool {
        self.phase != TurnPhase::Idle
    }

    /// The newest assistant message, if any
    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_assistant())
    }
}

/// Conversation state machine
#[derive(Debug)]
pub struct ConversationState {
    messages: Vec<Message>,
    phase: TurnPhase,
    flags: ModeFlags,
    tracker: ToolCallIndex,
    registry: ToolRegistry,
    active: Option<ActiveTurn>,
    next_turn_id: u64,
    last_outcome: Option<TurnOutcome>,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new(ToolRegistry::with_builtins())
    }
}

impl ConversationState {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            messages: Vec::new(),
            phase: TurnPhase::Idle,
            flags: ModeFlags::default(),
            tracker: ToolCallIndex::new(),
            registry,
            active: None,
            next_turn_id: 1,
            last_outcome: None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn is_in_flight(&self) -> bool {
        self.active.is_some()
    }

    pub fn current_turn_id(&self) -> Option<u64> {
        self.active.map(|a| a.turn_id)
    }

    pub fn last_outcome(&self) -> Option<&TurnOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn orphan_results(&self) -> usize {
        self.tracker.orphan_results()
    }

    pub fn flags(&self) -> ModeFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: ModeFlags) {
        self.flags = flags;
    }

    pub fn toggle_mode(&mut self, mode: Mode) -> ModeFlags {
        self.flags.toggle(mode);
        self.flags
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Accept a user submission and open a turn.
    ///
    /// Blank text with no attachments is rejected without touching state,
    /// as is any submission while another turn is in flight.
    pub fn begin_turn(&mut self, text: &str, attachments: Vec<Attachment>) -> Result<TurnTicket> {
        if self.is_in_flight() {
            return Err(IrisError::TurnInProgress);
        }
        if text.trim().is_empty() && attachments.is_empty() {
            return Err(IrisError::Validation(EMPTY_PROMPT_MESSAGE.to_string()));
        }
        self.messages
            .push(Message::user(text).with_attachments(attachments));
        Ok(self.open_turn())
    }

    /// Re-run the most recent user message as a new turn, discarding the
    /// reply that followed it.
    pub fn begin_regenerate(&mut self) -> Result<TurnTicket> {
        if self.is_in_flight() {
            return Err(IrisError::TurnInProgress);
        }
        let Some(user_index) = self.messages.iter().rposition(|m| m.is_user()) else {
            return Err(IrisError::Validation(
                "Nothing to regenerate yet".to_string(),
            ));
        };
        self.messages.truncate(user_index + 1);
        Ok(self.open_turn())
    }

    fn open_turn(&mut self) -> TurnTicket {
        self.tracker.clear();
        let assistant = Message::assistant("");
        let assistant_id = assistant.id.clone();
        self.messages.push(assistant);

        let turn_id = self.next_turn_id;
        self.next_turn_id += 1;
        self.active = Some(ActiveTurn {
            turn_id,
            assistant_index: self.messages.len() - 1,
        });
        self.phase = TurnPhase::Submitting;
        self.last_outcome = None;

        tracing::debug!(target: "iris.chat.reducer", turn_id, "turn opened");
        TurnTicket {
            turn_id,
            assistant_id,
        }
    }

    /// Messages to send for the current turn: everything before the
    /// assistant placeholder.
    pub fn request_history(&self) -> Vec<Message> {
        match self.active {
            Some(active) => self.messages[..active.assistant_index].to_vec(),
            None => self.messages.clone(),
        }
    }

    fn active_turn(&self, turn_id: u64) -> Option<ActiveTurn> {
        self.active.filter(|a| a.turn_id == turn_id)
    }

    /// Fold one event into the turn `turn_id`.
    ///
    /// Returns whether anything changed. Events for a turn that is no
    /// longer active are dropped.
    pub fn apply(&mut self, turn_id: u64, event: DecodedEvent) -> bool {
        let Some(active) = self.active_turn(turn_id) else {
            tracing::trace!(target: "iris.chat.reducer", turn_id, "dropping event for inactive turn");
            return false;
        };
        if self.phase == TurnPhase::Submitting {
            self.phase = TurnPhase::Streaming;
        }

        match event {
            DecodedEvent::Done => {
                self.finalize(TurnOutcome::Completed);
                true
            }
            DecodedEvent::Error { message } => {
                tracing::warn!(target: "iris.chat.reducer", turn_id, %message, "backend reported an error");
                self.finalize(TurnOutcome::Failed(message));
                true
            }
            DecodedEvent::ToolCallResult {
                tool_call_id,
                result,
            } => self.apply_tool_result(&tool_call_id, result),
            DecodedEvent::ToolCallArgsDelta {
                tool_call_id,
                args_fragment,
            } => self.apply_args_delta(&tool_call_id, &args_fragment),
            DecodedEvent::ToolCallArgsComplete {
                tool_call_id, args, ..
            } => self.apply_args_complete(&tool_call_id, args),
            event => {
                let Some(message) = self.messages.get_mut(active.assistant_index) else {
                    return false;
                };
                match event {
                    DecodedEvent::TextDelta { text } => message.content.push_str(&text),
                    DecodedEvent::Reasoning { text } => message.metadata.reasoning.push_str(&text),
                    DecodedEvent::Source(source) => message.metadata.sources.push(source),
                    DecodedEvent::Usage(usage) => message.metadata.usage = Some(usage),
                    DecodedEvent::StepFinish { .. } => message.metadata.steps += 1,
                    DecodedEvent::ToolCallStart {
                        tool_call_id,
                        tool_name,
                    } => {
                        let index = message.tool_invocations.len();
                        if !self.tracker.insert(&tool_call_id, &message.id, index) {
                            tracing::warn!(
                                target: "iris.chat.reducer",
                                %tool_call_id,
                                "duplicate tool call start ignored"
                            );
                            return false;
                        }
                        tracing::debug!(
                            target: "iris.chat.reducer",
                            %tool_call_id,
                            %tool_name,
                            "tool call started"
                        );
                        message
                            .tool_invocations
                            .push(ToolInvocation::started(tool_call_id, tool_name));
                    }
                    _ => return false,
                }
                true
            }
        }
    }

    fn invocation_mut(&mut self, tool_call_id: &str) -> Option<&mut ToolInvocation> {
        let InvocationSlot { message_id, index } = self.tracker.lookup(tool_call_id)?.clone();
        self.messages
            .iter_mut()
            .rev()
            .find(|m| m.id == message_id)?
            .tool_invocations
            .get_mut(index)
    }

    fn apply_args_delta(&mut self, tool_call_id: &str, fragment: &str) -> bool {
        let Some(invocation) = self.invocation_mut(tool_call_id) else {
            tracing::warn!(target: "iris.chat.reducer", tool_call_id, "argument delta for unknown tool call");
            return false;
        };
        if invocation.state != InvocationState::PartialCall {
            tracing::warn!(target: "iris.chat.reducer", tool_call_id, "argument delta after arguments completed");
            return false;
        }
        invocation.push_args_fragment(fragment);
        true
    }

    fn apply_args_complete(&mut self, tool_call_id: &str, args: serde_json::Value) -> bool {
        let Some(invocation) = self.invocation_mut(tool_call_id) else {
            tracing::warn!(target: "iris.chat.reducer", tool_call_id, "completed arguments for unknown tool call");
            return false;
        };
        if invocation.state >= InvocationState::Call {
            return false;
        }
        invocation.args = args;
        invocation.state = InvocationState::Call;
        true
    }

    fn apply_tool_result(&mut self, tool_call_id: &str, result: serde_json::Value) -> bool {
        let tool_name = self
            .invocation_mut(tool_call_id)
            .map(|invocation| invocation.tool_name.clone());
        let kind = match tool_name {
            Some(name) => self.registry.lookup(&name),
            None => {
                self.tracker.record_orphan();
                tracing::warn!(
                    target: "iris.chat.reducer",
                    tool_call_id,
                    orphan_results = self.tracker.orphan_results(),
                    "tool result for unknown tool call ignored"
                );
                return false;
            }
        };
        let Some(invocation) = self.invocation_mut(tool_call_id) else {
            return false;
        };
        if invocation.state == InvocationState::Result {
            tracing::warn!(target: "iris.chat.reducer", tool_call_id, "duplicate tool result ignored");
            return false;
        }
        if invocation.state == InvocationState::PartialCall {
            tracing::debug!(target: "iris.chat.reducer", tool_call_id, "tool result arrived before completed arguments");
        }
        let output = ToolOutput::decode(&invocation.tool_name, kind, &result);
        invocation.result = Some(result);
        invocation.output = Some(output);
        invocation.state = InvocationState::Result;
        true
    }

    /// End the turn `turn_id` with `outcome`, keeping partial output.
    /// Returns false if that turn already ended.
    pub fn finish(&mut self, turn_id: u64, outcome: TurnOutcome) -> bool {
        if self.active_turn(turn_id).is_none() {
            return false;
        }
        self.finalize(outcome);
        true
    }

    fn finalize(&mut self, outcome: TurnOutcome) {
        if let Some(active) = self.active.take() {
            if let Some(message) = self.messages.get_mut(active.assistant_index) {
                match &outcome {
                    TurnOutcome::Failed(reason) => message.metadata.error = Some(reason.clone()),
                    TurnOutcome::Cancelled => message.metadata.cancelled = true,
                    TurnOutcome::Completed => {}
                }
            }
            tracing::debug!(
                target: "iris.chat.reducer",
                turn_id = active.turn_id,
                outcome = ?outcome,
                "turn finished"
            );
        }
        self.phase = TurnPhase::Idle;
        self.last_outcome = Some(outcome);
    }

    /// Start a new conversation. Any in-flight turn is abandoned; its
    /// remaining events will be dropped.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.tracker.clear();
        self.active = None;
        self.phase = TurnPhase::Idle;
        self.last_outcome = None;
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            messages: self.messages.clone(),
            phase: self.phase,
            flags: self.flags,
            last_outcome: self.last_outcome.clone(),
            orphan_results: self.tracker.orphan_results(),
        }
    }
}
