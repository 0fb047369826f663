// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Chat session
//!
//! Drives the conversation reducer from a transport. One turn streams at a
//! time; every folded event publishes a fresh snapshot to subscribers.
//! The state lock is only ever held for a single fold, never across an
//! await point.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{Local, NaiveDate};
use futures::StreamExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::chat::message::Attachment;
use crate::chat::reducer::{ConversationSnapshot, ConversationState, TurnOutcome, TurnTicket};
use crate::config::Settings;
use crate::error::{ApiError, Result};
use crate::llm::event::DecodedEvent;
use crate::llm::model::{Mode, ModeFlags, ModelCatalog};
use crate::llm::transport::{ChatRequest, ChatTransport, DEFAULT_MAX_STEPS};
use crate::tools::registry::ToolRegistry;

/// Seconds without a stream event before a turn is failed
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;

/// Per-turn request settings
#[derive(Debug, Clone, PartialEq)]
pub struct TurnConfig {
    pub models: ModelCatalog,
    pub max_steps: u32,
    pub idle_timeout: Duration,
    pub system_prompt: Option<String>,
    /// Append today's date to the system prompt
    pub include_date: bool,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            models: ModelCatalog::default(),
            max_steps: DEFAULT_MAX_STEPS,
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            system_prompt: None,
            include_date: false,
        }
    }
}

impl TurnConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        let conversation = &settings.conversation;
        Self {
            models: settings.models.clone(),
            max_steps: conversation.max_steps,
            idle_timeout: Duration::from_secs(conversation.idle_timeout_secs),
            system_prompt: conversation.system_prompt.clone(),
            include_date: conversation.include_date,
        }
    }

    /// System prompt for a turn taking place on `today`
    pub fn system_prompt_for(&self, today: NaiveDate) -> Option<String> {
        let date_line = self.include_date.then(|| {
            format!(
                "Today's date is {}. Please consider this current date for context.",
                today.format("%-d %B %Y")
            )
        });
        match (self.system_prompt.as_deref(), date_line) {
            (Some(prompt), Some(date)) => Some(format!("{}\n\n{}", prompt.trim_end(), date)),
            (Some(prompt), None) => Some(prompt.to_string()),
            (None, date) => date,
        }
    }
}

#[derive(Debug)]
struct ActiveAbort {
    turn_id: u64,
    token: CancellationToken,
}

/// An interactive chat session
pub struct ChatSession {
    state: Mutex<ConversationState>,
    updates: watch::Sender<ConversationSnapshot>,
    transport: Arc<dyn ChatTransport>,
    config: TurnConfig,
    abort: Mutex<Option<ActiveAbort>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!(target: "iris.chat.session", "session lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

impl ChatSession {
    pub fn new(transport: Arc<dyn ChatTransport>, registry: ToolRegistry, config: TurnConfig) -> Self {
        let state = ConversationState::new(registry);
        let (updates, _) = watch::channel(state.snapshot());
        Self {
            state: Mutex::new(state),
            updates,
            transport,
            config,
            abort: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &TurnConfig {
        &self.config
    }

    /// Current state
    pub fn snapshot(&self) -> ConversationSnapshot {
        lock(&self.state).snapshot()
    }

    /// Receive a snapshot after every change
    pub fn subscribe(&self) -> watch::Receiver<ConversationSnapshot> {
        self.updates.subscribe()
    }

    pub fn flags(&self) -> ModeFlags {
        lock(&self.state).flags()
    }

    pub fn set_flags(&self, flags: ModeFlags) {
        lock(&self.state).set_flags(flags);
        self.publish();
    }

    /// Toggle search or think; turning one on turns the other off.
    pub fn toggle_mode(&self, mode: Mode) -> ModeFlags {
        let flags = lock(&self.state).toggle_mode(mode);
        self.publish();
        flags
    }

    /// Submit a user message and stream the reply.
    ///
    /// Rejected submissions (blank input, or a turn already in flight)
    /// return an error and change nothing. Otherwise the turn always
    /// resolves to an outcome, including when it fails.
    pub async fn submit(&self, text: &str, attachments: Vec<Attachment>) -> Result<TurnOutcome> {
        let (ticket, request, token) = {
            let mut state = lock(&self.state);
            let ticket = state.begin_turn(text, attachments)?;
            self.prepare(&state, &ticket)
        };
        Ok(self.run_turn(ticket, request, token).await)
    }

    /// Discard the last reply and ask again.
    pub async fn regenerate(&self) -> Result<TurnOutcome> {
        let (ticket, request, token) = {
            let mut state = lock(&self.state);
            let ticket = state.begin_regenerate()?;
            self.prepare(&state, &ticket)
        };
        Ok(self.run_turn(ticket, request, token).await)
    }

    /// Cancel the in-flight turn. Returns false if there is none.
    pub fn cancel(&self) -> bool {
        match lock(&self.abort).as_ref() {
            Some(active) if !active.token.is_cancelled() => {
                tracing::info!(target: "iris.chat.session", turn_id = active.turn_id, "cancelling turn");
                active.token.cancel();
                true
            }
            _ => false,
        }
    }

    /// Start a new conversation, abandoning any in-flight turn.
    pub fn reset(&self) {
        if let Some(active) = lock(&self.abort).take() {
            active.token.cancel();
        }
        lock(&self.state).reset();
        self.publish();
    }

    fn prepare(
        &self,
        state: &ConversationState,
        ticket: &TurnTicket,
    ) -> (TurnTicket, ChatRequest, CancellationToken) {
        let token = CancellationToken::new();
        *lock(&self.abort) = Some(ActiveAbort {
            turn_id: ticket.turn_id,
            token: token.clone(),
        });

        let flags = state.flags();
        let mut request = ChatRequest::new(
            state.request_history(),
            flags,
            self.config.models.resolve(flags),
        )
        .with_max_steps(self.config.max_steps)
        .with_tools(state.registry().specs().to_vec());
        if let Some(system) = self.config.system_prompt_for(Local::now().date_naive()) {
            request = request.with_system(system);
        }

        self.updates.send_replace(state.snapshot());
        (ticket.clone(), request, token)
    }

    async fn run_turn(
        &self,
        ticket: TurnTicket,
        request: ChatRequest,
        token: CancellationToken,
    ) -> TurnOutcome {
        let turn_id = ticket.turn_id;
        tracing::info!(
            target: "iris.chat.session",
            turn_id,
            transport = self.transport.name(),
            model = %request.model,
            "turn started"
        );

        let outcome = self.stream_turn(turn_id, request, &token).await;

        if lock(&self.state).finish(turn_id, outcome.clone()) {
            self.publish();
        }
        {
            let mut abort = lock(&self.abort);
            if abort.as_ref().is_some_and(|a| a.turn_id == turn_id) {
                *abort = None;
            }
        }

        match &outcome {
            TurnOutcome::Failed(reason) => {
                tracing::warn!(target: "iris.chat.session", turn_id, %reason, "turn failed")
            }
            other => tracing::info!(target: "iris.chat.session", turn_id, outcome = ?other, "turn ended"),
        }
        outcome
    }

    async fn stream_turn(
        &self,
        turn_id: u64,
        request: ChatRequest,
        token: &CancellationToken,
    ) -> TurnOutcome {
        let handle = tokio::select! {
            biased;
            _ = token.cancelled() => return TurnOutcome::Cancelled,
            sent = self.transport.send(request) => match sent {
                Ok(handle) => handle,
                Err(e) => return TurnOutcome::Failed(e.to_string()),
            },
        };
        let stream_abort = handle.abort_token();
        let mut events = handle.into_events();
        let idle = self.config.idle_timeout;

        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    stream_abort.cancel();
                    return TurnOutcome::Cancelled;
                }
                next = tokio::time::timeout(idle, events.next()) => next,
            };

            let event = match next {
                Err(_) => {
                    stream_abort.cancel();
                    let error = ApiError::IdleTimeout(idle.as_secs());
                    return TurnOutcome::Failed(error.to_string());
                }
                Ok(None) => {
                    tracing::debug!(target: "iris.chat.session", turn_id, "stream ended without a finish part");
                    return TurnOutcome::Completed;
                }
                Ok(Some(Err(e))) => return TurnOutcome::Failed(e.to_string()),
                Ok(Some(Ok(event))) => event,
            };

            let terminal = match &event {
                DecodedEvent::Done => Some(TurnOutcome::Completed),
                DecodedEvent::Error { message } => Some(TurnOutcome::Failed(message.clone())),
                _ => None,
            };
            if lock(&self.state).apply(turn_id, event) {
                self.publish();
            }
            if let Some(outcome) = terminal {
                return outcome;
            }
        }
    }

    fn publish(&self) {
        let snapshot = lock(&self.state).snapshot();
        self.updates.send_replace(snapshot);
    }
}
