// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Chat session management
//!
//! The conversation data model, the reducer that folds stream events into
//! it, and the session that drives the reducer from a transport.

pub mod display;
pub mod input_parser;
pub mod message;
pub mod reducer;
pub mod session;
pub mod tracker;

pub use message::{Attachment, InvocationState, Message, MessageMetadata, Role, ToolInvocation};
pub use reducer::{
    ConversationSnapshot, ConversationState, TurnOutcome, TurnPhase, TurnTicket,
    EMPTY_PROMPT_MESSAGE,
};
pub use session::{ChatSession, TurnConfig, DEFAULT_IDLE_TIMEOUT_SECS};
pub use tracker::{InvocationSlot, ToolCallIndex};
