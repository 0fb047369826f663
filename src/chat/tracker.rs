// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool call index
//!
//! Maps a tool call id to where its invocation lives, so every event that
//! references a call is dispatched without scanning messages. The index
//! does not own invocations; messages do.

use std::collections::HashMap;

/// Location of a tool invocation inside the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationSlot {
    pub message_id: String,
    pub index: usize,
}

/// Per-turn index from tool call id to its invocation slot
#[derive(Debug, Default)]
pub struct ToolCallIndex {
    slots: HashMap<String, InvocationSlot>,
    orphan_results: usize,
}

impl ToolCallIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a call. Returns false if the id is already known.
    pub fn insert(&mut self, tool_call_id: &str, message_id: &str, index: usize) -> bool {
        if self.slots.contains_key(tool_call_id) {
            return false;
        }
        self.slots.insert(
            tool_call_id.to_string(),
            InvocationSlot {
                message_id: message_id.to_string(),
                index,
            },
        );
        true
    }

    pub fn lookup(&self, tool_call_id: &str) -> Option<&InvocationSlot> {
        self.slots.get(tool_call_id)
    }

    /// Record a result that referenced no known call
    pub fn record_orphan(&mut self) {
        self.orphan_results += 1;
    }

    /// Results dropped so far because their call id was unknown
    pub fn orphan_results(&self) -> usize {
        self.orphan_results
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Forget all calls. Ids are never reused across turns.
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}
