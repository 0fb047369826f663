// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Conversation data model
//!
//! Messages serialize in the shape the completion endpoint expects
//! (`toolInvocations`, `experimental_attachments`, camelCase keys).
//! Client-only bookkeeping such as streamed reasoning or the failed-turn
//! indicator lives in [`MessageMetadata`] and never goes over the wire.

use std::path::Path;

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{IrisError, Result};
use crate::llm::event::{Source, TokenUsage};
use crate::tools::output::ToolOutput;

/// Role of the message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User message
    User,
    /// Assistant response
    Assistant,
    /// System prompt
    System,
}

/// A message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique identifier, stable across updates
    pub id: String,

    /// Role of the message sender
    pub role: Role,

    /// Markdown text; only ever appended to while streaming
    pub content: String,

    /// Files sent with the message
    #[serde(
        rename = "experimental_attachments",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub attachments: Vec<Attachment>,

    /// Tool calls the model made while producing this message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_invocations: Vec<ToolInvocation>,

    /// When the message was created
    pub created_at: DateTime<Utc>,

    #[serde(skip)]
    pub metadata: MessageMetadata,
}

/// Client-side annotations attached to an assistant message
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageMetadata {
    /// Streamed reasoning, shown apart from the answer
    pub reasoning: String,
    /// Sources cited by the model
    pub sources: Vec<Source>,
    /// Token usage reported at the end of the turn
    pub usage: Option<TokenUsage>,
    /// Backend steps completed while producing this message
    pub steps: u32,
    /// Set when the turn that produced this message failed
    pub error: Option<String>,
    /// Set when the turn was cancelled before completion
    pub cancelled: bool,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            attachments: Vec::new(),
            tool_invocations: Vec::new(),
            created_at: Utc::now(),
            metadata: MessageMetadata::default(),
        }
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Attach files to the message
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    /// Find a tool invocation by call id
    pub fn invocation(&self, tool_call_id: &str) -> Option<&ToolInvocation> {
        self.tool_invocations
            .iter()
            .find(|inv| inv.tool_call_id == tool_call_id)
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    /// Whether the turn that produced this message failed
    pub fn has_error(&self) -> bool {
        self.metadata.error.is_some()
    }
}

/// A file attached to a user message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    pub content_type: String,
    /// `data:` URL with the file body, or a remote URL
    pub url: String,
    #[serde(default)]
    pub size_bytes: u64,
}

impl Attachment {
    /// Attachment pointing at a remote URL
    pub fn remote(
        name: impl Into<String>,
        content_type: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            url: url.into(),
            size_bytes: 0,
        }
    }

    /// Embed a local file as a base64 `data:` URL.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(IrisError::InvalidInput(format!(
                "Not a file: {}",
                path.display()
            )));
        }
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self::from_bytes(name, content_type, &bytes))
    }

    /// Embed raw bytes as a base64 `data:` URL.
    pub fn from_bytes(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: &[u8],
    ) -> Self {
        let content_type = content_type.into();
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Self {
            name: name.into(),
            url: format!("data:{};base64,{}", content_type, encoded),
            content_type,
            size_bytes: bytes.len() as u64,
        }
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    pub fn is_pdf(&self) -> bool {
        self.content_type.starts_with("application/pdf")
    }
}

/// Lifecycle of a tool invocation. Ordered: a call only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvocationState {
    /// Arguments are still streaming in
    PartialCall,
    /// Arguments are complete; the backend is executing the tool
    Call,
    /// The tool produced a result
    Result,
}

/// A single model-initiated tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    pub tool_call_id: String,
    pub tool_name: String,
    pub state: InvocationState,

    /// Arguments; partial while streaming, complete from `Call` onwards
    #[serde(default)]
    pub args: serde_json::Value,

    /// Raw argument text as it streamed in
    #[serde(skip)]
    pub args_text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    /// Typed view of `result`
    #[serde(skip)]
    pub output: Option<ToolOutput>,
}

impl ToolInvocation {
    /// A call whose arguments have not started streaming yet
    pub fn started(tool_call_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            state: InvocationState::PartialCall,
            args: serde_json::Value::Object(serde_json::Map::new()),
            args_text: String::new(),
            result: None,
            output: None,
        }
    }

    /// Append an argument fragment; `args` tracks the text whenever it
    /// parses as JSON on its own.
    pub fn push_args_fragment(&mut self, fragment: &str) {
        self.args_text.push_str(fragment);
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&self.args_text) {
            self.args = value;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == InvocationState::Result
    }
}
