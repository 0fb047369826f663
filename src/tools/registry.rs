// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool registry
//!
//! The set of tools the assistant may call, built once at startup and
//! handed to the session. Lookups by wire name drive result decoding and
//! the "working on it" labels shown while a call is in flight.

use std::collections::HashMap;

use crate::tools::definition::{SchemaBuilder, ToolSpec};

/// Tools known to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    DisplayWeather,
    GenerateImage,
    WebSearch,
    YoutubeTranscription,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        ToolKind::DisplayWeather,
        ToolKind::GenerateImage,
        ToolKind::WebSearch,
        ToolKind::YoutubeTranscription,
    ];

    /// Name the model uses to call the tool
    pub fn wire_name(&self) -> &'static str {
        match self {
            ToolKind::DisplayWeather => "displayWeather",
            ToolKind::GenerateImage => "generateImage",
            ToolKind::WebSearch => "webSearchTool",
            ToolKind::YoutubeTranscription => "youtubeTranscription",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.wire_name() == name)
    }

    /// Label shown while the call has not produced a result yet
    pub fn pending_label(&self) -> &'static str {
        match self {
            ToolKind::DisplayWeather => "Analysing Weather...",
            ToolKind::GenerateImage => "Generating Image...",
            ToolKind::WebSearch => "Searching Web...",
            ToolKind::YoutubeTranscription => "Analysing Video...",
        }
    }

    fn spec(&self) -> ToolSpec {
        let (description, parameters) = match self {
            ToolKind::DisplayWeather => (
                "Display the weather for a location",
                SchemaBuilder::new()
                    .string("location", "The location to get the weather for", true)
                    .build(),
            ),
            ToolKind::GenerateImage => (
                "Generate an AI image based on a text prompt.",
                SchemaBuilder::new()
                    .string(
                        "prompt",
                        "The text description to generate an image from",
                        true,
                    )
                    .number("width", "Width of the image (optional)", false)
                    .number("height", "Height of the image (optional)", false)
                    .build(),
            ),
            ToolKind::WebSearch => (
                "Use this tool when the user asks about recent events, current data, or anything \
                 the AI may not have reliable knowledge of. It performs a real-time web search and \
                 returns a summarized answer in JSON format.",
                SchemaBuilder::new()
                    .string(
                        "query",
                        "The user's question or topic to search the web for",
                        true,
                    )
                    .build(),
            ),
            ToolKind::YoutubeTranscription => (
                "Transcribe the spoken content of a YouTube video",
                SchemaBuilder::new()
                    .url("url", "The full YouTube video URL to transcribe", true)
                    .build(),
            ),
        };
        ToolSpec {
            name: self.wire_name().to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

/// Registry of tools offered to the backend
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    specs: Vec<ToolSpec>,
    by_name: HashMap<String, ToolKind>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in tool
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for kind in ToolKind::ALL {
            registry.register(kind);
        }
        registry
    }

    /// Add a tool. Registering the same tool twice is a no-op.
    pub fn register(&mut self, kind: ToolKind) {
        if self.by_name.contains_key(kind.wire_name()) {
            return;
        }
        self.by_name.insert(kind.wire_name().to_string(), kind);
        self.specs.push(kind.spec());
    }

    pub fn lookup(&self, name: &str) -> Option<ToolKind> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Definitions in registration order
    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Pending label for a tool name, if the tool is registered
    pub fn pending_label(&self, name: &str) -> Option<&'static str> {
        self.lookup(name).map(|kind| kind.pending_label())
    }
}
