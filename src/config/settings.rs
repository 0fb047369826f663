// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Settings management for Iris
//!
//! Handles loading and saving settings from ~/.iris/settings.json

use serde::{Deserialize, Serialize};

use crate::llm::model::ModelCatalog;

mod io;
mod validation;

/// Main settings structure, stored in ~/.iris/settings.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Completion endpoint
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// Backend model identifiers per mode
    #[serde(default)]
    pub models: ModelCatalog,

    /// Per-turn behaviour
    #[serde(default)]
    pub conversation: ConversationConfig,
}

/// Where and how to reach the completion endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Chat endpoint URL
    #[serde(default = "default_endpoint_url")]
    pub url: String,

    /// Bearer token (if stored directly, not recommended)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable name for the bearer token
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

/// Conversation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Backend tool/model round-trips allowed per turn
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Seconds without stream data before a turn fails
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    #[serde(default = "default_system_prompt")]
    pub system_prompt: Option<String>,

    /// Append today's date to the system prompt
    #[serde(default = "default_true")]
    pub include_date: bool,
}

/// Environment variable overriding the endpoint URL
pub const BASE_URL_ENV: &str = "IRIS_BASE_URL";

const DEFAULT_SYSTEM_PROMPT: &str = "You are IRIS (Intelligent Response and Interactive System), \
a precise and articulate assistant. Reply in Markdown. Use webSearchTool for recent events or \
facts you are unsure of, displayWeather for live weather, generateImage only when an image is \
explicitly requested, and youtubeTranscription only for YouTube links the user wants \
transcribed. Never invent tool results.";

fn default_endpoint_url() -> String {
    "http://localhost:3000/api/chat".to_string()
}

fn default_api_key_env() -> String {
    "IRIS_API_KEY".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_max_steps() -> u32 {
    crate::llm::transport::DEFAULT_MAX_STEPS
}

fn default_idle_timeout_secs() -> u64 {
    crate::chat::session::DEFAULT_IDLE_TIMEOUT_SECS
}

fn default_system_prompt() -> Option<String> {
    Some(DEFAULT_SYSTEM_PROMPT.to_string())
}

fn default_true() -> bool {
    true
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: default_endpoint_url(),
            api_key: None,
            api_key_env: default_api_key_env(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            idle_timeout_secs: default_idle_timeout_secs(),
            system_prompt: default_system_prompt(),
            include_date: true,
        }
    }
}
