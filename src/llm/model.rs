// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Model variant selection
//!
//! The user picks a mode (web search, reasoning, or neither) and the
//! request goes to the backend model configured for that mode.

use serde::{Deserialize, Serialize};

/// Per-request mode flags chosen by the user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeFlags {
    pub web_search: bool,
    pub reasoning: bool,
}

/// A user-facing mode toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Search,
    Think,
}

impl ModeFlags {
    pub fn new(web_search: bool, reasoning: bool) -> Self {
        Self {
            web_search,
            reasoning,
        }
    }

    /// Flip one mode on or off. Search and think are mutually exclusive,
    /// so turning one on turns the other off.
    pub fn toggle(&mut self, mode: Mode) {
        match mode {
            Mode::Search => {
                self.web_search = !self.web_search;
                self.reasoning = false;
            }
            Mode::Think => {
                self.reasoning = !self.reasoning;
                self.web_search = false;
            }
        }
    }

    /// The variant these flags resolve to.
    pub fn variant(&self) -> ModelVariant {
        ModelVariant::select(*self)
    }
}

/// Which backend model family serves a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelVariant {
    Search,
    Reasoning,
    Default,
}

impl ModelVariant {
    /// Resolve flags with precedence `web_search > reasoning > default`.
    pub fn select(flags: ModeFlags) -> Self {
        if flags.web_search {
            ModelVariant::Search
        } else if flags.reasoning {
            ModelVariant::Reasoning
        } else {
            ModelVariant::Default
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ModelVariant::Search => "search",
            ModelVariant::Reasoning => "think",
            ModelVariant::Default => "chat",
        }
    }
}

/// Backend model identifiers for each variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCatalog {
    #[serde(default = "default_model")]
    pub default: String,
    #[serde(default = "default_search_model")]
    pub search: String,
    #[serde(default = "default_reasoning_model")]
    pub reasoning: String,
}

fn default_model() -> String {
    "openai".to_string()
}

fn default_search_model() -> String {
    "searchgpt".to_string()
}

fn default_reasoning_model() -> String {
    "deepseek-reasoning".to_string()
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            default: default_model(),
            search: default_search_model(),
            reasoning: default_reasoning_model(),
        }
    }
}

impl ModelCatalog {
    /// Identifier for a variant
    pub fn model_for(&self, variant: ModelVariant) -> &str {
        match variant {
            ModelVariant::Search => &self.search,
            ModelVariant::Reasoning => &self.reasoning,
            ModelVariant::Default => &self.default,
        }
    }

    /// Identifier for a set of flags
    pub fn resolve(&self, flags: ModeFlags) -> &str {
        self.model_for(ModelVariant::select(flags))
    }
}
