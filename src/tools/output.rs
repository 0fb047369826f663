// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Typed tool results
//!
//! Results arrive as untyped JSON. They are decoded once, keyed by tool,
//! into a closed set of shapes the presentation layer can match on.
//! A result carrying an `error` field is a tool failure: data for the
//! user, not a failure of the turn.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::registry::ToolKind;

/// Decoded result of a tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolOutput {
    Weather(WeatherReport),
    Image(GeneratedImage),
    WebSearch(SearchSummary),
    Transcript(VideoTranscript),
    /// The tool ran and reported an error
    Failed {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
    /// Unregistered tool, or a payload that did not match the tool's schema
    Raw { tool_name: String, value: Value },
}

/// Current conditions for a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub location: WeatherLocation,
    pub current: CurrentConditions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherLocation {
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub localtime: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temp_c: f64,
    #[serde(default)]
    pub temp_f: Option<f64>,
    #[serde(default)]
    pub condition: Option<WeatherCondition>,
    #[serde(default)]
    pub wind_kph: Option<f64>,
    #[serde(default)]
    pub wind_dir: Option<String>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub feelslike_c: Option<f64>,
    #[serde(default)]
    pub is_day: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherCondition {
    pub text: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
}

/// An image generated from a prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    pub prompt: String,
    pub image_url: String,
}

/// Summarized web search answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSummary {
    pub summary: String,
    #[serde(default)]
    pub sources: Vec<SearchSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSource {
    #[serde(default)]
    pub title: String,
    pub url: String,
}

/// Transcript of a video's spoken content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoTranscript {
    pub transcript: String,
    #[serde(default)]
    pub embed_link: Option<String>,
}

impl ToolOutput {
    /// Decode a raw result for the named tool.
    pub fn decode(tool_name: &str, kind: Option<ToolKind>, value: &Value) -> Self {
        if let Some(error) = value.get("error") {
            let error = match error {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let details = value.get("details").map(|d| match d {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
            return ToolOutput::Failed { error, details };
        }

        let decoded = match kind {
            Some(ToolKind::DisplayWeather) => {
                serde_json::from_value(value.clone()).map(ToolOutput::Weather)
            }
            Some(ToolKind::GenerateImage) => {
                serde_json::from_value(value.clone()).map(ToolOutput::Image)
            }
            Some(ToolKind::WebSearch) => {
                serde_json::from_value(value.clone()).map(ToolOutput::WebSearch)
            }
            Some(ToolKind::YoutubeTranscription) => {
                serde_json::from_value(value.clone()).map(ToolOutput::Transcript)
            }
            None => return Self::raw(tool_name, value),
        };

        match decoded {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!(
                    target: "iris.tools",
                    tool_name,
                    error = %e,
                    "tool result did not match its schema; keeping raw value"
                );
                Self::raw(tool_name, value)
            }
        }
    }

    fn raw(tool_name: &str, value: &Value) -> Self {
        ToolOutput::Raw {
            tool_name: tool_name.to_string(),
            value: value.clone(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ToolOutput::Failed { .. })
    }
}
