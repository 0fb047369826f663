// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Display formatting for the chat interface
//!
//! Functions here return formatted strings rather than writing to stdout,
//! so the terminal front end stays thin and everything is testable.

use crate::chat::message::{Attachment, InvocationState, ToolInvocation};
use crate::chat::reducer::TurnOutcome;
use crate::error::{ApiError, IrisError};
use crate::llm::event::{Source, TokenUsage};
use crate::llm::model::{ModeFlags, ModelVariant};
use crate::tools::output::{
    GeneratedImage, SearchSummary, ToolOutput, VideoTranscript, WeatherReport,
};
use crate::tools::registry::ToolKind;

/// How a tool invocation is shown while it runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocationDisplay {
    pub tool_name: String,
    pub summary: String,
    pub finished: bool,
}

/// Format a tool invocation for display
pub fn format_tool_invocation(invocation: &ToolInvocation) -> ToolInvocationDisplay {
    let summary = match invocation.state {
        InvocationState::Result => format_tool_input_summary(&invocation.tool_name, &invocation.args),
        InvocationState::PartialCall | InvocationState::Call => {
            format_pending_label(&invocation.tool_name)
        }
    };
    ToolInvocationDisplay {
        tool_name: invocation.tool_name.clone(),
        summary,
        finished: invocation.is_finished(),
    }
}

/// Label shown while a tool has not produced its result
pub fn format_pending_label(tool_name: &str) -> String {
    match ToolKind::from_wire_name(tool_name) {
        Some(kind) => kind.pending_label().to_string(),
        None => format!("Running {}...", tool_name),
    }
}

/// One-line summary of what a tool was asked to do
pub fn format_tool_input_summary(tool_name: &str, args: &serde_json::Value) -> String {
    let arg = |key: &str| args.get(key).and_then(|v| v.as_str());
    match ToolKind::from_wire_name(tool_name) {
        Some(ToolKind::DisplayWeather) => match arg("location") {
            Some(location) => format!("Weather for {}", location),
            None => "Weather".to_string(),
        },
        Some(ToolKind::GenerateImage) => match arg("prompt") {
            Some(prompt) => format!("Image: {}", truncate_string(prompt, 40)),
            None => "Image".to_string(),
        },
        Some(ToolKind::WebSearch) => match arg("query") {
            Some(query) => format!("Searched for '{}'", truncate_string(query, 40)),
            None => "Web search".to_string(),
        },
        Some(ToolKind::YoutubeTranscription) => match arg("url") {
            Some(url) => format!("Transcribed {}", truncate_string(url, 50)),
            None => "Video transcript".to_string(),
        },
        None => tool_name.to_string(),
    }
}

/// Truncate a string for display with ellipsis
pub fn truncate_string(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

/// Render a finished tool result as text lines
pub fn format_tool_output(output: &ToolOutput) -> String {
    match output {
        ToolOutput::Weather(report) => format_weather_card(report),
        ToolOutput::Image(image) => format_image(image),
        ToolOutput::WebSearch(summary) => format_search_summary(summary),
        ToolOutput::Transcript(transcript) => format_transcript(transcript, 5),
        ToolOutput::Failed { error, details } => match details {
            Some(details) => format!("Error: {}\n  {}", error, details),
            None => format!("Error: {}", error),
        },
        ToolOutput::Raw { tool_name, value } => {
            let body = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            format!("{} returned:\n{}", tool_name, preview_lines(&body, 10))
        }
    }
}

/// Weather card: location, temperature, conditions
pub fn format_weather_card(report: &WeatherReport) -> String {
    let location = &report.location;
    let current = &report.current;

    let mut place = location.name.clone();
    for part in [&location.region, &location.country] {
        if !part.is_empty() && part != &location.name {
            place.push_str(", ");
            place.push_str(part);
        }
    }

    let mut out = format!("{}\n", place);
    let condition = current
        .condition
        .as_ref()
        .map(|c| c.text.as_str())
        .unwrap_or("Unknown conditions");
    out.push_str(&format!("  {:.0}°C  {}", current.temp_c, condition));

    let mut details = Vec::new();
    if let Some(feels) = current.feelslike_c {
        details.push(format!("feels like {:.0}°C", feels));
    }
    if let Some(humidity) = current.humidity {
        details.push(format!("humidity {:.0}%", humidity));
    }
    if let Some(wind) = current.wind_kph {
        match &current.wind_dir {
            Some(dir) => details.push(format!("wind {:.0} km/h {}", wind, dir)),
            None => details.push(format!("wind {:.0} km/h", wind)),
        }
    }
    if !details.is_empty() {
        out.push_str(&format!("\n  {}", details.join(" | ")));
    }
    if !location.localtime.is_empty() {
        out.push_str(&format!("\n  Local time {}", location.localtime));
    }
    out
}

pub fn format_image(image: &GeneratedImage) -> String {
    format!("Image for \"{}\"\n  {}", image.prompt, image.image_url)
}

pub fn format_search_summary(summary: &SearchSummary) -> String {
    let mut out = summary.summary.trim().to_string();
    if !summary.sources.is_empty() {
        out.push_str("\nSources:");
        for (i, source) in summary.sources.iter().enumerate() {
            if source.title.is_empty() {
                out.push_str(&format!("\n  [{}] {}", i + 1, source.url));
            } else {
                out.push_str(&format!("\n  [{}] {} - {}", i + 1, source.title, source.url));
            }
        }
    }
    out
}

pub fn format_transcript(transcript: &VideoTranscript, max_lines: usize) -> String {
    let mut out = String::new();
    if let Some(link) = &transcript.embed_link {
        out.push_str(&format!("Video: {}\n", link));
    }
    out.push_str(&preview_lines(transcript.transcript.trim(), max_lines));
    out
}

/// First `max_lines` lines, with a count of what was left out
fn preview_lines(content: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    if lines.len() <= max_lines {
        return content.to_string();
    }
    format!(
        "{}\n... ({} more lines)",
        lines[..max_lines].join("\n"),
        lines.len() - max_lines
    )
}

/// Cited sources, numbered
pub fn format_sources(sources: &[Source]) -> String {
    sources
        .iter()
        .enumerate()
        .map(|(i, s)| match &s.title {
            Some(title) => format!("[{}] {} - {}", i + 1, title, s.url),
            None => format!("[{}] {}", i + 1, s.url),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_usage(usage: &TokenUsage) -> String {
    format!(
        "{} tokens ({} prompt, {} completion)",
        usage.total_tokens(),
        usage.prompt_tokens,
        usage.completion_tokens
    )
}

/// Attachment chip: name, kind and size
pub fn format_attachment(attachment: &Attachment) -> String {
    let kind = if attachment.is_image() {
        "image"
    } else if attachment.is_pdf() {
        "pdf"
    } else {
        "file"
    };
    if attachment.size_bytes == 0 {
        format!("[{}: {}]", kind, attachment.name)
    } else {
        format!(
            "[{}: {}, {}]",
            kind,
            attachment.name,
            format_size(attachment.size_bytes)
        )
    }
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Short indicator of the active mode
pub fn format_mode_indicator(flags: ModeFlags) -> String {
    match flags.variant() {
        ModelVariant::Search => "[search]".to_string(),
        ModelVariant::Reasoning => "[think]".to_string(),
        ModelVariant::Default => String::new(),
    }
}

/// Input prompt, including the active mode
pub fn format_prompt(flags: ModeFlags) -> String {
    let mode = format_mode_indicator(flags);
    if mode.is_empty() {
        "> ".to_string()
    } else {
        format!("{} > ", mode)
    }
}

pub fn format_mode_change(flags: ModeFlags) -> String {
    match flags.variant() {
        ModelVariant::Search => "Web search enabled".to_string(),
        ModelVariant::Reasoning => "Reasoning enabled".to_string(),
        ModelVariant::Default => "Default mode".to_string(),
    }
}

/// Message shown when a turn ends other than by completing
pub fn format_turn_outcome(outcome: &TurnOutcome) -> Option<String> {
    match outcome {
        TurnOutcome::Completed => None,
        TurnOutcome::Cancelled => Some("Stopped.".to_string()),
        TurnOutcome::Failed(reason) => Some(format!(
            "Something went wrong: {}\nUse /regenerate to try again.",
            reason
        )),
    }
}

/// Welcome banner
pub fn format_welcome(endpoint: &str, flags: ModeFlags) -> String {
    let mut output = String::new();
    output.push_str("IRIS - streaming assistant\n");
    output.push_str(&format!("Endpoint: {}\n", endpoint));
    let mode = format_mode_change(flags);
    output.push_str(&format!("Mode: {}\n", mode));
    output.push_str("\nType /help for commands, or start chatting.\n");
    output
}

pub fn format_help() -> String {
    [
        "Commands:",
        "  /new             Start a new conversation",
        "  /search          Toggle web search",
        "  /think           Toggle reasoning",
        "  /attach <path>   Attach a file to the next message",
        "  /regenerate      Ask again for the last reply",
        "  /help            Show this help",
        "  /quit            Exit",
        "",
        "Press Ctrl-C while a reply is streaming to stop it.",
    ]
    .join("\n")
}

/// Format an error with a hint on how to fix it, where there is one
pub fn format_error(error: &IrisError) -> String {
    match error {
        IrisError::Validation(message) => message.clone(),
        IrisError::Api(ApiError::AuthenticationFailed) => {
            "Authentication failed. Set IRIS_API_KEY or endpoint.api_key in settings.".to_string()
        }
        IrisError::Api(ApiError::RateLimited(secs)) => {
            format!("Rate limited. Try again in {} seconds.", secs)
        }
        IrisError::Api(ApiError::Network(message)) => format!(
            "Could not reach the chat endpoint: {}\nCheck endpoint.url or IRIS_BASE_URL.",
            message
        ),
        IrisError::Config(message) => format!("Configuration error: {}", message),
        other => format!("Error: {}", other),
    }
}

pub fn format_new_conversation() -> String {
    "Started a new conversation.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::output::{
        CurrentConditions, SearchSource, WeatherCondition, WeatherLocation,
    };
    use serde_json::json;

    fn paris() -> WeatherReport {
        WeatherReport {
            location: WeatherLocation {
                name: "Paris".to_string(),
                region: "Ile-de-France".to_string(),
                country: "France".to_string(),
                localtime: "2025-05-01 12:00".to_string(),
            },
            current: CurrentConditions {
                temp_c: 18.2,
                temp_f: Some(64.8),
                condition: Some(WeatherCondition {
                    text: "Partly cloudy".to_string(),
                    icon: None,
                    code: None,
                }),
                wind_kph: Some(11.0),
                wind_dir: Some("WSW".to_string()),
                humidity: Some(52.0),
                feelslike_c: None,
                is_day: Some(1),
            },
        }
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("", 5), "");
    }

    #[test]
    fn test_truncate_string_multibyte() {
        assert_eq!(truncate_string("ééééééé", 5), "éé...");
    }

    #[test]
    fn test_pending_labels() {
        assert_eq!(format_pending_label("displayWeather"), "Analysing Weather...");
        assert_eq!(format_pending_label("webSearchTool"), "Searching Web...");
        assert_eq!(format_pending_label("cameraAiTool"), "Running cameraAiTool...");
    }

    #[test]
    fn test_tool_invocation_display_follows_state() {
        let mut inv = ToolInvocation::started("call_1", "generateImage");
        assert_eq!(format_tool_invocation(&inv).summary, "Generating Image...");

        inv.args = json!({"prompt": "a red fox in snow"});
        inv.state = InvocationState::Result;
        let display = format_tool_invocation(&inv);
        assert_eq!(display.summary, "Image: a red fox in snow");
        assert!(display.finished);
    }

    #[test]
    fn test_weather_card() {
        let card = format_weather_card(&paris());
        assert!(card.starts_with("Paris, Ile-de-France, France\n"));
        assert!(card.contains("18°C  Partly cloudy"));
        assert!(card.contains("humidity 52%"));
        assert!(card.contains("wind 11 km/h WSW"));
        assert!(card.contains("Local time 2025-05-01 12:00"));
    }

    #[test]
    fn test_failed_output() {
        let output = ToolOutput::Failed {
            error: "No data".to_string(),
            details: None,
        };
        assert_eq!(format_tool_output(&output), "Error: No data");
    }

    #[test]
    fn test_search_summary_lists_sources() {
        let text = format_search_summary(&SearchSummary {
            summary: "Answer.".to_string(),
            sources: vec![SearchSource {
                title: "Docs".to_string(),
                url: "https://doc.rust-lang.org".to_string(),
            }],
        });
        assert_eq!(text, "Answer.\nSources:\n  [1] Docs - https://doc.rust-lang.org");
    }

    #[test]
    fn test_transcript_preview() {
        let transcript = VideoTranscript {
            transcript: "a\nb\nc\nd".to_string(),
            embed_link: None,
        };
        assert_eq!(format_transcript(&transcript, 2), "a\nb\n... (2 more lines)");
    }

    #[test]
    fn test_attachment_chip() {
        let image = Attachment::from_bytes("cat.png", "image/png", &[0u8; 2048]);
        assert_eq!(format_attachment(&image), "[image: cat.png, 2.0 KB]");
        let pdf = Attachment::remote("paper.pdf", "application/pdf", "https://x/paper.pdf");
        assert_eq!(format_attachment(&pdf), "[pdf: paper.pdf]");
    }

    #[test]
    fn test_prompt_shows_mode() {
        assert_eq!(format_prompt(ModeFlags::default()), "> ");
        assert_eq!(format_prompt(ModeFlags::new(true, false)), "[search] > ");
        assert_eq!(format_prompt(ModeFlags::new(false, true)), "[think] > ");
    }

    #[test]
    fn test_turn_outcome_messages() {
        assert!(format_turn_outcome(&TurnOutcome::Completed).is_none());
        assert_eq!(
            format_turn_outcome(&TurnOutcome::Cancelled).as_deref(),
            Some("Stopped.")
        );
        assert!(format_turn_outcome(&TurnOutcome::Failed("boom".to_string()))
            .unwrap()
            .contains("boom"));
    }

    #[test]
    fn test_format_error_hints() {
        let auth = format_error(&IrisError::Api(ApiError::AuthenticationFailed));
        assert!(auth.contains("IRIS_API_KEY"));
        let empty = format_error(&IrisError::Validation("Please enter a prompt first".to_string()));
        assert_eq!(empty, "Please enter a prompt first");
    }

    #[test]
    fn test_usage_and_sources() {
        let usage = TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
        };
        assert_eq!(format_usage(&usage), "15 tokens (10 prompt, 5 completion)");

        let sources = vec![
            Source {
                url: "https://a".to_string(),
                title: Some("A".to_string()),
            },
            Source {
                url: "https://b".to_string(),
                title: None,
            },
        ];
        assert_eq!(format_sources(&sources), "[1] A - https://a\n[2] https://b");
    }
}
