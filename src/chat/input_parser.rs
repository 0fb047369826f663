// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Input parsing for the interactive chat
//!
//! Pure functions that classify a line typed by the user.

use std::path::PathBuf;

/// What a line of user input asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    /// Text to send to the assistant
    Prompt(String),
    /// Start a new conversation
    New,
    ToggleSearch,
    ToggleThink,
    /// Queue a file for the next prompt
    Attach(PathBuf),
    Regenerate,
    Help,
    Exit,
    /// A slash command that needs an argument it did not get
    MissingArgument(&'static str),
    /// A slash command that does not exist
    Unknown(String),
}

/// Check if user input is an exit command.
pub fn is_exit_command(input: &str) -> bool {
    let trimmed = input.trim().to_lowercase();
    matches!(trimmed.as_str(), "exit" | "quit" | "/exit" | "/quit")
}

/// Classify a line of input.
pub fn parse_input(input: &str) -> ChatInput {
    let trimmed = input.trim();
    if is_exit_command(trimmed) {
        return ChatInput::Exit;
    }
    let Some(command) = trimmed.strip_prefix('/') else {
        return ChatInput::Prompt(input.to_string());
    };

    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };
    match name.to_lowercase().as_str() {
        "new" | "clear" => ChatInput::New,
        "search" => ChatInput::ToggleSearch,
        "think" => ChatInput::ToggleThink,
        "regenerate" | "retry" => ChatInput::Regenerate,
        "help" | "?" => ChatInput::Help,
        "attach" if rest.is_empty() => ChatInput::MissingArgument("/attach <path>"),
        "attach" => ChatInput::Attach(PathBuf::from(rest)),
        other => ChatInput::Unknown(other.to_string()),
    }
}
