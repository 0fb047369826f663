// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! CLI argument definitions using Clap
//!
//! Defines all command-line arguments and subcommands for Iris.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::llm::model::ModeFlags;

/// Iris - streaming chat client for the IRIS assistant
#[derive(Parser, Debug)]
#[command(name = "iris")]
#[command(version, about = "Streaming chat client for the IRIS assistant")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Settings file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Chat endpoint URL (overrides settings)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start interactive chat session (default when no command given)
    Chat(ChatArgs),

    /// Ask a single question (non-interactive)
    Ask(AskArgs),

    /// Manage configuration
    #[command(alias = "config")]
    Settings(SettingsArgs),
}

/// Mode selection shared by chat and ask
#[derive(clap::Args, Debug, Default, Clone)]
pub struct ModeArgs {
    /// Answer with live web search
    #[arg(short, long, conflicts_with = "think")]
    pub search: bool,

    /// Answer with the reasoning model
    #[arg(short, long)]
    pub think: bool,

    /// Files to attach to the first message
    #[arg(short, long, value_name = "FILE", num_args = 1..)]
    pub attach: Vec<PathBuf>,
}

impl ModeArgs {
    pub fn flags(&self) -> ModeFlags {
        ModeFlags::new(self.search, self.think)
    }
}

/// Arguments for the chat subcommand
#[derive(clap::Args, Debug, Default)]
pub struct ChatArgs {
    /// Initial prompt (optional)
    pub prompt: Option<String>,

    #[command(flatten)]
    pub mode: ModeArgs,
}

/// Arguments for the ask subcommand
#[derive(clap::Args, Debug)]
pub struct AskArgs {
    /// The question to ask
    pub prompt: String,

    #[command(flatten)]
    pub mode: ModeArgs,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the settings subcommand
#[derive(clap::Args, Debug)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommands,
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    /// Print the effective settings
    Show,

    /// Write a settings file with defaults
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the settings file location
    Path,
}

/// Output format for non-interactive answers
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Text,

    /// The final assistant message as JSON
    Json,
}
