// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::io::{self, Write};
use std::path::Path;

use crossterm::{
    style::{Color, ResetColor, SetForegroundColor},
    ExecutableCommand,
};

use iris::chat::display::{format_help, format_prompt, format_welcome};
use iris::chat::TurnOutcome;
use iris::cli::{AskArgs, OutputFormat, SettingsCommands};
use iris::config::Settings;
use iris::error::{IrisError, Result};
use iris::llm::ModeFlags;

use super::chat_runtime::{build_session, load_attachments};
use super::chat_ui::stream_turn;

/// Print the welcome banner
pub(super) fn print_welcome(endpoint: &str, flags: ModeFlags) -> Result<()> {
    let mut stdout = io::stdout();
    stdout.execute(SetForegroundColor(Color::Cyan))?;
    println!("iris v{}", env!("CARGO_PKG_VERSION"));
    stdout.execute(ResetColor)?;
    print!("{}", format_welcome(endpoint, flags));
    println!();
    Ok(())
}

pub(super) fn print_help() -> Result<()> {
    println!("\n{}\n", format_help());
    Ok(())
}

/// Read one line of user input. Returns None at end of input.
pub(super) fn read_user_input(flags: ModeFlags) -> Result<Option<String>> {
    let mut stdout = io::stdout();
    stdout.execute(SetForegroundColor(Color::Green))?;
    print!("{}", format_prompt(flags));
    stdout.execute(ResetColor)?;
    stdout.flush()?;

    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim_end_matches(['\r', '\n']).to_string()))
}

/// Ask a single question and print the answer.
pub(super) async fn run_ask(
    args: AskArgs,
    settings: Settings,
    url: Option<&str>,
) -> Result<TurnOutcome> {
    let session = build_session(&settings, url)?;
    session.set_flags(args.mode.flags());
    let attachments = load_attachments(&args.mode.attach)?;

    let outcome = match args.format {
        OutputFormat::Text => {
            stream_turn(&session, session.submit(&args.prompt, attachments)).await?
        }
        OutputFormat::Json => {
            let outcome = session.submit(&args.prompt, attachments).await?;
            if let Some(reply) = session.snapshot().last_assistant() {
                println!("{}", serde_json::to_string_pretty(reply)?);
            }
            outcome
        }
    };

    Ok(outcome)
}

pub(super) fn run_settings_command(command: SettingsCommands, path: &Path) -> Result<()> {
    match command {
        SettingsCommands::Show => {
            let mut settings = Settings::load_from(path)?;
            if settings.endpoint.api_key.is_some() {
                settings.endpoint.api_key = Some("********".to_string());
            }
            println!("{}", serde_json::to_string_pretty(&settings)?);
            if settings.api_key().is_none() {
                println!(
                    "\nNo API key found in ${} or the settings file.",
                    settings.endpoint.api_key_env
                );
            }
        }
        SettingsCommands::Init { force } => {
            if path.exists() && !force {
                return Err(IrisError::Config(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )));
            }
            Settings::default().save_to_clean(path)?;
            println!("Wrote default settings to {}", path.display());
        }
        SettingsCommands::Path => println!("{}", path.display()),
    }
    Ok(())
}
