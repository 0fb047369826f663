// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Iris - streaming chat client for the IRIS assistant
//!
//! Entry point for the Iris CLI application.

use clap::Parser;
use crossterm::style::Color;

use iris::chat::display::{
    format_attachment, format_error, format_mode_change, format_new_conversation,
};
use iris::chat::input_parser::{parse_input, ChatInput};
use iris::chat::{Attachment, ChatSession};
use iris::cli::{ChatArgs, Cli, Commands};
use iris::config::Settings;
use iris::error::Result;
use iris::llm::Mode;

#[path = "main/chat_runtime.rs"]
mod chat_runtime;
#[path = "main/chat_ui.rs"]
mod chat_ui;
#[path = "main/cli_commands.rs"]
mod cli_commands;

use chat_runtime::{build_session, load_attachments};
use chat_ui::{stdout_colored, stream_turn};
use cli_commands::{print_help, print_welcome, read_user_input, run_ask, run_settings_command};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{}", format_error(&e));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing
    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());

    // `-v` enables session and transport diagnostics; `-vv` everything.
    // `RUST_LOG` still takes precedence.
    let directives: &[&str] = match cli.verbose {
        0 => &[],
        1 => &["iris.chat=debug", "iris.llm=debug"],
        _ => &["iris=trace"],
    };
    for directive in directives {
        if let Ok(parsed) = directive.parse() {
            env_filter = env_filter.add_directive(parsed);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let settings_path = cli.config.clone().unwrap_or_else(Settings::default_path);
    let url = cli.url.as_deref();

    match cli.command {
        None => run_chat(ChatArgs::default(), &settings_path, url).await,
        Some(Commands::Chat(args)) => run_chat(args, &settings_path, url).await,
        Some(Commands::Ask(args)) => {
            let settings = Settings::load_from(&settings_path)?;
            let outcome = run_ask(args, settings, url).await?;
            if !outcome.is_completed() {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Commands::Settings(args)) => run_settings_command(args.command, &settings_path),
    }
}

async fn run_chat(args: ChatArgs, settings_path: &std::path::Path, url: Option<&str>) -> Result<()> {
    let settings = Settings::load_from(settings_path)?;
    let session = build_session(&settings, url)?;
    session.set_flags(args.mode.flags());

    let endpoint = url
        .map(str::to_string)
        .unwrap_or_else(|| settings.endpoint_url());
    print_welcome(&endpoint, session.flags())?;

    let mut pending: Vec<Attachment> = load_attachments(&args.mode.attach)?;
    if let Some(prompt) = args.prompt {
        submit_prompt(&session, &prompt, &mut pending).await?;
    }

    loop {
        for attachment in &pending {
            println!("{}", format_attachment(attachment));
        }
        let Some(input) = read_user_input(session.flags())? else {
            break;
        };

        match parse_input(&input) {
            ChatInput::Exit => break,
            ChatInput::Prompt(text) => submit_prompt(&session, &text, &mut pending).await?,
            ChatInput::New => {
                session.reset();
                pending.clear();
                stdout_colored(Color::Cyan, &format_new_conversation())?;
            }
            ChatInput::ToggleSearch => {
                let flags = session.toggle_mode(Mode::Search);
                stdout_colored(Color::Cyan, &format_mode_change(flags))?;
            }
            ChatInput::ToggleThink => {
                let flags = session.toggle_mode(Mode::Think);
                stdout_colored(Color::Cyan, &format_mode_change(flags))?;
            }
            ChatInput::Attach(path) => match load_attachments(&[path]) {
                Ok(mut loaded) => pending.append(&mut loaded),
                Err(e) => stdout_colored(Color::Red, &format_error(&e))?,
            },
            ChatInput::Regenerate => match stream_turn(&session, session.regenerate()).await {
                Ok(_) => {}
                Err(e) => stdout_colored(Color::Yellow, &format_error(&e))?,
            },
            ChatInput::Help => print_help()?,
            ChatInput::MissingArgument(usage) => {
                stdout_colored(Color::Yellow, &format!("Usage: {}", usage))?
            }
            ChatInput::Unknown(name) => stdout_colored(
                Color::Yellow,
                &format!("Unknown command /{}. Type /help for commands.", name),
            )?,
        }
    }

    Ok(())
}

/// Send a prompt with the pending attachments. Attachments are kept if the
/// prompt is rejected.
async fn submit_prompt(
    session: &ChatSession,
    text: &str,
    pending: &mut Vec<Attachment>,
) -> Result<()> {
    let attachments = std::mem::take(pending);
    match stream_turn(session, session.submit(text, attachments.clone())).await {
        Ok(_) => Ok(()),
        Err(e) if !e.is_turn_failure() => {
            *pending = attachments;
            stdout_colored(Color::Yellow, &format_error(&e))
        }
        Err(e) => Err(e),
    }
}
