// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Iris - streaming chat client for the IRIS tool-augmented assistant.
//!
//! This crate exposes the conversation runtime used by the `iris` CLI
//! (`src/main.rs`). Presentation stays in the binary; everything here is
//! plain state and streams.
//!
//! Architecture highlights:
//! - `llm`: transport to the completion endpoint, wire decoding, model selection
//! - `chat`: conversation reducer, tool call tracking, session driver, display helpers
//! - `tools`: tool declarations and typed tool results
//! - `config`: settings stored in `~/.iris/settings.json`
//! - `cli`: command-line arguments

pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod tools;

pub use error::{IrisError, Result};
