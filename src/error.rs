// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Error types for Iris
//!
//! This module defines all error types used throughout the application.
//! Only transport and protocol failures end a turn as failed; tool errors
//! are carried as data inside tool results.

use thiserror::Error;

use crate::llm::decoder::DecodeError;

/// Main error type for Iris operations
#[derive(Error, Debug)]
pub enum IrisError {
    /// Rejected user input (e.g. an empty prompt)
    #[error("Validation error: {0}")]
    Validation(String),

    /// A turn is already submitting or streaming
    #[error("A response is already being generated")]
    TurnInProgress,

    /// API-related errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Malformed stream framing
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// API-specific error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Authentication failed (invalid bearer token)
    #[error("Authentication failed: invalid API key")]
    AuthenticationFailed,

    /// Rate limited by the API
    #[error("Rate limited: retry after {0} seconds")]
    RateLimited(u32),

    /// Connection to the endpoint could not be established
    #[error("Network error: {0}")]
    Network(String),

    /// Endpoint answered with a non-success status before streaming began
    #[error("API error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Connection dropped or stalled after streaming began
    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    /// No stream event arrived within the idle window
    #[error("No data received for {0} seconds")]
    IdleTimeout(u64),
}

/// Result type alias for Iris operations
pub type Result<T> = std::result::Result<T, IrisError>;

impl IrisError {
    /// Whether this error ends an in-flight turn as failed.
    ///
    /// Validation and concurrency rejections never start a turn, so they
    /// are not turn failures.
    pub fn is_turn_failure(&self) -> bool {
        !matches!(self, IrisError::Validation(_) | IrisError::TurnInProgress)
    }
}
