// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Data stream decoder
//!
//! The completion endpoint answers with a line-framed stream where every
//! line is `<code>:<json>`. Network chunks split lines (and UTF-8
//! sequences) arbitrarily, so the decoder buffers raw bytes until a full
//! line is available. Events come out in exactly the order they arrived.
//!
//! | code | event |
//! |------|-------|
//! | `0`  | text delta |
//! | `g`  | reasoning delta |
//! | `b`  | tool call start |
//! | `c`  | tool call argument delta |
//! | `9`  | tool call with complete arguments |
//! | `a`  | tool result |
//! | `h`  | source citation |
//! | `e`  | step finished |
//! | `d`  | message finished (usage + done) |
//! | `3`  | error |

use std::collections::HashSet;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::error::Result;
use crate::llm::event::{DecodedEvent, FinishReason, Source, TokenUsage};

/// Codes that are valid on the wire but carry nothing the reducer uses.
const IGNORED_CODES: &[&str] = &["2", "8", "f", "i", "j", "k"];

/// Longest line the decoder buffers before giving up on the stream.
pub const DEFAULT_MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

/// Malformed stream framing. Terminal for the turn.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("stream line is not valid UTF-8")]
    InvalidUtf8,

    #[error("stream line has no type prefix: {0}")]
    MissingPrefix(String),

    #[error("unknown stream part code '{0}'")]
    UnknownCode(String),

    #[error("invalid payload for stream part '{code}': {message}")]
    InvalidPayload { code: String, message: String },

    #[error("stream line exceeds {0} bytes without a newline")]
    LineTooLong(usize),

    #[error("decoder already failed on an earlier frame")]
    Poisoned,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolCallStartPart {
    tool_call_id: String,
    tool_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolCallDeltaPart {
    tool_call_id: String,
    args_text_delta: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolCallPart {
    tool_call_id: String,
    tool_name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolResultPart {
    tool_call_id: String,
    #[serde(default)]
    result: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinishStepPart {
    #[serde(default)]
    finish_reason: FinishReason,
    #[serde(default)]
    is_continued: bool,
}

#[derive(Deserialize)]
struct FinishMessagePart {
    #[serde(default)]
    usage: Option<UsagePart>,
}

/// Counts are `null` when the upstream model did not report usage.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsagePart {
    #[serde(default)]
    prompt_tokens: Option<u32>,
    #[serde(default)]
    completion_tokens: Option<u32>,
}

impl UsagePart {
    fn into_usage(self) -> Option<TokenUsage> {
        if self.prompt_tokens.is_none() && self.completion_tokens.is_none() {
            return None;
        }
        Some(TokenUsage {
            prompt_tokens: self.prompt_tokens.unwrap_or_default(),
            completion_tokens: self.completion_tokens.unwrap_or_default(),
        })
    }
}

/// Incremental decoder for the line-framed data stream.
#[derive(Debug)]
pub struct StreamDecoder {
    buffer: Vec<u8>,
    /// Prefix of `buffer` already known to hold no newline
    scanned: usize,
    max_line_bytes: usize,
    started: HashSet<String>,
    failed: bool,
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::with_max_line_bytes(DEFAULT_MAX_LINE_BYTES)
    }
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder that fails once an unterminated line grows past `max_line_bytes`.
    pub fn with_max_line_bytes(max_line_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            max_line_bytes,
            started: HashSet::new(),
            failed: false,
        }
    }

    /// Bytes received but not yet terminated by a newline.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Feed a chunk of raw bytes, returning every event completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> std::result::Result<Vec<DecodedEvent>, DecodeError> {
        let mut events = Vec::new();
        self.feed_into(chunk, &mut events)?;
        Ok(events)
    }

    /// Like [`feed`](Self::feed), but events decoded before a malformed
    /// line are kept in `out` so callers can deliver them first.
    pub fn feed_into(
        &mut self,
        chunk: &[u8],
        out: &mut Vec<DecodedEvent>,
    ) -> std::result::Result<(), DecodeError> {
        if self.failed {
            return Err(DecodeError::Poisoned);
        }
        self.buffer.extend_from_slice(chunk);

        while let Some(offset) = self.buffer[self.scanned..].iter().position(|b| *b == b'\n') {
            let pos = self.scanned + offset;
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.scanned = 0;
            self.decode_raw_line(&line[..line.len() - 1], out)?;
        }
        self.scanned = self.buffer.len();

        if self.buffer.len() > self.max_line_bytes {
            self.failed = true;
            return Err(DecodeError::LineTooLong(self.max_line_bytes));
        }
        Ok(())
    }

    /// Flush a final line that was not newline-terminated.
    pub fn finish(&mut self) -> std::result::Result<Vec<DecodedEvent>, DecodeError> {
        if self.failed {
            return Err(DecodeError::Poisoned);
        }
        let mut events = Vec::new();
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.scanned = 0;
            self.decode_raw_line(&line, &mut events)?;
        }
        Ok(events)
    }

    fn decode_raw_line(
        &mut self,
        raw: &[u8],
        out: &mut Vec<DecodedEvent>,
    ) -> std::result::Result<(), DecodeError> {
        let result = std::str::from_utf8(raw)
            .map_err(|_| DecodeError::InvalidUtf8)
            .and_then(|line| self.decode_line(line.trim_end_matches('\r'), out));
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    fn decode_line(
        &mut self,
        line: &str,
        out: &mut Vec<DecodedEvent>,
    ) -> std::result::Result<(), DecodeError> {
        if line.trim().is_empty() {
            return Ok(());
        }

        let (code, payload) = line
            .split_once(':')
            .filter(|(code, _)| !code.is_empty() && code.chars().all(|c| c.is_ascii_alphanumeric()))
            .ok_or_else(|| DecodeError::MissingPrefix(truncate(line, 80)))?;

        match code {
            "0" => out.push(DecodedEvent::TextDelta {
                text: parse(code, payload)?,
            }),
            "g" => out.push(DecodedEvent::Reasoning {
                text: parse(code, payload)?,
            }),
            "b" => {
                let part: ToolCallStartPart = parse(code, payload)?;
                self.started.insert(part.tool_call_id.clone());
                out.push(DecodedEvent::ToolCallStart {
                    tool_call_id: part.tool_call_id,
                    tool_name: part.tool_name,
                });
            }
            "c" => {
                let part: ToolCallDeltaPart = parse(code, payload)?;
                out.push(DecodedEvent::ToolCallArgsDelta {
                    tool_call_id: part.tool_call_id,
                    args_fragment: part.args_text_delta,
                });
            }
            "9" => {
                let part: ToolCallPart = parse(code, payload)?;
                // Non-streamed tool calls arrive without a preceding start part.
                if self.started.insert(part.tool_call_id.clone()) {
                    out.push(DecodedEvent::ToolCallStart {
                        tool_call_id: part.tool_call_id.clone(),
                        tool_name: part.tool_name.clone(),
                    });
                }
                out.push(DecodedEvent::ToolCallArgsComplete {
                    tool_call_id: part.tool_call_id,
                    tool_name: part.tool_name,
                    args: part.args,
                });
            }
            "a" => {
                let part: ToolResultPart = parse(code, payload)?;
                out.push(DecodedEvent::ToolCallResult {
                    tool_call_id: part.tool_call_id,
                    result: part.result,
                });
            }
            "h" => out.push(DecodedEvent::Source(parse(code, payload)?)),
            "e" => {
                let part: FinishStepPart = parse(code, payload)?;
                out.push(DecodedEvent::StepFinish {
                    finish_reason: part.finish_reason,
                    is_continued: part.is_continued,
                });
            }
            "d" => {
                let part: FinishMessagePart = parse(code, payload)?;
                if let Some(usage) = part.usage.and_then(UsagePart::into_usage) {
                    out.push(DecodedEvent::Usage(usage));
                }
                out.push(DecodedEvent::Done);
            }
            "3" => out.push(DecodedEvent::Error {
                message: parse(code, payload)?,
            }),
            other if IGNORED_CODES.contains(&other) => {
                // Still has to be well-formed JSON.
                parse::<serde_json::Value>(code, payload)?;
                tracing::trace!(target: "iris.llm.decoder", code = other, "skipping stream part");
            }
            other => return Err(DecodeError::UnknownCode(other.to_string())),
        }
        Ok(())
    }
}

fn parse<T: DeserializeOwned>(code: &str, payload: &str) -> std::result::Result<T, DecodeError> {
    serde_json::from_str(payload).map_err(|e| DecodeError::InvalidPayload {
        code: code.to_string(),
        message: e.to_string(),
    })
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

/// Decode a stream of raw chunks into events.
///
/// The sequence ends after the first error, whether it came from the
/// transport or from malformed framing.
pub fn decode_stream<S>(chunks: S) -> impl Stream<Item = Result<DecodedEvent>> + Send
where
    S: Stream<Item = Result<Bytes>> + Send + 'static,
{
    async_stream::try_stream! {
        let mut decoder = StreamDecoder::new();
        let mut chunks = Box::pin(chunks);
        let mut events = Vec::new();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            let fed = decoder.feed_into(&chunk, &mut events);
            for event in events.drain(..) {
                yield event;
            }
            fed?;
        }
        for event in decoder.finish()? {
            yield event;
        }
    }
}
