// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Completion endpoint client
//!
//! Transport, wire decoding and model selection for the streaming chat
//! endpoint.

pub mod decoder;
pub mod event;
pub mod mock_transport;
pub mod model;
pub mod transport;

pub use decoder::{decode_stream, DecodeError, StreamDecoder, DEFAULT_MAX_LINE_BYTES};
pub use event::*;
pub use model::*;
pub use transport::*;
