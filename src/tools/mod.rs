// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool system for Iris
//!
//! Tools run on the backend. This module declares which tools the
//! assistant may call and decodes what they return.

pub mod definition;
pub mod output;
pub mod registry;

pub use definition::*;
pub use output::*;
pub use registry::*;
