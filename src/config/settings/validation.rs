// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use crate::error::{IrisError, Result};

use super::{Settings, BASE_URL_ENV};

impl Settings {
    /// Get the bearer token, checking the configured env var first.
    pub fn api_key(&self) -> Option<String> {
        // Priority: env var > config file.
        std::env::var(&self.endpoint.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.endpoint.api_key.clone())
    }

    /// Get the endpoint URL, checking IRIS_BASE_URL first.
    pub fn endpoint_url(&self) -> String {
        std::env::var(BASE_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| self.endpoint.url.clone())
    }

    /// Check that the settings can drive a session.
    pub fn validate(&self) -> Result<()> {
        let url = self.endpoint_url();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(IrisError::Config(format!(
                "endpoint url must start with http:// or https://, got '{}'",
                url
            )));
        }
        if self.conversation.max_steps == 0 {
            return Err(IrisError::Config(
                "conversation.max_steps must be at least 1".to_string(),
            ));
        }
        if self.conversation.idle_timeout_secs == 0 {
            return Err(IrisError::Config(
                "conversation.idle_timeout_secs must be greater than 0".to_string(),
            ));
        }
        for (name, model) in [
            ("default", &self.models.default),
            ("search", &self.models.search),
            ("reasoning", &self.models.reasoning),
        ] {
            if model.trim().is_empty() {
                return Err(IrisError::Config(format!("models.{} must not be empty", name)));
            }
        }
        Ok(())
    }
}
