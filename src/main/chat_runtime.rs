// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use iris::chat::{Attachment, ChatSession, TurnConfig};
use iris::config::Settings;
use iris::error::{IrisError, Result};
use iris::llm::HttpTransport;
use iris::tools::ToolRegistry;

/// Build a session talking to `url`, or to the configured endpoint.
pub(super) fn build_session(settings: &Settings, url: Option<&str>) -> Result<ChatSession> {
    settings.validate()?;
    let url = match url {
        Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
            return Err(IrisError::Config(format!(
                "endpoint url must start with http:// or https://, got '{}'",
                url
            )));
        }
        Some(url) => url.to_string(),
        None => settings.endpoint_url(),
    };

    let api_key = settings.api_key();
    if api_key.is_none() {
        tracing::debug!(
            target: "iris.config",
            env = %settings.endpoint.api_key_env,
            "no API key configured, sending requests without authorization"
        );
    }

    let transport = HttpTransport::with_connect_timeout(
        url,
        api_key,
        Duration::from_secs(settings.endpoint.connect_timeout_secs),
    )?;
    Ok(ChatSession::new(
        Arc::new(transport),
        ToolRegistry::with_builtins(),
        TurnConfig::from_settings(settings),
    ))
}

/// Read attachment files, expanding a leading `~`.
pub(super) fn load_attachments(paths: &[PathBuf]) -> Result<Vec<Attachment>> {
    paths
        .iter()
        .map(|path| Attachment::from_path(expand_home(path)))
        .collect()
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_build_session_rejects_bad_url() {
        let settings = Settings::default();
        let err = build_session(&settings, Some("ftp://nope")).err().unwrap();
        assert!(matches!(err, IrisError::Config(_)));
    }

    #[test]
    fn test_build_session_uses_settings() {
        let mut settings = Settings::default();
        settings.conversation.max_steps = 3;
        let session = build_session(&settings, Some("http://127.0.0.1:1/api/chat")).unwrap();
        assert_eq!(session.config().max_steps, 3);
    }

    #[test]
    fn test_load_attachments() {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        file.write_all(b"%PDF-1.7").unwrap();

        let attachments = load_attachments(&[file.path().to_path_buf()]).unwrap();
        assert_eq!(attachments.len(), 1);
        assert!(attachments[0].is_pdf());

        let missing = load_attachments(&[PathBuf::from("/definitely/not/here.png")]);
        assert!(missing.is_err());
    }
}
