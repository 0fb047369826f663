// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::time::Duration;

use chrono::NaiveDate;
use tempfile::TempDir;

use iris::chat::TurnConfig;
use iris::config::Settings;
use iris::error::IrisError;

#[test]
fn test_missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let settings = Settings::load_from(&dir.path().join("settings.json")).unwrap();
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.conversation.max_steps, 10);
    assert_eq!(settings.models.search, "searchgpt");
}

#[test]
fn test_partial_file_fills_in_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(
        &path,
        r#"{"endpoint": {"url": "https://iris.example.com/api/chat"}, "conversation": {"max_steps": 4}}"#,
    )
    .unwrap();

    let settings = Settings::load_from(&path).unwrap();
    assert_eq!(settings.endpoint.url, "https://iris.example.com/api/chat");
    assert_eq!(settings.endpoint.api_key_env, "IRIS_API_KEY");
    assert_eq!(settings.conversation.max_steps, 4);
    assert!(settings.conversation.include_date);
    assert_eq!(settings.models.reasoning, "deepseek-reasoning");
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(matches!(Settings::load_from(&path), Err(IrisError::Json(_))));
}

#[test]
fn test_save_keeps_unknown_keys() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("settings.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, r#"{"theme": "dark", "endpoint": {"extra": 1}}"#).unwrap();

    let mut settings = Settings::load_from(&path).unwrap();
    settings.conversation.idle_timeout_secs = 30;
    settings.save_to(&path).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["theme"], "dark");
    assert_eq!(raw["endpoint"]["extra"], 1);
    assert_eq!(raw["conversation"]["idle_timeout_secs"], 30);

    let reloaded = Settings::load_from(&path).unwrap();
    assert_eq!(reloaded.conversation.idle_timeout_secs, 30);
}

#[test]
fn test_validate_rejects_unusable_settings() {
    let mut settings = Settings::default();
    settings.endpoint.url = "https://iris.example.com/api/chat".to_string();

    settings.conversation.max_steps = 0;
    assert!(matches!(settings.validate(), Err(IrisError::Config(_))));

    settings.conversation.max_steps = 10;
    settings.models.default = "  ".to_string();
    assert!(matches!(settings.validate(), Err(IrisError::Config(_))));
}

#[test]
fn test_turn_config_from_settings() {
    let mut settings = Settings::default();
    settings.conversation.max_steps = 6;
    settings.conversation.idle_timeout_secs = 15;
    settings.conversation.system_prompt = Some("Be brief.".to_string());

    let config = TurnConfig::from_settings(&settings);
    assert_eq!(config.max_steps, 6);
    assert_eq!(config.idle_timeout, Duration::from_secs(15));

    let today = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
    assert_eq!(
        config.system_prompt_for(today).unwrap(),
        "Be brief.\n\nToday's date is 7 March 2025. Please consider this current date for context."
    );
}
