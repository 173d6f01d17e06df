// Tests for configuration loading

use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use voice_interview::Config;

#[test]
fn test_load_shipped_config() {
    let cfg = Config::load("config/voice-interview").unwrap();

    assert_eq!(cfg.service.name, "voice-interview");
    assert_eq!(cfg.service.http.port, 3000);
    assert_eq!(cfg.provider.model, "gpt-realtime");
    assert_eq!(cfg.provider.voice, "echo");
    assert_eq!(cfg.provider.api_key_env, "OPENAI_API_KEY");
    assert_eq!(cfg.client.connect_timeout(), Duration::from_secs(15));
}

#[test]
fn test_partial_config_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("partial.toml");
    fs::write(
        &path,
        r#"
[provider]
voice = "alloy"

[client]
connect_timeout_secs = 5
"#,
    )
    .unwrap();

    let cfg = Config::load(path.to_str().unwrap()).unwrap();

    assert_eq!(cfg.provider.voice, "alloy");
    assert_eq!(cfg.provider.model, "gpt-realtime", "unset keys keep defaults");
    assert_eq!(cfg.provider.base_url, "https://api.openai.com/v1");
    assert_eq!(cfg.client.connect_timeout(), Duration::from_secs(5));
    assert_eq!(cfg.client.session_url, "http://127.0.0.1:3000/api/session");
    assert_eq!(cfg.service.http.bind, "0.0.0.0");
}

#[test]
fn test_missing_config_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    let err = Config::load(path.to_str().unwrap()).unwrap_err();

    assert!(err.to_string().contains("Failed to read config"));
}

#[test]
fn test_secret_is_not_part_of_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("secret.toml");
    fs::write(
        &path,
        r#"
[provider]
api_key_env = "INTERVIEW_PROVIDER_KEY"
"#,
    )
    .unwrap();

    let cfg = Config::load(path.to_str().unwrap()).unwrap();

    // Only the variable name is configured; the value is read per request
    assert_eq!(cfg.provider.api_key_env, "INTERVIEW_PROVIDER_KEY");
}
