//! Startup configuration loading and fail-fast validation.

use std::io::Write;

use telegram_health_publisher::error::AppError;
use telegram_health_publisher::models::Config;
use telegram_health_publisher::publisher::TelegramPublisher;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn loads_full_config() {
    let file = write_config(
        r#"
        [telegram]
        base_url = "https://api.telegram.org"
        bot_token = "123456:TEST"
        chat_id = -2718281828

        [resilience]
        max_attempts = 5
        base_delay_ms = 500
        max_delay_ms = 8000
        jitter = 0.1
        attempt_timeout_secs = 10

        [http]
        user_agent = "status-bot/2.0"

        [policy]
        predicate = "on_change"
        formatter = "detailed"
        "#,
    );

    let config = Config::load_validated(file.path()).unwrap();
    assert_eq!(config.telegram.chat_id, -2718281828);
    assert_eq!(config.resilience.max_attempts, 5);
    assert_eq!(config.http.user_agent, "status-bot/2.0");
    assert_eq!(config.http.connect_timeout_secs, 10);
    assert_eq!(config.policy.formatter, "detailed");
}

#[test]
fn non_https_base_url_fails_startup() {
    let file = write_config(
        r#"
        [telegram]
        base_url = "http://api.telegram.org"
        bot_token = "123456:TEST"
        chat_id = 42
        "#,
    );

    let err = Config::load_validated(file.path()).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[test]
fn zero_chat_id_fails_startup() {
    let file = write_config(
        r#"
        [telegram]
        bot_token = "123456:TEST"
        chat_id = 0
        "#,
    );

    let err = Config::load_validated(file.path()).unwrap_err();
    assert!(err.to_string().contains("chat_id"));
}

#[test]
fn missing_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load_validated(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn malformed_toml_is_a_config_error() {
    let file = write_config("[telegram\nchat_id = ");
    assert!(matches!(
        Config::load_validated(file.path()),
        Err(AppError::Config(_))
    ));
}

#[test]
fn publisher_refuses_invalid_config() {
    let mut config = Config::default();
    config.telegram.base_url = "http://api.telegram.org".to_string();
    config.telegram.bot_token = "123456:TEST".to_string();
    config.telegram.chat_id = 7;

    let result = TelegramPublisher::from_config(&config, reqwest::Client::new());
    assert!(result.is_err());
}
