use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use sasha_core::config::{AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

struct Field {
    key_path: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec![
        "effective config (source precedence: env > file > default):".to_string(),
        format!("- bot name = {}", config.bot_name()),
    ];
    lines.extend(fields(&config).into_iter().map(|field| {
        let source = field_source(
            field.key_path,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        render_line(field.key_path, &field.value, source)
    }));

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let bot = &config.bot;
    let slack = &config.slack;
    let integrations = &config.integrations;

    vec![
        field("bot.log_name", &["SASHA_BOT_LOG_NAME"], bot.log_name.clone()),
        field("bot.debug", &["SASHA_DEBUG"], bot.debug.to_string()),
        field("bot.triggers", &["SASHA_BOT_TRIGGERS"], bot.triggers.join(", ")),
        field("bot.test_channel", &["SASHA_BOT_TEST_CHANNEL"], bot.test_channel.clone()),
        field(
            "bot.directory_channel",
            &["SASHA_BOT_DIRECTORY_CHANNEL"],
            bot.directory_channel.clone(),
        ),
        field(
            "bot.spreadsheet_key",
            &["SASHA_BOT_SPREADSHEET_KEY"],
            or_unset(&bot.spreadsheet_key),
        ),
        field(
            "bot.approved_users",
            &["SASHA_BOT_APPROVED_USERS"],
            bot.approved_users.join(", "),
        ),
        field(
            "slack.bot_token",
            &["SASHA_SLACK_BOT_TOKEN"],
            redact_token(slack.bot_token.expose_secret()),
        ),
        field(
            "slack.user_token",
            &["SASHA_SLACK_USER_TOKEN"],
            slack
                .user_token
                .as_ref()
                .map(|token| redact_token(token.expose_secret()))
                .unwrap_or_else(|| "<unset>".to_string()),
        ),
        field(
            "slack.signing_secret",
            &["SASHA_SLACK_SIGNING_SECRET"],
            presence(&slack.signing_secret),
        ),
        field("slack.api_base_url", &["SASHA_SLACK_API_BASE_URL"], slack.api_base_url.clone()),
        field(
            "server.bind_address",
            &["SASHA_SERVER_BIND_ADDRESS"],
            config.server.bind_address.clone(),
        ),
        field("server.port", &["SASHA_SERVER_PORT"], config.server.port.to_string()),
        field(
            "integrations.linguistics_base_url",
            &["SASHA_LINGUISTICS_BASE_URL"],
            or_unset(&integrations.linguistics_base_url),
        ),
        field(
            "integrations.inspiration_url",
            &["SASHA_INSPIRATION_URL"],
            integrations.inspiration_url.clone(),
        ),
        field(
            "integrations.request_timeout_secs",
            &["SASHA_HTTP_TIMEOUT_SECS"],
            integrations.request_timeout_secs.to_string(),
        ),
        field(
            "logging.level",
            &["SASHA_LOGGING_LEVEL", "SASHA_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        field(
            "logging.format",
            &["SASHA_LOGGING_FORMAT", "SASHA_LOG_FORMAT"],
            format!("{:?}", config.logging.format),
        ),
    ]
}

fn field(key_path: &'static str, env_keys: &'static [&'static str], value: String) -> Field {
    Field { key_path, env_keys, value }
}

fn or_unset(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "<unset>".to_string())
}

fn presence(secret: &Option<SecretString>) -> String {
    if secret.is_some() { "<redacted>" } else { "<unset>" }.to_string()
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("sasha.toml"), PathBuf::from("config/sasha.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
