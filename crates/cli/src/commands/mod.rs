pub mod config;
pub mod dispatch;
pub mod doctor;
pub mod table;

use std::sync::Arc;

use sasha_core::config::{AppConfig, LoadOptions};
use sasha_core::linguistics::UnconfiguredLinguistics;
use sasha_slack::commands::CommandTableError;
use sasha_slack::delivery::{RecordingDelivery, UnavailableImageSource};
use sasha_slack::{BotSettings, Collaborators, Sasha};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: String,
    message: String,
}

impl CommandResult {
    pub fn text(output: impl Into<String>) -> Self {
        Self { exit_code: 0, output: output.into() }
    }

    /// Pretty-printed JSON report for a successful command.
    pub fn report(command: &str, payload: &serde_json::Value) -> Self {
        match serde_json::to_string_pretty(payload) {
            Ok(output) => Self { exit_code: 0, output },
            Err(error) => Self::failure(command, "serialization", error.to_string(), 1),
        }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: error_class.to_string(),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Bot wired to in-memory collaborators; nothing leaves the process.
pub struct OfflineBot {
    pub bot: Sasha,
    pub delivery: Arc<RecordingDelivery>,
    pub config_source: &'static str,
}

/// Offline commands do not need Slack credentials, so a config that fails
/// validation falls back to defaults instead of aborting.
pub fn offline_bot() -> Result<OfflineBot, CommandTableError> {
    let (config, config_source) = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => (config, "loaded"),
        Err(_) => (AppConfig::default(), "defaults"),
    };

    let delivery = Arc::new(RecordingDelivery::new());
    let collaborators = Collaborators {
        delivery: delivery.clone(),
        images: Arc::new(UnavailableImageSource),
        linguistics: Arc::new(UnconfiguredLinguistics),
    };
    let bot = Sasha::new(BotSettings::from(&config), collaborators)?;
    Ok(OfflineBot { bot, delivery, config_source })
}
