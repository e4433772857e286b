use std::sync::Arc;

use sasha_core::config::{AppConfig, LoadOptions};
use sasha_core::linguistics::UnconfiguredLinguistics;
use sasha_slack::delivery::{NoopDelivery, UnavailableImageSource};
use sasha_slack::{BotSettings, Collaborators, Sasha};
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_slack_tokens(&config));
            checks.push(check_command_table(&config));
            checks.push(check_linguistics(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["slack_token_readiness", "command_table", "linguistics_service"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let any_failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if any_failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if any_failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_slack_tokens(config: &AppConfig) -> DoctorCheck {
    let user_token = if config.slack.user_token.is_some() {
        "user token set, directory reads use it"
    } else {
        "no user token, directory reads fall back to the bot token"
    };
    let signing = if config.slack.signing_secret.is_some() {
        "request signatures verified"
    } else {
        "request signatures NOT verified"
    };

    DoctorCheck {
        name: "slack_token_readiness",
        status: CheckStatus::Pass,
        details: format!("bot token shape ok; {user_token}; {signing}"),
    }
}

fn check_command_table(config: &AppConfig) -> DoctorCheck {
    let collaborators = Collaborators {
        delivery: Arc::new(NoopDelivery),
        images: Arc::new(UnavailableImageSource),
        linguistics: Arc::new(UnconfiguredLinguistics),
    };

    match Sasha::new(BotSettings::from(config), collaborators) {
        Ok(bot) => DoctorCheck {
            name: "command_table",
            status: CheckStatus::Pass,
            details: format!("{} assembled {} commands", bot.bot_name(), bot.table().len()),
        },
        Err(error) => DoctorCheck {
            name: "command_table",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_linguistics(config: &AppConfig) -> DoctorCheck {
    match &config.integrations.linguistics_base_url {
        Some(base_url) => DoctorCheck {
            name: "linguistics_service",
            status: CheckStatus::Pass,
            details: format!("lookups routed to `{base_url}`"),
        },
        None => DoctorCheck {
            name: "linguistics_service",
            status: CheckStatus::Skipped,
            details: "no base url configured; lookup commands answer with a notice".to_string(),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
