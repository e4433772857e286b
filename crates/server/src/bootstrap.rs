use std::sync::Arc;

use sasha_core::config::{AppConfig, ConfigError, LoadOptions};
use sasha_core::directory::UserDirectory;
use sasha_core::errors::IntegrationError;
use sasha_core::linguistics::{Linguistics, UnconfiguredLinguistics};
use sasha_slack::commands::CommandTableError;
use sasha_slack::events::{sasha_dispatcher, SlackEnvelope};
use sasha_slack::runner::{event_queue, EventRunner};
use sasha_slack::{BotSettings, Collaborators, Sasha};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

use crate::http::{HttpImageSource, HttpLinguistics};
use crate::slack_api::{http_client, SlackWebClient};

const EVENT_QUEUE_CAPACITY: usize = 256;

pub struct Application {
    pub config: AppConfig,
    pub bot: Arc<Sasha>,
    pub directory: Arc<UserDirectory>,
    pub slack: Arc<SlackWebClient>,
    pub runner: EventRunner,
    pub events: mpsc::Sender<SlackEnvelope>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("http client setup failed: {0}")]
    Http(#[source] IntegrationError),
    #[error("command table rejected: {0}")]
    CommandTable(#[from] CommandTableError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        log_name = %config.bot.log_name,
        debug = config.bot.debug,
        "starting application bootstrap"
    );

    let client =
        http_client(config.integrations.request_timeout_secs).map_err(BootstrapError::Http)?;
    let slack = Arc::new(SlackWebClient::new(client.clone(), &config));

    let linguistics: Arc<dyn Linguistics> = match &config.integrations.linguistics_base_url {
        Some(base_url) => Arc::new(HttpLinguistics::new(client.clone(), base_url.as_str())),
        None => Arc::new(UnconfiguredLinguistics),
    };
    let collaborators = Collaborators {
        delivery: slack.clone(),
        images: Arc::new(HttpImageSource::new(client)),
        linguistics,
    };

    let bot = Arc::new(Sasha::new(BotSettings::from(&config), collaborators)?);
    info!(
        event_name = "system.bootstrap.bot_ready",
        correlation_id = "bootstrap",
        bot_name = %bot.bot_name(),
        linguistics = config.integrations.linguistics_base_url.is_some(),
        "bot assembled"
    );

    let (events, runner) = event_queue(EVENT_QUEUE_CAPACITY, sasha_dispatcher(bot.clone()));

    Ok(Application {
        config,
        bot,
        directory: Arc::new(UserDirectory::new()),
        slack,
        runner,
        events,
    })
}
