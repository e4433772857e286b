mod bootstrap;
mod health;
mod http;
mod ingress;
mod slack_api;

use anyhow::{Context, Result};
use sasha_core::config::{AppConfig, LoadOptions};
use sasha_slack::commands::Reply;
use sasha_slack::delivery::MessageDelivery;
use tokio::net::TcpListener;

use crate::bootstrap::Application;

fn init_logging(config: &AppConfig) {
    use sasha_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    spawn_http(&app).await?;

    let test_channel = app.config.bot.test_channel.clone();
    let bootup = Reply::Blocks(app.bot.bootup_message());
    announce(&*app.slack, &test_channel, bootup, "bootup").await;
    refresh_directory(&app).await;

    let Application { runner, bot, slack, .. } = app;
    let runner = tokio::spawn(runner.run());

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bot_name = %bot.bot_name(),
        "sasha-server started"
    );
    wait_for_shutdown().await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "sasha-server stopping"
    );

    runner.abort();
    announce(&*slack, &test_channel, Reply::Blocks(bot.shutdown_message()), "shutdown").await;

    Ok(())
}

async fn spawn_http(app: &Application) -> Result<()> {
    let router = health::router(health::HealthState {
        bot_name: app.bot.bot_name().to_owned(),
        directory: app.directory.clone(),
    })
    .merge(ingress::router(ingress::IngressState {
        sender: app.events.clone(),
        signing_secret: app.config.slack.signing_secret.clone(),
    }));

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener =
        TcpListener::bind(&address).await.with_context(|| format!("binding {address}"))?;
    tracing::info!(
        event_name = "system.server.http_listening",
        address = %address,
        signed_requests = app.config.slack.signing_secret.is_some(),
        "http surface listening"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router).await {
            tracing::error!(
                event_name = "system.server.http_failed",
                error = %error,
                "http server stopped"
            );
        }
    });
    Ok(())
}

async fn announce(
    delivery: &dyn MessageDelivery,
    channel_id: &str,
    reply: Reply,
    kind: &'static str,
) {
    match delivery.post_message(channel_id, &reply).await {
        Ok(()) => tracing::info!(
            event_name = "system.server.announced",
            kind,
            channel_id = %channel_id,
            "posted lifecycle notice"
        ),
        Err(error) => tracing::warn!(
            event_name = "system.server.announce_failed",
            kind,
            channel_id = %channel_id,
            error = %error,
            "could not post lifecycle notice"
        ),
    }
}

async fn refresh_directory(app: &Application) {
    let channel_id = &app.config.bot.directory_channel;
    match app.directory.refresh(&*app.slack, channel_id).await {
        Ok(count) => tracing::info!(
            event_name = "system.server.directory_loaded",
            channel_id = %channel_id,
            users = count,
            "user directory loaded"
        ),
        Err(error) => tracing::warn!(
            event_name = "system.server.directory_failed",
            channel_id = %channel_id,
            error = %error,
            "user directory unavailable; continuing without it"
        ),
    }
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
