#![warn(missing_docs)]
//! A Telegram ↔ Vercel notification relay bot.
//!
//! Receives Telegram bot commands and Vercel deployment webhooks and
//! relays formatted status messages between the two services, with an
//! optional GitHub pull-request merge action triggered from chat. All
//! command and notification work runs on a single task loop owned by a
//! dedicated worker thread; the webhook handlers reach it through the
//! thread-safe bridge.

/// The main handler for the bot's commands.
pub mod bot_handler;
/// The thread-safe submission boundary onto the task loop.
pub mod bridge;
/// The configuration for the application.
pub mod config;
/// Deployment records and the tolerant webhook decoder.
pub mod deployment;
/// The client for the GitHub REST API.
pub mod github;
/// The service for sending messages to Telegram.
pub mod messaging;
/// The periodic deployment poller and its job registry.
pub mod poller;
/// The process-wide relay context and its webhook entry points.
pub mod relay;
/// The webhook HTTP server.
pub mod server;
/// Deduplication of deployment notifications.
pub mod tracker;
/// The client for the Vercel REST API.
pub mod vercel;

use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};

use teloxide::{Bot, prelude::Requester};
use url::Url;

use crate::{
    bot_handler::BotHandler,
    bridge::TaskLoopBridge,
    config::Config,
    messaging::TelegramMessagingService,
    poller::{CHECK_DEPLOYMENT_JOB, DeploymentPoller},
    relay::Relay,
    tracker::DeploymentTracker,
};

/// Runs the bot.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    let bot = Bot::new(config.telegram_bot_token.clone());
    let github_client = Arc::new(github::DefaultGithubClient::new(
        &config.github_token,
        &config.github_api_url,
        &config.github_repo,
    )?);
    let vercel_client = Arc::new(vercel::DefaultVercelClient::new(
        &config.vercel_token,
        &config.vercel_api_url,
        config.vercel_project_id.clone(),
        config.vercel_team_id.clone(),
    )?);
    let messaging_service = Arc::new(TelegramMessagingService::new(bot.clone()));
    let tracker = Arc::new(DeploymentTracker::new(
        config.notify_policy,
        Duration::from_secs(config.notified_retention_hours * 3600),
    ));

    let bridge = Arc::new(TaskLoopBridge::new(Duration::from_secs(config.stop_timeout_secs)));
    bridge.start()?;

    let poller = DeploymentPoller::new(
        vercel_client.clone(),
        tracker.clone(),
        messaging_service.clone(),
        config.telegram_chat_id,
        config.poll_interval,
        config.poll_page_size,
    );
    let handler = Arc::new(BotHandler::new(
        messaging_service.clone(),
        github_client,
        vercel_client,
        poller.clone(),
    ));
    let relay = Arc::new(Relay::new(
        bridge.clone(),
        handler,
        tracker,
        messaging_service,
        config.telegram_chat_id,
        config.bot_name.clone(),
    ));

    // Tell Telegram where to deliver updates.
    let webhook_url = Url::parse(&format!(
        "{}/webhook/{}",
        config.webhook_host.trim_end_matches('/'),
        config.webhook_secret
    ))?;
    bot.set_webhook(webhook_url).await?;
    tracing::debug!("Telegram webhook registered");

    // The monitor's repeating task has to live on the task loop next to
    // every other job, so starting it goes through the bridge.
    {
        let bridge = bridge.clone();
        let poller = poller.clone();
        let status = tokio::task::spawn_blocking(move || {
            bridge.submit(async move {
                Ok::<_, Infallible>(poller.start(CHECK_DEPLOYMENT_JOB).await)
            })
        })
        .await??;
        tracing::info!("deployment monitor {status:?}");
    }

    let app = server::router(relay, &config.webhook_secret);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {addr}");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    // Drain in dependency order: stop producing ticks, then stop the loop.
    poller.stop_all().await;
    let stopping = bridge.clone();
    if !tokio::task::spawn_blocking(move || stopping.stop()).await? {
        tracing::warn!("task loop worker had to be abandoned during shutdown");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
    }
}
