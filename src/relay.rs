use std::sync::Arc;

use serde_json::Value;
use teloxide::{
    types::{ChatId, Update, UpdateKind},
    utils::command::BotCommands,
};
use thiserror::Error;

use crate::{
    bot_handler::{BotHandler, Command},
    bridge::{BridgeError, TaskLoopBridge},
    deployment::{DeploymentRecord, PayloadError},
    messaging::MessagingService,
    tracker::DeploymentTracker,
};

/// Errors surfaced to the webhook HTTP layer.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The request body was not a Telegram update.
    #[error("malformed Telegram update: {0}")]
    MalformedUpdate(#[from] serde_json::Error),
    /// The request body matched no known deployment payload shape.
    #[error("malformed deployment payload: {0}")]
    MalformedPayload(#[from] PayloadError),
    /// The task loop rejected or failed the job.
    #[error("task loop error: {0}")]
    Bridge(#[from] BridgeError),
}

/// Process-wide context tying the webhook entry points to the task loop.
///
/// Constructed once at startup and shared with the HTTP layer; both entry
/// points are synchronous and block the calling thread until the job has
/// run on the loop.
pub struct Relay {
    bridge: Arc<TaskLoopBridge>,
    handler: Arc<BotHandler>,
    tracker: Arc<DeploymentTracker>,
    messaging_service: Arc<dyn MessagingService>,
    notify_chat_id: Option<ChatId>,
    bot_name: String,
}

impl Relay {
    /// Wires the relay together.
    pub fn new(
        bridge: Arc<TaskLoopBridge>,
        handler: Arc<BotHandler>,
        tracker: Arc<DeploymentTracker>,
        messaging_service: Arc<dyn MessagingService>,
        notify_chat_id: Option<ChatId>,
        bot_name: String,
    ) -> Self {
        Self { bridge, handler, tracker, messaging_service, notify_chat_id, bot_name }
    }

    /// Entry point for `POST /webhook/{secret}`.
    ///
    /// Parses the update, extracts a command and hands it to the dispatcher
    /// on the task loop. Non-command updates and unknown commands are
    /// acknowledged and ignored.
    pub fn handle_telegram_update(&self, payload: Value) -> Result<(), RelayError> {
        let update: Update = serde_json::from_value(payload)?;

        let Some((chat_id, text)) = command_text(&update) else {
            tracing::debug!("ignoring non-text update {}", update.id.0);
            return Ok(());
        };

        let command = match Command::parse(&text, self.bot_name.as_str()) {
            Ok(command) => command,
            Err(_) => {
                tracing::debug!("ignoring unrecognized command: {text}");
                return Ok(());
            }
        };

        tracing::debug!("dispatching {command:?} for chat {chat_id}");
        let handler = Arc::clone(&self.handler);
        self.bridge.submit(async move { handler.handle_command(chat_id, command).await })?;
        Ok(())
    }

    /// Entry point for `POST /webhook/vercel`.
    ///
    /// Decodes the deployment event and, when the tracker claims it, sends
    /// the notification from the task loop.
    pub fn handle_deployment_event(&self, payload: Value) -> Result<(), RelayError> {
        let record = DeploymentRecord::from_webhook(&payload)?;

        let Some(chat_id) = self.notify_chat_id else {
            tracing::error!(
                "TELEGRAM_CHAT_ID is not configured; dropping notification for deployment {}",
                record.id
            );
            return Ok(());
        };

        let tracker = Arc::clone(&self.tracker);
        let messaging_service = Arc::clone(&self.messaging_service);
        self.bridge.submit(async move {
            if !tracker.claim(&record) {
                tracing::debug!("deployment {} already notified or filtered; skipping", record.id);
                return Ok(());
            }
            messaging_service.send_deployment_msg(chat_id, &record).await
        })?;
        Ok(())
    }
}

/// Chat id and text of a plain message update, when it carries one.
fn command_text(update: &Update) -> Option<(ChatId, String)> {
    match &update.kind {
        UpdateKind::Message(message) => {
            message.text().map(|text| (message.chat.id, text.to_string()))
        }
        _ => None,
    }
}
