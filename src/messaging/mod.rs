/// Pure text formatting for outbound messages.
pub mod format;
#[cfg(test)]
mod tests;

use async_trait::async_trait;
use mockall::automock;
use teloxide::{
    Bot,
    prelude::*,
    types::{ChatId, ParseMode},
    utils::html,
};
use thiserror::Error;

use crate::{bot_handler::BotHandlerError, deployment::DeploymentRecord, poller::MonitorStatus};

/// Errors from sending messages to Telegram.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// The Telegram Bot API rejected or failed the request.
    #[error("Telegram API request failed: {0}")]
    TeloxideRequest(#[from] teloxide::RequestError),
}

type Result<T> = std::result::Result<T, MessagingError>;

/// Trait for sending messages to the user.
#[automock]
#[async_trait]
pub trait MessagingService: Send + Sync {
    /// Liveness reply including the caller's chat identity.
    async fn send_hello_msg(&self, chat_id: ChatId) -> Result<()>;

    /// Formatted deployment status message.
    async fn send_deployment_msg(&self, chat_id: ChatId, record: &DeploymentRecord) -> Result<()>;

    /// Reply when no deployment data is available.
    async fn send_no_deployment_msg(&self, chat_id: ChatId) -> Result<()>;

    /// Usage prompt for the pull command.
    async fn send_pull_usage_msg(&self, chat_id: ChatId) -> Result<()>;

    /// Reply when the referenced PR does not exist.
    async fn send_pr_not_found_msg(&self, chat_id: ChatId, pr_ref: &str) -> Result<()>;

    /// Reply after a successful merge.
    async fn send_pr_merged_msg(&self, chat_id: ChatId, pr_ref: &str) -> Result<()>;

    /// Reply when GitHub declined the merge.
    async fn send_merge_failed_msg(
        &self,
        chat_id: ChatId,
        pr_ref: &str,
        reason: &str,
    ) -> Result<()>;

    /// Reply after starting (or restarting) the deployment monitor.
    async fn send_monitor_started_msg(&self, chat_id: ChatId, status: MonitorStatus) -> Result<()>;

    /// Reply after a stop-monitor request.
    async fn send_monitor_stopped_msg(&self, chat_id: ChatId, was_running: bool) -> Result<()>;

    /// Generic error reply for a failed command.
    async fn send_error_msg(&self, chat_id: ChatId, error: &BotHandlerError) -> Result<()>;
}

/// Telegram messaging service.
pub struct TelegramMessagingService {
    bot: Bot,
}

impl TelegramMessagingService {
    /// Wraps a teloxide bot.
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    async fn send_html(&self, chat_id: ChatId, text: String) -> Result<()> {
        self.bot.send_message(chat_id, text).parse_mode(ParseMode::Html).await?;
        Ok(())
    }
}

#[async_trait]
impl MessagingService for TelegramMessagingService {
    async fn send_hello_msg(&self, chat_id: ChatId) -> Result<()> {
        self.send_html(chat_id, format!("👋 Hello, {chat_id}! The bot is up and running."))
            .await
    }

    async fn send_deployment_msg(&self, chat_id: ChatId, record: &DeploymentRecord) -> Result<()> {
        self.send_html(chat_id, format::deployment_message(record)).await
    }

    async fn send_no_deployment_msg(&self, chat_id: ChatId) -> Result<()> {
        self.send_html(chat_id, "No deployment data found.".to_string()).await
    }

    async fn send_pull_usage_msg(&self, chat_id: ChatId) -> Result<()> {
        self.send_html(chat_id, "Please provide a PR number or branch name.".to_string()).await
    }

    async fn send_pr_not_found_msg(&self, chat_id: ChatId, pr_ref: &str) -> Result<()> {
        self.send_html(chat_id, format!("❌ PR #{} not found.", html::escape(pr_ref))).await
    }

    async fn send_pr_merged_msg(&self, chat_id: ChatId, pr_ref: &str) -> Result<()> {
        self.send_html(chat_id, format!("✅ PR #{} has been merged!", html::escape(pr_ref))).await
    }

    async fn send_merge_failed_msg(
        &self,
        chat_id: ChatId,
        pr_ref: &str,
        reason: &str,
    ) -> Result<()> {
        self.send_html(
            chat_id,
            format!(
                "❌ Failed to merge PR #{}. Error: {}",
                html::escape(pr_ref),
                html::escape(reason)
            ),
        )
        .await
    }

    async fn send_monitor_started_msg(&self, chat_id: ChatId, status: MonitorStatus) -> Result<()> {
        let text = match status {
            MonitorStatus::Started => "▶️ Deployment monitor started.",
            MonitorStatus::Restarted => "🔄 Deployment monitor restarted.",
        };
        self.send_html(chat_id, text.to_string()).await
    }

    async fn send_monitor_stopped_msg(&self, chat_id: ChatId, was_running: bool) -> Result<()> {
        let text = if was_running {
            "⏹ Deployment monitor stopped."
        } else {
            "Deployment monitor is not running."
        };
        self.send_html(chat_id, text.to_string()).await
    }

    async fn send_error_msg(&self, chat_id: ChatId, error: &BotHandlerError) -> Result<()> {
        self.send_html(chat_id, format!("❌ Something went wrong: {}", html::escape(&error.to_string())))
            .await
    }
}
