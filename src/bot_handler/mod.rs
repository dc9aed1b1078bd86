pub mod commands;

use std::sync::Arc;

use teloxide::{types::ChatId, utils::command::{BotCommands, ParseError}};
use thiserror::Error;

use crate::{
    bot_handler::commands::CommandContext,
    github::{GithubClient, GithubError},
    messaging::{MessagingError, MessagingService},
    poller::DeploymentPoller,
    vercel::{VercelClient, VercelError},
};

/// Errors a command handler can run into.
#[derive(Debug, Error)]
pub enum BotHandlerError {
    /// GitHub call failed.
    #[error("GitHub error: {0}")]
    Github(#[from] GithubError),
    /// Vercel call failed.
    #[error("Vercel error: {0}")]
    Vercel(#[from] VercelError),
    /// The reply itself could not be sent.
    #[error("Failed to send message: {0}")]
    Messaging(#[from] MessagingError),
}

/// Chat commands understood by the relay.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "snake_case", description = "Available commands:")]
pub enum Command {
    /// Liveness check.
    #[command(description = "check that the bot is alive.")]
    Hello,
    /// Merge a pull request.
    #[command(parse_with = single_optional_arg, description = "merge a pull request by number or branch name.")]
    Pull(String),
    /// Show the latest deployment.
    #[command(description = "show the latest deployment.")]
    Deployment,
    /// Start the periodic deployment monitor.
    #[command(description = "start the periodic deployment monitor.")]
    StartMonitor,
    /// Stop the periodic deployment monitor.
    #[command(description = "stop the periodic deployment monitor.")]
    StopMonitor,
}

// The default parser rejects a missing argument outright; the handler
// wants to answer with a usage hint instead, so an empty ref is allowed
// through here.
fn single_optional_arg(input: String) -> Result<(String,), ParseError> {
    Ok((input.trim().to_string(),))
}

/// Routes chat commands to their handlers and turns handler failures into
/// user-visible error replies.
pub struct BotHandler {
    messaging_service: Arc<dyn MessagingService>,
    github_client: Arc<dyn GithubClient>,
    vercel_client: Arc<dyn VercelClient>,
    poller: DeploymentPoller,
}

impl BotHandler {
    /// Creates a new `BotHandler` instance.
    pub fn new(
        messaging_service: Arc<dyn MessagingService>,
        github_client: Arc<dyn GithubClient>,
        vercel_client: Arc<dyn VercelClient>,
        poller: DeploymentPoller,
    ) -> Self {
        Self { messaging_service, github_client, vercel_client, poller }
    }

    /// Dispatches the incoming command to the appropriate handler.
    ///
    /// A failing handler never takes the dispatcher down: everything but a
    /// messaging failure is reported back to the chat as an error reply.
    pub async fn handle_command(
        &self,
        chat_id: ChatId,
        command: Command,
    ) -> Result<(), BotHandlerError> {
        let ctx = CommandContext { handler: self, chat_id };

        let result = match command {
            Command::Hello => commands::hello::handle(ctx).await,
            Command::Pull(pr_ref) => commands::pull::handle(ctx, pr_ref.trim()).await,
            Command::Deployment => commands::deployment::handle(ctx).await,
            Command::StartMonitor => commands::monitor::handle_start(ctx).await,
            Command::StopMonitor => commands::monitor::handle_stop(ctx).await,
        };

        match result {
            Err(error) if !matches!(error, BotHandlerError::Messaging(_)) => {
                tracing::warn!("command failed: {error}");
                self.messaging_service.send_error_msg(chat_id, &error).await?;
                Ok(())
            }
            other => other,
        }
    }
}
