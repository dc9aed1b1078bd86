pub mod deployment;
pub mod hello;
pub mod monitor;
pub mod pull;

use teloxide::types::ChatId;

use crate::bot_handler::BotHandler;

/// CommandContext groups the data needed by all command handlers.
pub struct CommandContext<'a> {
    /// The handler owning the service clients.
    pub handler: &'a BotHandler,
    /// Chat the command came from; replies go back there.
    pub chat_id: ChatId,
}
