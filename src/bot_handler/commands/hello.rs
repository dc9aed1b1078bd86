use crate::bot_handler::{BotHandlerError, commands::CommandContext};

pub async fn handle(ctx: CommandContext<'_>) -> Result<(), BotHandlerError> {
    ctx.handler.messaging_service.send_hello_msg(ctx.chat_id).await?;
    Ok(())
}
