use crate::bot_handler::{BotHandlerError, commands::CommandContext};

/// Replies with the latest deployment, fetched on demand.
pub async fn handle(ctx: CommandContext<'_>) -> Result<(), BotHandlerError> {
    let deployments = ctx.handler.vercel_client.recent_deployments(1).await?;

    match deployments.into_iter().next() {
        Some(record) => {
            ctx.handler.messaging_service.send_deployment_msg(ctx.chat_id, &record).await?
        }
        None => ctx.handler.messaging_service.send_no_deployment_msg(ctx.chat_id).await?,
    }
    Ok(())
}
