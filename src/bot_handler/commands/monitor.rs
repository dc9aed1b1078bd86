use crate::{
    bot_handler::{BotHandlerError, commands::CommandContext},
    poller::CHECK_DEPLOYMENT_JOB,
};

pub async fn handle_start(ctx: CommandContext<'_>) -> Result<(), BotHandlerError> {
    let status = ctx.handler.poller.start(CHECK_DEPLOYMENT_JOB).await;
    ctx.handler.messaging_service.send_monitor_started_msg(ctx.chat_id, status).await?;
    Ok(())
}

pub async fn handle_stop(ctx: CommandContext<'_>) -> Result<(), BotHandlerError> {
    let was_running = ctx.handler.poller.stop(CHECK_DEPLOYMENT_JOB).await;
    ctx.handler.messaging_service.send_monitor_stopped_msg(ctx.chat_id, was_running).await?;
    Ok(())
}
