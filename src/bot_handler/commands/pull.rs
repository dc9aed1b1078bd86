use crate::{
    bot_handler::{BotHandlerError, commands::CommandContext},
    github::MergeOutcome,
};

/// Looks up the referenced PR and, when it exists, asks GitHub to merge it.
pub async fn handle(ctx: CommandContext<'_>, pr_ref: &str) -> Result<(), BotHandlerError> {
    if pr_ref.is_empty() {
        ctx.handler.messaging_service.send_pull_usage_msg(ctx.chat_id).await?;
        return Ok(());
    }

    let Some(pull) = ctx.handler.github_client.get_pull(pr_ref).await? else {
        ctx.handler.messaging_service.send_pr_not_found_msg(ctx.chat_id, pr_ref).await?;
        return Ok(());
    };

    tracing::debug!("merging PR #{} ({})", pull.number, pull.title);
    match ctx.handler.github_client.merge_pull(pr_ref).await? {
        MergeOutcome::Merged => {
            ctx.handler.messaging_service.send_pr_merged_msg(ctx.chat_id, pr_ref).await?
        }
        MergeOutcome::Rejected { message } => {
            ctx.handler
                .messaging_service
                .send_merge_failed_msg(ctx.chat_id, pr_ref, &message)
                .await?
        }
    }
    Ok(())
}
