use tracing::info;

use crate::state::Context;

/// Forget the document uploaded for your questions
#[poise::command(slash_command)]
pub async fn clear(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let user_id = ctx.author().id.get();
    match ctx.data().contexts.clear(user_id).await {
        Some(excerpt) => {
            info!(user = ctx.author().name, source = %excerpt.source, "Context cleared");
            ctx.say(format!(
                "Forgot **{}**. Questions are no longer grounded in it.",
                excerpt.source
            ))
            .await?;
        }
        None => {
            ctx.say("No document loaded.").await?;
        }
    }
    Ok(())
}
