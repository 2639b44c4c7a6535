use poise::serenity_prelude as serenity;
use tracing::{error, info};

use super::render::DiscordSurface;
use super::upload::load_pdf;
use crate::router::Outcome;
use crate::state::Context;

const DEFAULT_QUERY: &str = "Explain Dijkstra's algorithm";

/// Ask a computer science question or request a video
#[poise::command(slash_command)]
pub async fn search(
    ctx: Context<'_>,
    #[description = "Your question (mention \"video\" to get videos)"] query: Option<String>,
    #[description = "PDF notes or textbook to answer from"] document: Option<serenity::Attachment>,
) -> Result<(), anyhow::Error> {
    ctx.defer().await?;
    let handle = ctx.say("Thinking...").await?;
    let mut surface = DiscordSurface::new(ctx, handle);

    let user_id = ctx.author().id.get();
    let query = query
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .unwrap_or_else(|| DEFAULT_QUERY.to_string());

    if let Some(document) = &document {
        match load_pdf(document).await {
            Ok(excerpt) => {
                ctx.data().contexts.replace(user_id, excerpt).await;
            }
            Err(e) => {
                error!(user = ctx.author().name, filename = %document.filename, error = %e, "Upload failed");
                surface.show_error(&e).await?;
                return Ok(());
            }
        }
    }

    let excerpt = ctx.data().contexts.current(user_id).await;
    info!(
        user = ctx.author().name,
        query,
        context = %excerpt.source,
        "Search started"
    );

    match ctx
        .data()
        .router
        .route(&query, &excerpt.text, &mut surface)
        .await
    {
        Ok(Outcome::Videos(videos)) => {
            info!(count = videos.len(), "Videos sent");
        }
        Ok(Outcome::Answer { text, completed }) => {
            info!(answer_len = text.len(), completed, "Answer sent");
        }
        Err(e) => {
            error!(user = ctx.author().name, query, error = %e, "Search failed");
            surface.show_error(&e).await?;
        }
    }

    Ok(())
}
