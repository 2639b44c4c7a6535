mod manage;
mod render;
mod search;
mod upload;

use crate::state::Context;

/// CS Tutor - computer science explanations and videos
#[poise::command(
    slash_command,
    subcommands("search::search", "upload::upload", "manage::clear")
)]
pub async fn tutor(_ctx: Context<'_>) -> Result<(), anyhow::Error> {
    Ok(())
}
