mod commands;
mod config;
mod docs;
mod error;
mod llm;
mod router;
mod state;
#[cfg(test)]
mod testutil;
mod video;

use std::sync::Arc;

use poise::serenity_prelude as serenity;
use poise::{Framework, FrameworkOptions};
use tracing::{error, info, Level};

use config::Config;
use docs::ContextStore;
use llm::LlmClient;
use router::QueryRouter;
use state::AppState;
use video::VideoClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .init();

    // Missing credentials stop startup before anything is served
    let config = Config::from_env()?;
    info!(
        model = %config.llm_model,
        stream = config.llm_stream,
        "Configuration loaded"
    );

    let llm_client = Arc::new(LlmClient::new(&config)?);
    let video_client = Arc::new(VideoClient::new(&config)?);
    info!("API clients initialized");

    let router = Arc::new(
        QueryRouter::new(video_client, llm_client).with_classifier(router::keyword_classifier),
    );

    let app_state = AppState {
        router,
        contexts: Arc::new(ContextStore::new()),
    };

    let guild_id = config.guild_id.map(serenity::GuildId::new);
    let intents = serenity::GatewayIntents::GUILDS;

    let framework = Framework::builder()
        .options(FrameworkOptions {
            commands: vec![commands::tutor()],
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Bot connected as: {} ({})", ready.user.name, ready.user.id);

                let commands = &framework.options().commands;
                for cmd in commands {
                    for sub in &cmd.subcommands {
                        info!("  /{} {}", cmd.name, sub.name);
                    }
                }

                if let Some(gid) = guild_id {
                    info!("Registering to guild {} (instant)", gid);
                    poise::builtins::register_in_guild(ctx, commands, gid).await?;
                } else {
                    info!("Registering globally (up to 1 hour delay)");
                    poise::builtins::register_globally(ctx, commands).await?;
                }

                Ok(app_state)
            })
        })
        .build();

    info!("Starting CS Tutor bot...");

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create client: {}", e))?;

    if let Err(e) = client.start().await {
        error!("Client error: {}", e);
    }

    Ok(())
}
