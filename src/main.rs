use serenity::model::prelude::*;
use serenity::prelude::*;

use dotenvy::dotenv;
use std::env;
use std::sync::Arc;
use tracing::{error, info};

use voice_bot::config::{discord_token, Config};
use voice_bot::discord::DiscordPlatform;
use voice_bot::handler::Handler;
use voice_bot::lifecycle::LifecycleHandle;
use voice_bot::spawn_lifecycle;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_default(),
        ))
        .init();

    let config = Config::from_env()?;
    info!(config = ?config, "loaded self-serve voice config");
    let token = discord_token()?;

    let (events, receiver) = async_channel::unbounded();
    let lifecycle = LifecycleHandle::new(events.clone());

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;
    let mut client = Client::builder(token, intents)
        .event_handler(Handler::new(lifecycle.clone(), config.command_prefix.clone()))
        .await?;

    let platform = Arc::new(DiscordPlatform::new(client.cache.clone(), client.http.clone()));
    let manager = spawn_lifecycle(config, platform, events, receiver);

    let shard_manager = client.shard_manager.clone();
    let signal_lifecycle = lifecycle.clone();
    tokio::spawn(async move {
        if let Err(why) = tokio::signal::ctrl_c().await {
            error!(error = %why, "Could not register ctrl+c handler");
            return;
        }
        info!("Shutting down, cancelling pending channel cleanups");
        signal_lifecycle.shutdown().await;
        shard_manager.shutdown_all().await;
    });

    // start listening for events by starting a single shard
    if let Err(why) = client.start().await {
        error!(error = %why, "An error occurred while running the client");
    }
    if !lifecycle.is_closed() {
        lifecycle.shutdown().await;
    }
    manager.await?;
    Ok(())
}
