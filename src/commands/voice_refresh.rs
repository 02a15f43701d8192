use serenity::all::{CommandInteraction, Context, CreateCommand, Permissions};

use crate::discord::cached_guild;
use crate::lifecycle::LifecycleHandle;
use crate::utils::{interaction_reply, interaction_reply_ephemeral};

pub async fn run(
    command: &CommandInteraction,
    ctx: Context,
    lifecycle: &LifecycleHandle,
) -> Result<(), anyhow::Error> {
    let Some(guild_id) = command.guild_id else {
        return interaction_reply(command, &ctx, ":warning: Direct messages are not currently supported").await;
    };
    let Some(guild) = cached_guild(&ctx.cache, guild_id) else {
        return interaction_reply_ephemeral(command, &ctx, ":x: This server is not available right now").await;
    };
    let guild_name = guild.name.clone();

    let reply = match lifecycle.refresh(guild).await {
        Some(true) => ":white_check_mark: Self-serve voice channels are set up for this server".to_string(),
        Some(false) => format!(
            ":warning: Could not find the self-serve voice category or its command channel in **{guild_name}**, check the bot logs for details"
        ),
        None => ":x: The bot is shutting down, please try again later".to_string(),
    };
    interaction_reply_ephemeral(command, &ctx, reply).await
}

pub fn register() -> CreateCommand {
    CreateCommand::new("voice_refresh")
        .description("Re-scan this server for the self-serve voice category and command channel")
        .default_member_permissions(Permissions::MANAGE_CHANNELS)
}
