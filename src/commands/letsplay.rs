use serenity::all::{
    CommandInteraction, CommandOptionType, Context, CreateCommand, CreateCommandOption, Message,
};
use serenity::model::prelude::{ChannelId, GuildId};
use tokio::time::Duration;

use humantime::format_duration;

use crate::channel_info::ChannelInfo;
use crate::lifecycle::{LifecycleHandle, LifecycleManager};
use crate::platform::{Platform, PlatformError};
use crate::utils::{interaction_reply, interaction_reply_ephemeral, react, FAILURE_REACTION, SUCCESS_REACTION};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LetsPlayRequest {
    pub guild_id: GuildId,
    /// Channel the command was sent from.
    pub channel_id: ChannelId,
    pub requester: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    EmptyName,
    Unmanaged,
    WrongChannel { command_channel_id: ChannelId },
}

#[derive(Debug)]
pub enum LetsPlayOutcome {
    Created { channel: ChannelInfo, window: Duration },
    Ignored(IgnoreReason),
    Failed(PlatformError),
}

/// Extracts the requested channel name from `<prefix>letsplay <name>`.
pub fn parse_message<'a>(content: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = content.strip_prefix(prefix)?.strip_prefix("letsplay")?;
    if !rest.starts_with(char::is_whitespace) || rest.contains('\n') {
        return None;
    }
    Some(rest.trim())
}

impl<P: Platform> LifecycleManager<P> {
    /// Creates a voice channel in the managed category and gives it the first-join
    /// window before it is reclaimed.
    pub async fn on_lets_play(&mut self, request: LetsPlayRequest) -> LetsPlayOutcome {
        let name = request.name.trim();
        if name.is_empty() {
            return LetsPlayOutcome::Ignored(IgnoreReason::EmptyName);
        }
        let Some(state) = self.registry.get(request.guild_id) else {
            return LetsPlayOutcome::Ignored(IgnoreReason::Unmanaged);
        };
        if request.channel_id != state.command_channel_id {
            return LetsPlayOutcome::Ignored(IgnoreReason::WrongChannel {
                command_channel_id: state.command_channel_id,
            });
        }
        let category_id = state.category_id;

        let reason = format!("Requested by {}", request.requester);
        match self
            .platform
            .create_voice_channel(request.guild_id, name, category_id, &reason)
            .await
        {
            Ok(channel) => {
                let window = self.config.first_join_window();
                info!(guild_id = %request.guild_id, channel_id = %channel.id, channel = %channel.name, requester = %request.requester, "created voice channel");
                self.schedule_cleanup(&channel, window);
                LetsPlayOutcome::Created { channel, window }
            }
            Err(why) => {
                error!(guild_id = %request.guild_id, channel = %name, error = %why, "failed to create voice channel");
                LetsPlayOutcome::Failed(why)
            }
        }
    }
}

pub async fn run_message(
    ctx: &Context,
    msg: &Message,
    prefix: &str,
    lifecycle: &LifecycleHandle,
) -> Result<(), anyhow::Error> {
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };
    let content = msg.content_safe(&ctx.cache);
    let Some(name) = parse_message(&content, prefix) else {
        return Ok(());
    };

    let request = LetsPlayRequest {
        guild_id,
        channel_id: msg.channel_id,
        requester: msg.author.name.clone(),
        name: name.to_string(),
    };
    match lifecycle.lets_play(request).await {
        Some(LetsPlayOutcome::Created { .. }) => react(ctx, msg, SUCCESS_REACTION).await,
        Some(LetsPlayOutcome::Failed(_)) => react(ctx, msg, FAILURE_REACTION).await,
        Some(LetsPlayOutcome::Ignored(reason)) => {
            trace!(reason = ?reason, "ignoring letsplay message");
            Ok(())
        }
        None => Ok(()),
    }
}

pub async fn run(
    command: &CommandInteraction,
    ctx: Context,
    lifecycle: &LifecycleHandle,
) -> Result<(), anyhow::Error> {
    let Some(guild_id) = command.guild_id else {
        return interaction_reply(command, &ctx, ":warning: Direct messages are not currently supported").await;
    };
    let name = command
        .data
        .options
        .iter()
        .find(|option| option.name == "name")
        .and_then(|option| option.value.as_str())
        .unwrap_or_default();

    let request = LetsPlayRequest {
        guild_id,
        channel_id: command.channel_id,
        requester: command.user.name.clone(),
        name: name.to_string(),
    };
    let reply = match lifecycle.lets_play(request).await {
        Some(LetsPlayOutcome::Created { channel, window }) => format!(
            ":white_check_mark: Created <#{}>. It will be removed if nobody joins within {}.",
            channel.id,
            format_duration(window)
        ),
        Some(LetsPlayOutcome::Ignored(IgnoreReason::EmptyName)) => {
            ":warning: Please give the channel a name".to_string()
        }
        Some(LetsPlayOutcome::Ignored(IgnoreReason::Unmanaged)) => {
            ":warning: This server has no self-serve voice category set up".to_string()
        }
        Some(LetsPlayOutcome::Ignored(IgnoreReason::WrongChannel { command_channel_id })) => {
            format!(":information_source: Please request channels in <#{command_channel_id}>")
        }
        Some(LetsPlayOutcome::Failed(why)) => format!(":x: Could not create the channel:\n```\n{why}\n```"),
        None => ":x: The bot is shutting down, please try again later".to_string(),
    };
    interaction_reply_ephemeral(command, &ctx, reply).await
}

pub fn register() -> CreateCommand {
    CreateCommand::new("letsplay")
        .description("Create a temporary voice channel")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "name", "Name of the voice channel")
                .required(true)
                .max_length(100),
        )
}
