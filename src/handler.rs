use serenity::async_trait;
use serenity::model::channel::Message;

use serenity::model::prelude::*;
use serenity::prelude::*;

use tracing::Instrument;
use tracing::Level;

use crate::commands;
use crate::discord::{cached_channel, channel_info, guild_info};
use crate::lifecycle::{LifecycleHandle, VoiceMembershipChange};
use crate::utils::interaction_reply_ephemeral;

/// Permissions requested by the invite link: manage channels, add reactions, move members.
const INVITE_PERMISSIONS: u64 = 16780304;

fn validate_msg(msg: &Message) -> bool {
    !msg.author.bot && msg.guild_id.is_some()
}

pub struct Handler {
    lifecycle: LifecycleHandle,
    command_prefix: String,
}

impl Handler {
    pub fn new(lifecycle: LifecycleHandle, command_prefix: impl Into<String>) -> Self {
        Self {
            lifecycle,
            command_prefix: command_prefix.into(),
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        if !validate_msg(&msg) || !msg.content.starts_with(&self.command_prefix) {
            return;
        }

        let span = span!(
            Level::DEBUG,
            "message_command",
            guild_id = ?msg.guild_id,
            channel_id = %msg.channel_id,
            user = %msg.author.name
        );
        async {
            if let Err(why) =
                commands::letsplay::run_message(&ctx, &msg, &self.command_prefix, &self.lifecycle).await
            {
                warn!(error = %why, "Cannot acknowledge text command");
            }
        }
        .instrument(span)
        .await;
    }

    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, guilds = ready.guilds.len(), "Bot is connected!");
        info!(
            "Invite the bot with https://discord.com/oauth2/authorize?client_id={}&scope=bot%20applications.commands&permissions={}",
            ready.application.id, INVITE_PERMISSIONS
        );
    }

    async fn guild_create(&self, ctx: Context, guild: Guild, _is_new: Option<bool>) {
        let commands = guild.id.set_commands(&ctx.http, commands::register_all()).await;
        if let Err(why) = commands {
            error!(error = %why, guild_id = %guild.id, "Failed to register commands.");
        }

        self.lifecycle.guild_available(guild_info(&guild)).await;
    }

    async fn guild_delete(&self, _ctx: Context, incomplete: UnavailableGuild, _full: Option<Guild>) {
        if incomplete.unavailable {
            info!(guild_id = %incomplete.id, "guild became unavailable");
        }
        self.lifecycle.guild_removed(incomplete.id).await;
    }

    async fn channel_update(&self, ctx: Context, old: Option<GuildChannel>, new: GuildChannel) {
        if new.kind != ChannelType::Voice {
            return;
        }
        if old.is_some_and(|old| old.parent_id == new.parent_id) {
            return;
        }
        let channel = cached_channel(&ctx.cache, new.guild_id, new.id)
            .unwrap_or_else(|| channel_info(&new, &Default::default()));
        self.lifecycle.channel_moved(channel).await;
    }

    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let Some(guild_id) = new.guild_id else {
            return;
        };
        let old_channel_id = old.and_then(|state| state.channel_id);
        if old_channel_id == new.channel_id {
            return;
        }

        let change = VoiceMembershipChange {
            guild_id,
            user_id: new.user_id,
            new_channel: new
                .channel_id
                .and_then(|id| cached_channel(&ctx.cache, guild_id, id)),
            old_channel: old_channel_id.and_then(|id| cached_channel(&ctx.cache, guild_id, id)),
        };
        self.lifecycle.voice_membership_changed(change).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };
        let span = span!(
            Level::DEBUG,
            "application_command",
            interaction_id = %command.id,
            guild_id = ?command.guild_id,
            channel_id = %command.channel_id,
            user = %command.user.name,
            command_name = %command.data.name
        );

        async {
            trace!(command = ?command, "received command interaction");
            let res = match command.data.name.as_str() {
                "letsplay" => commands::letsplay::run(&command, ctx.clone(), &self.lifecycle).await,
                "voice_refresh" => {
                    commands::voice_refresh::run(&command, ctx.clone(), &self.lifecycle).await
                }
                _ => {
                    warn!(command_name = %command.data.name, command_options = ?command.data.options, "unknown command received");
                    interaction_reply_ephemeral(&command, &ctx, "Command is currently not implemented").await
                }
            };

            if let Err(why) = res {
                warn!(error = %why, "Cannot respond to slash command");
            }
        }
        .instrument(span)
        .await;
    }
}
