//! Discord-backed [`Platform`] built on serenity's cache and HTTP client.

use std::collections::HashMap;
use std::sync::Arc;

use serenity::all::{
    Cache, ChannelId, ChannelType, CreateChannel, Guild, GuildChannel, GuildId, Http, UserId,
    VoiceState,
};
use serenity::async_trait;

use crate::channel_info::{ChannelInfo, ChannelKind, GuildInfo};
use crate::platform::{Platform, PlatformError};

pub fn channel_kind(kind: ChannelType) -> ChannelKind {
    match kind {
        ChannelType::Category => ChannelKind::Category,
        ChannelType::Text => ChannelKind::Text,
        ChannelType::Voice => ChannelKind::Voice,
        _ => ChannelKind::Other,
    }
}

pub fn channel_info(channel: &GuildChannel, voice_states: &HashMap<UserId, VoiceState>) -> ChannelInfo {
    let occupants = voice_states
        .values()
        .filter(|state| state.channel_id == Some(channel.id))
        .count();
    ChannelInfo {
        id: channel.id,
        guild_id: channel.guild_id,
        name: channel.name.clone(),
        kind: channel_kind(channel.kind),
        parent_id: channel.parent_id,
        occupants,
    }
}

/// Snapshot of a guild with its channels ordered by position, then id.
pub fn guild_info(guild: &Guild) -> GuildInfo {
    let mut channels: Vec<&GuildChannel> = guild.channels.values().collect();
    channels.sort_by_key(|c| (c.position, c.id));
    GuildInfo {
        id: guild.id,
        name: guild.name.clone(),
        channels: channels
            .into_iter()
            .map(|c| channel_info(c, &guild.voice_states))
            .collect(),
    }
}

pub fn cached_guild(cache: &Cache, guild_id: GuildId) -> Option<GuildInfo> {
    cache.guild(guild_id).map(|guild| guild_info(&guild))
}

pub fn cached_channel(cache: &Cache, guild_id: GuildId, channel_id: ChannelId) -> Option<ChannelInfo> {
    let guild = cache.guild(guild_id)?;
    let channel = guild.channels.get(&channel_id)?;
    Some(channel_info(channel, &guild.voice_states))
}

pub struct DiscordPlatform {
    cache: Arc<Cache>,
    http: Arc<Http>,
}

impl DiscordPlatform {
    pub fn new(cache: Arc<Cache>, http: Arc<Http>) -> Self {
        Self { cache, http }
    }
}

#[async_trait]
impl Platform for DiscordPlatform {
    async fn channel(&self, guild_id: GuildId, channel_id: ChannelId) -> Option<ChannelInfo> {
        cached_channel(&self.cache, guild_id, channel_id)
    }

    async fn create_voice_channel(
        &self,
        guild_id: GuildId,
        name: &str,
        parent: ChannelId,
        reason: &str,
    ) -> Result<ChannelInfo, PlatformError> {
        let builder = CreateChannel::new(name)
            .kind(ChannelType::Voice)
            .category(parent)
            .audit_log_reason(reason);
        let channel = guild_id.create_channel(&self.http, builder).await?;
        Ok(channel_info(&channel, &HashMap::new()))
    }

    async fn delete_channel(&self, channel_id: ChannelId, reason: &str) -> Result<(), PlatformError> {
        self.http.delete_channel(channel_id, Some(reason)).await?;
        Ok(())
    }
}
