//! Operations the lifecycle manager needs from the chat platform.
//!
//! The manager only ever talks to Discord through [`Platform`], which keeps the
//! timer logic testable against an in-memory fake.

use serenity::async_trait;
use serenity::model::prelude::{ChannelId, GuildId};
use thiserror::Error;

use crate::channel_info::ChannelInfo;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error(transparent)]
    Discord(#[from] serenity::Error),
}

#[async_trait]
pub trait Platform: Send + Sync + 'static {
    /// Current state of a channel, `None` if it no longer exists or the guild is unavailable.
    async fn channel(&self, guild_id: GuildId, channel_id: ChannelId) -> Option<ChannelInfo>;

    async fn create_voice_channel(
        &self,
        guild_id: GuildId,
        name: &str,
        parent: ChannelId,
        reason: &str,
    ) -> Result<ChannelInfo, PlatformError>;

    async fn delete_channel(&self, channel_id: ChannelId, reason: &str) -> Result<(), PlatformError>;
}
