use serenity::model::prelude::ChannelId;
use thiserror::Error;

use crate::channel_info::{ChannelInfo, ChannelKind};
use crate::config::Config;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("could not find self-service category {0:?}")]
    MissingCategory(String),

    #[error("could not find command channel {0:?}")]
    MissingCommandChannel(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category_id: ChannelId,
    pub command_channel_id: ChannelId,
    pub empty_voice_channels: Vec<ChannelInfo>,
}

/// Finds the managed category and command channel of a guild.
///
/// Names are compared case-insensitively and the first match in `channels` wins.
/// The command channel is looked up inside the category before the rest of the guild.
pub fn classify(config: &Config, channels: &[ChannelInfo]) -> Result<Classification, ClassifyError> {
    let category = channels
        .iter()
        .find(|c| c.kind == ChannelKind::Category && c.name_matches(&config.category_name))
        .ok_or_else(|| ClassifyError::MissingCategory(config.category_name.clone()))?;

    let is_command_channel =
        |c: &&ChannelInfo| c.kind == ChannelKind::Text && c.name_matches(&config.command_channel_name);

    let mut command_channel_id = None;
    let mut empty_voice_channels = Vec::new();
    for channel in channels.iter().filter(|c| c.is_child_of(category.id)) {
        if command_channel_id.is_none() && is_command_channel(&channel) {
            command_channel_id = Some(channel.id);
        } else if channel.is_voice() && channel.is_empty() {
            empty_voice_channels.push(channel.clone());
        }
    }

    let command_channel_id = command_channel_id
        .or_else(|| channels.iter().find(is_command_channel).map(|c| c.id))
        .ok_or_else(|| ClassifyError::MissingCommandChannel(config.command_channel_name.clone()))?;

    Ok(Classification {
        category_id: category.id,
        command_channel_id,
        empty_voice_channels,
    })
}
