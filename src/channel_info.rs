use serenity::model::prelude::{ChannelId, GuildId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Category,
    Text,
    Voice,
    Other,
}

/// Read-only view of a guild channel at the moment it was observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub guild_id: GuildId,
    pub name: String,
    pub kind: ChannelKind,
    pub parent_id: Option<ChannelId>,
    /// Members currently connected, only meaningful for voice channels.
    pub occupants: usize,
}

impl ChannelInfo {
    pub fn is_voice(&self) -> bool {
        self.kind == ChannelKind::Voice
    }

    pub fn is_empty(&self) -> bool {
        self.occupants == 0
    }

    pub fn is_child_of(&self, category: ChannelId) -> bool {
        self.parent_id == Some(category)
    }

    pub fn name_matches(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

/// A guild and its channels, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildInfo {
    pub id: GuildId,
    pub name: String,
    pub channels: Vec<ChannelInfo>,
}
