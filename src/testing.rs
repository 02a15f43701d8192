//! In-memory stand-ins for Discord used by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serenity::async_trait;
use serenity::model::prelude::{ChannelId, GuildId};

use crate::channel_info::{ChannelInfo, ChannelKind, GuildInfo};
use crate::config::Config;
use crate::lifecycle::{Event, LifecycleManager};
use crate::platform::{Platform, PlatformError};
use tokio::time::Duration;

pub const GUILD: u64 = 1;

fn channel(id: u64, name: &str, kind: ChannelKind, parent: Option<u64>, occupants: usize) -> ChannelInfo {
    ChannelInfo {
        id: ChannelId::new(id),
        guild_id: GuildId::new(GUILD),
        name: name.to_string(),
        kind,
        parent_id: parent.map(ChannelId::new),
        occupants,
    }
}

pub fn category(id: u64, name: &str) -> ChannelInfo {
    channel(id, name, ChannelKind::Category, None, 0)
}

pub fn text(id: u64, name: &str, parent: Option<u64>) -> ChannelInfo {
    channel(id, name, ChannelKind::Text, parent, 0)
}

pub fn voice(id: u64, name: &str, parent: Option<u64>, occupants: usize) -> ChannelInfo {
    channel(id, name, ChannelKind::Voice, parent, occupants)
}

/// Category 10 "on-demand voice" holding "requests" (11), empty "Lounge" (12) and
/// occupied "Busy" (13), plus an empty voice channel outside the category (20).
pub fn standard_guild() -> GuildInfo {
    GuildInfo {
        id: GuildId::new(GUILD),
        name: "Test Guild".to_string(),
        channels: vec![
            text(2, "general", None),
            category(10, "on-demand voice"),
            text(11, "requests", Some(10)),
            voice(12, "Lounge", Some(10), 0),
            voice(13, "Busy", Some(10), 3),
            voice(20, "AFK", None, 0),
        ],
    }
}

pub const CLEANUP: Duration = Duration::from_secs(48 * 3600);
pub const FIRST_JOIN: Duration = Duration::from_secs(60);

pub fn test_config() -> Config {
    Config {
        cleanup_window: CLEANUP,
        first_join_window: Some(FIRST_JOIN),
        ..Config::default()
    }
}

/// Records every call and serves channel state from a mutable map.
#[derive(Default)]
pub struct FakePlatform {
    channels: Mutex<HashMap<ChannelId, ChannelInfo>>,
    pub deleted: Mutex<Vec<(ChannelId, String)>>,
    pub created: Mutex<Vec<(String, ChannelId, String)>>,
    pub fail_create: AtomicBool,
    pub fail_delete: AtomicBool,
    next_id: AtomicU64,
}

impl FakePlatform {
    pub fn with_guild(guild: &GuildInfo) -> Arc<Self> {
        let platform = FakePlatform {
            next_id: AtomicU64::new(1000),
            ..Default::default()
        };
        for channel in &guild.channels {
            platform.put(channel.clone());
        }
        Arc::new(platform)
    }

    pub fn put(&self, channel: ChannelInfo) {
        self.channels.lock().unwrap().insert(channel.id, channel);
    }

    pub fn get(&self, id: u64) -> ChannelInfo {
        self.channels.lock().unwrap()[&ChannelId::new(id)].clone()
    }

    pub fn set_occupants(&self, id: u64, occupants: usize) -> ChannelInfo {
        let mut channels = self.channels.lock().unwrap();
        let channel = channels.get_mut(&ChannelId::new(id)).unwrap();
        channel.occupants = occupants;
        channel.clone()
    }

    pub fn set_parent(&self, id: u64, parent: Option<u64>) -> ChannelInfo {
        let mut channels = self.channels.lock().unwrap();
        let channel = channels.get_mut(&ChannelId::new(id)).unwrap();
        channel.parent_id = parent.map(ChannelId::new);
        channel.clone()
    }

    pub fn deleted_ids(&self) -> Vec<u64> {
        self.deleted.lock().unwrap().iter().map(|(id, _)| id.get()).collect()
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn channel(&self, _guild_id: GuildId, channel_id: ChannelId) -> Option<ChannelInfo> {
        self.channels.lock().unwrap().get(&channel_id).cloned()
    }

    async fn create_voice_channel(
        &self,
        guild_id: GuildId,
        name: &str,
        parent: ChannelId,
        reason: &str,
    ) -> Result<ChannelInfo, PlatformError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(serenity::Error::Other("Missing Permissions").into());
        }
        let id = ChannelId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let channel = ChannelInfo {
            id,
            guild_id,
            name: name.to_string(),
            kind: ChannelKind::Voice,
            parent_id: Some(parent),
            occupants: 0,
        };
        self.put(channel.clone());
        self.created
            .lock()
            .unwrap()
            .push((name.to_string(), parent, reason.to_string()));
        Ok(channel)
    }

    async fn delete_channel(&self, channel_id: ChannelId, reason: &str) -> Result<(), PlatformError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(serenity::Error::Other("Unknown Channel").into());
        }
        self.channels.lock().unwrap().remove(&channel_id);
        self.deleted.lock().unwrap().push((channel_id, reason.to_string()));
        Ok(())
    }
}

pub fn manager(
    platform: Arc<FakePlatform>,
) -> (LifecycleManager<FakePlatform>, async_channel::Receiver<Event>) {
    let (tx, rx) = async_channel::unbounded();
    (LifecycleManager::new(test_config(), platform, tx), rx)
}
