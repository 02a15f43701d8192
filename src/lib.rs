pub mod channel_info;
pub mod classifier;
pub mod commands;
pub mod config;
pub mod discord;
pub mod handler;
pub mod lifecycle;
pub mod platform;
pub mod registry;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

#[macro_use]
extern crate tracing;

use std::sync::Arc;

use async_channel::Receiver;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::lifecycle::{Event, LifecycleManager};
use crate::platform::Platform;

/// Runs the lifecycle manager on its own task until it receives a shutdown event.
pub fn spawn_lifecycle<P: Platform>(
    config: Config,
    platform: Arc<P>,
    events: async_channel::Sender<Event>,
    receiver: Receiver<Event>,
) -> JoinHandle<()> {
    let manager = LifecycleManager::new(config, platform, events);
    tokio::spawn(manager.run(receiver))
}
