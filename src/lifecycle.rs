//! Self-serve voice channel lifecycle.
//!
//! Every gateway event and every timer expiry becomes an [`Event`] on one queue,
//! consumed by a single [`LifecycleManager`] task. Handlers therefore never interleave,
//! but the order in which Discord delivers joins relative to timer expiries is not
//! guaranteed, so a channel is only deleted after re-reading its current state.

use std::ops::ControlFlow;
use std::sync::Arc;

use async_channel::{Receiver, Sender};
use humantime::format_duration;
use serenity::model::prelude::{ChannelId, GuildId, UserId};
use tokio::sync::oneshot;
use tokio::time::Duration;

use crate::channel_info::{ChannelInfo, GuildInfo};
use crate::classifier::classify;
use crate::commands::letsplay::{LetsPlayOutcome, LetsPlayRequest};
use crate::config::Config;
use crate::platform::Platform;
use crate::registry::{CleanupState, GuildLifecycleState, GuildRegistry, PendingDeletion};

/// A member moved between voice channels. Occupancy is as observed after the move.
#[derive(Debug, Clone)]
pub struct VoiceMembershipChange {
    pub guild_id: GuildId,
    pub user_id: UserId,
    pub new_channel: Option<ChannelInfo>,
    pub old_channel: Option<ChannelInfo>,
}

#[derive(Debug)]
pub enum Event {
    GuildAvailable(GuildInfo),
    GuildRemoved(GuildId),
    ChannelMoved(ChannelInfo),
    VoiceMembershipChanged(VoiceMembershipChange),
    LetsPlay {
        request: LetsPlayRequest,
        respond_to: oneshot::Sender<LetsPlayOutcome>,
    },
    Refresh {
        guild: GuildInfo,
        respond_to: oneshot::Sender<bool>,
    },
    CleanupDue {
        guild_id: GuildId,
        channel_id: ChannelId,
        generation: u64,
    },
    Shutdown(oneshot::Sender<()>),
}

/// Why an expired timer did not delete its channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The timer was cancelled or re-armed after it fired.
    Stale,
    Missing,
    MovedOut,
    Occupied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    Deleted,
    Skipped(SkipReason),
    DeleteFailed,
}

/// Cloneable sender side used by the gateway handler.
#[derive(Debug, Clone)]
pub struct LifecycleHandle {
    events: Sender<Event>,
}

impl LifecycleHandle {
    pub fn new(events: Sender<Event>) -> Self {
        Self { events }
    }

    async fn send(&self, event: Event) {
        if let Err(why) = self.events.send(event).await {
            warn!(event = ?why.0, "voice lifecycle manager is not running");
        }
    }

    pub async fn guild_available(&self, guild: GuildInfo) {
        self.send(Event::GuildAvailable(guild)).await
    }

    pub async fn guild_removed(&self, guild_id: GuildId) {
        self.send(Event::GuildRemoved(guild_id)).await
    }

    pub async fn channel_moved(&self, channel: ChannelInfo) {
        self.send(Event::ChannelMoved(channel)).await
    }

    pub async fn voice_membership_changed(&self, change: VoiceMembershipChange) {
        self.send(Event::VoiceMembershipChanged(change)).await
    }

    /// Returns `None` if the manager stopped before answering.
    pub async fn lets_play(&self, request: LetsPlayRequest) -> Option<LetsPlayOutcome> {
        let (respond_to, response) = oneshot::channel();
        self.send(Event::LetsPlay { request, respond_to }).await;
        response.await.ok()
    }

    pub async fn refresh(&self, guild: GuildInfo) -> Option<bool> {
        let (respond_to, response) = oneshot::channel();
        self.send(Event::Refresh { guild, respond_to }).await;
        response.await.ok()
    }

    /// Whether the manager has stopped accepting events.
    pub fn is_closed(&self) -> bool {
        self.events.is_closed()
    }

    /// Cancels every timer and waits for the manager to stop.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        self.send(Event::Shutdown(tx)).await;
        rx.await.ok();
    }
}

pub struct LifecycleManager<P> {
    pub(crate) config: Config,
    pub(crate) platform: Arc<P>,
    pub(crate) registry: GuildRegistry,
    events: Sender<Event>,
}

impl<P: Platform> LifecycleManager<P> {
    /// `events` must feed the receiver passed to [`LifecycleManager::run`]; timers post to it.
    pub fn new(config: Config, platform: Arc<P>, events: Sender<Event>) -> Self {
        Self {
            config,
            platform,
            registry: GuildRegistry::new(),
            events,
        }
    }

    pub fn registry(&self) -> &GuildRegistry {
        &self.registry
    }

    pub fn cleanup_state(&self, guild_id: GuildId, channel_id: ChannelId) -> CleanupState {
        self.registry.cleanup_state(guild_id, channel_id)
    }

    pub async fn run(mut self, events: Receiver<Event>) {
        info!("voice lifecycle manager started");
        while let Ok(event) = events.recv().await {
            if self.dispatch(event).await.is_break() {
                break;
            }
        }
        self.teardown_all();
        // Later sends fail fast and queued requests drop their responders.
        events.close();
        while let Ok(event) = events.try_recv() {
            trace!(event = ?event, "dropping event queued after shutdown");
        }
        info!("voice lifecycle manager stopped");
    }

    pub async fn dispatch(&mut self, event: Event) -> ControlFlow<()> {
        trace!(event = ?event, "dispatching lifecycle event");
        match event {
            Event::GuildAvailable(guild) => self.on_guild_available(&guild),
            Event::GuildRemoved(guild_id) => {
                self.teardown_guild(guild_id);
            }
            Event::ChannelMoved(channel) => {
                self.on_channel_moved(&channel);
            }
            Event::VoiceMembershipChanged(change) => self.on_voice_membership_changed(&change),
            Event::LetsPlay { request, respond_to } => {
                let outcome = self.on_lets_play(request).await;
                respond_to.send(outcome).ok();
            }
            Event::Refresh { guild, respond_to } => {
                self.teardown_guild(guild.id);
                respond_to.send(self.init_guild(&guild)).ok();
            }
            Event::CleanupDue {
                guild_id,
                channel_id,
                generation,
            } => {
                self.on_cleanup_due(guild_id, channel_id, generation).await;
            }
            Event::Shutdown(done) => {
                self.teardown_all();
                done.send(()).ok();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn on_guild_available(&mut self, guild: &GuildInfo) {
        if self.registry.contains(guild.id) {
            debug!(guild_id = %guild.id, "guild already managed");
            return;
        }
        if self.init_guild(guild) {
            info!(guild_id = %guild.id, guild = %guild.name, "ready for action");
        }
    }

    /// Resolves the guild's category and command channel and arms timers for the
    /// category's empty voice channels. Returns whether the guild is now managed.
    pub fn init_guild(&mut self, guild: &GuildInfo) -> bool {
        let found = match classify(&self.config, &guild.channels) {
            Ok(found) => found,
            Err(why) => {
                warn!(guild_id = %guild.id, guild = %guild.name, error = %why, "leaving guild unmanaged");
                return false;
            }
        };

        let state = GuildLifecycleState::new(found.category_id, found.command_channel_id);
        self.registry.insert(guild.id, state);
        debug!(
            guild_id = %guild.id,
            category_id = %found.category_id,
            command_channel_id = %found.command_channel_id,
            empty_channels = found.empty_voice_channels.len(),
            "guild initialized"
        );

        for channel in &found.empty_voice_channels {
            self.schedule_cleanup(channel, self.config.cleanup_window);
        }
        true
    }

    /// Forgets a guild and cancels its timers. Unknown guilds are ignored.
    pub fn teardown_guild(&mut self, guild_id: GuildId) -> bool {
        match self.registry.remove(guild_id) {
            Some(mut state) => {
                let cancelled = state.cancel_all();
                info!(guild_id = %guild_id, cancelled, "stopped managing guild");
                true
            }
            None => false,
        }
    }

    fn teardown_all(&mut self) {
        for guild_id in self.registry.guild_ids() {
            self.teardown_guild(guild_id);
        }
    }

    /// Arms (or re-arms) the deletion timer for a voice channel in the managed category.
    pub fn schedule_cleanup(&mut self, channel: &ChannelInfo, window: Duration) -> bool {
        if !channel.is_voice() {
            return false;
        }
        let generation = self.registry.next_generation();
        let Some(state) = self.registry.get_mut(channel.guild_id) else {
            return false;
        };
        if !channel.is_child_of(state.category_id) {
            trace!(channel_id = %channel.id, "channel is outside the managed category");
            return false;
        }

        let events = self.events.clone();
        let (guild_id, channel_id) = (channel.guild_id, channel.id);
        let task = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            events
                .send(Event::CleanupDue {
                    guild_id,
                    channel_id,
                    generation,
                })
                .await
                .ok();
        });

        let replaced = state.arm(channel_id, PendingDeletion::new(generation, window, task));
        debug!(
            guild_id = %guild_id,
            channel_id = %channel_id,
            channel = %channel.name,
            window = %format_duration(window),
            replaced,
            "cleanup scheduled"
        );
        true
    }

    pub fn cancel_cleanup(&mut self, guild_id: GuildId, channel_id: ChannelId) -> bool {
        let cancelled = self
            .registry
            .get_mut(guild_id)
            .map(|state| state.disarm(channel_id))
            .unwrap_or(false);
        if cancelled {
            debug!(guild_id = %guild_id, channel_id = %channel_id, "cleanup cancelled");
        }
        cancelled
    }

    pub fn on_voice_membership_changed(&mut self, change: &VoiceMembershipChange) {
        trace!(
            guild_id = %change.guild_id,
            user_id = %change.user_id,
            joined = ?change.new_channel.as_ref().map(|c| c.id),
            left = ?change.old_channel.as_ref().map(|c| c.id),
            "voice membership changed"
        );
        if let Some(old) = &change.old_channel {
            if old.is_empty() {
                self.schedule_cleanup(old, self.config.cleanup_window);
            }
        }
        if let Some(new) = &change.new_channel {
            if !new.is_empty() {
                self.cancel_cleanup(change.guild_id, new.id);
            } else if self.cleanup_state(change.guild_id, new.id) == CleanupState::NoTimer {
                // The member already left again by the time this snapshot was taken.
                self.schedule_cleanup(new, self.config.cleanup_window);
            }
        }
    }

    /// Picks up empty voice channels dragged into the managed category.
    pub fn on_channel_moved(&mut self, channel: &ChannelInfo) -> bool {
        let in_category = self
            .registry
            .get(channel.guild_id)
            .is_some_and(|state| channel.is_child_of(state.category_id));
        if in_category && channel.is_empty() {
            return self.schedule_cleanup(channel, self.config.cleanup_window);
        }
        false
    }

    /// Handles an expired timer. The channel is deleted only if it is still in the
    /// managed category and still empty right now.
    pub async fn on_cleanup_due(
        &mut self,
        guild_id: GuildId,
        channel_id: ChannelId,
        generation: u64,
    ) -> CleanupOutcome {
        let Some(state) = self.registry.get_mut(guild_id) else {
            debug!(guild_id = %guild_id, channel_id = %channel_id, "timer fired for unmanaged guild");
            return CleanupOutcome::Skipped(SkipReason::Stale);
        };
        let Some(pending) = state.take_if_current(channel_id, generation) else {
            debug!(channel_id = %channel_id, generation, "ignoring superseded timer");
            return CleanupOutcome::Skipped(SkipReason::Stale);
        };
        let category_id = state.category_id;
        let window = pending.window();
        drop(pending);

        let skip = match self.platform.channel(guild_id, channel_id).await {
            None => Some(SkipReason::Missing),
            Some(channel) if !channel.is_child_of(category_id) => Some(SkipReason::MovedOut),
            Some(channel) if !channel.is_empty() => Some(SkipReason::Occupied),
            Some(_) => None,
        };
        if let Some(reason) = skip {
            debug!(channel_id = %channel_id, reason = ?reason, "skipping cleanup");
            return CleanupOutcome::Skipped(reason);
        }

        let reason = format!("Has gone unused for {}", format_duration(window));
        match self.platform.delete_channel(channel_id, &reason).await {
            Ok(()) => {
                info!(guild_id = %guild_id, channel_id = %channel_id, "deleted unused voice channel");
                CleanupOutcome::Deleted
            }
            Err(why) => {
                error!(guild_id = %guild_id, channel_id = %channel_id, error = %why, "failed to delete voice channel");
                CleanupOutcome::DeleteFailed
            }
        }
    }
}
