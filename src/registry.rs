use std::collections::HashMap;

use serenity::model::prelude::{ChannelId, GuildId};
use tokio::task::JoinHandle;
use tokio::time::Duration;

/// Where a managed voice channel stands with respect to deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupState {
    NoTimer,
    Armed { window: Duration },
}

/// An armed deletion timer. Dropping it cancels the timer.
#[derive(Debug)]
pub struct PendingDeletion {
    generation: u64,
    window: Duration,
    task: JoinHandle<()>,
}

impl PendingDeletion {
    pub fn new(generation: u64, window: Duration, task: JoinHandle<()>) -> Self {
        Self {
            generation,
            window,
            task,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Drop for PendingDeletion {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[derive(Debug)]
pub struct GuildLifecycleState {
    pub category_id: ChannelId,
    pub command_channel_id: ChannelId,
    pending: HashMap<ChannelId, PendingDeletion>,
}

impl GuildLifecycleState {
    pub fn new(category_id: ChannelId, command_channel_id: ChannelId) -> Self {
        Self {
            category_id,
            command_channel_id,
            pending: HashMap::new(),
        }
    }

    /// Arms a timer, cancelling whatever was armed for the channel before.
    pub fn arm(&mut self, channel_id: ChannelId, pending: PendingDeletion) -> bool {
        self.pending.insert(channel_id, pending).is_some()
    }

    pub fn disarm(&mut self, channel_id: ChannelId) -> bool {
        self.pending.remove(&channel_id).is_some()
    }

    /// Removes the entry only if it still belongs to the timer that fired.
    pub fn take_if_current(&mut self, channel_id: ChannelId, generation: u64) -> Option<PendingDeletion> {
        match self.pending.get(&channel_id) {
            Some(p) if p.generation == generation => self.pending.remove(&channel_id),
            _ => None,
        }
    }

    pub fn cleanup_state(&self, channel_id: ChannelId) -> CleanupState {
        match self.pending.get(&channel_id) {
            Some(p) => CleanupState::Armed { window: p.window },
            None => CleanupState::NoTimer,
        }
    }

    pub fn armed_channels(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.pending.keys().copied()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn cancel_all(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }
}

/// Per-guild lifecycle state, owned by the lifecycle manager.
#[derive(Debug, Default)]
pub struct GuildRegistry {
    guilds: HashMap<GuildId, GuildLifecycleState>,
    next_generation: u64,
}

impl GuildRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs state for a guild. Any previous state and its timers are dropped.
    pub fn insert(&mut self, guild_id: GuildId, state: GuildLifecycleState) -> Option<GuildLifecycleState> {
        self.guilds.insert(guild_id, state)
    }

    pub fn remove(&mut self, guild_id: GuildId) -> Option<GuildLifecycleState> {
        self.guilds.remove(&guild_id)
    }

    pub fn get(&self, guild_id: GuildId) -> Option<&GuildLifecycleState> {
        self.guilds.get(&guild_id)
    }

    pub fn get_mut(&mut self, guild_id: GuildId) -> Option<&mut GuildLifecycleState> {
        self.guilds.get_mut(&guild_id)
    }

    pub fn contains(&self, guild_id: GuildId) -> bool {
        self.guilds.contains_key(&guild_id)
    }

    pub fn guild_ids(&self) -> Vec<GuildId> {
        self.guilds.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.guilds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guilds.is_empty()
    }

    pub fn next_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    pub fn cleanup_state(&self, guild_id: GuildId, channel_id: ChannelId) -> CleanupState {
        self.get(guild_id)
            .map(|state| state.cleanup_state(channel_id))
            .unwrap_or(CleanupState::NoTimer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::pending;
    use tokio::sync::oneshot;

    fn idle_timer(generation: u64, secs: u64) -> PendingDeletion {
        PendingDeletion::new(generation, Duration::from_secs(secs), tokio::spawn(pending()))
    }

    fn state() -> GuildLifecycleState {
        GuildLifecycleState::new(ChannelId::new(10), ChannelId::new(11))
    }

    /// A timer task that never fires; `dropped` resolves once the task is cancelled.
    fn watched_timer(generation: u64, secs: u64) -> (PendingDeletion, oneshot::Receiver<()>) {
        let (tx, dropped) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let _tx = tx;
            pending::<()>().await
        });
        (PendingDeletion::new(generation, Duration::from_secs(secs), task), dropped)
    }

    #[tokio::test]
    async fn rearming_replaces_and_aborts_the_previous_timer() {
        let mut state = state();
        let channel = ChannelId::new(12);

        let (first, first_dropped) = watched_timer(1, 5);
        assert!(!state.arm(channel, first));
        assert!(state.arm(channel, idle_timer(2, 60)));

        assert!(first_dropped.await.is_err());
        assert_eq!(state.pending_count(), 1);
        assert_eq!(
            state.cleanup_state(channel),
            CleanupState::Armed { window: Duration::from_secs(60) }
        );
    }

    #[tokio::test]
    async fn take_if_current_ignores_superseded_generations() {
        let mut state = state();
        let channel = ChannelId::new(12);
        state.arm(channel, idle_timer(1, 5));
        state.arm(channel, idle_timer(2, 5));

        assert!(state.take_if_current(channel, 1).is_none());
        assert_eq!(state.pending_count(), 1);
        assert_eq!(state.take_if_current(channel, 2).map(|p| p.generation()), Some(2));
        assert_eq!(state.cleanup_state(channel), CleanupState::NoTimer);
    }

    #[tokio::test]
    async fn removing_a_guild_cancels_its_timers() {
        let mut registry = GuildRegistry::new();
        let guild = GuildId::new(1);
        let mut state = state();

        let (timer, dropped) = watched_timer(1, 5);
        state.arm(ChannelId::new(12), timer);
        registry.insert(guild, state);

        assert!(registry.remove(guild).is_some());
        assert!(registry.remove(guild).is_none());
        assert!(dropped.await.is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn generations_increase() {
        let mut registry = GuildRegistry::new();
        let a = registry.next_generation();
        let b = registry.next_generation();
        assert!(b > a);
    }
}
