use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use mailblaster_types::models::GuildId;

/// One async mutex per guild. Every read-modify-write of a guild's files
/// runs while holding that guild's guard; different guilds never contend.
#[derive(Clone, Default)]
pub struct GuildLocks {
    inner: Arc<Mutex<HashMap<GuildId, Arc<Mutex<()>>>>>,
}

impl GuildLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `guild_id`. The map lock is only held
    /// long enough to fetch the guild's mutex.
    pub async fn lock(&self, guild_id: GuildId) -> OwnedMutexGuard<()> {
        let guild_lock = {
            let mut map = self.inner.lock().await;
            map.entry(guild_id).or_default().clone()
        };
        guild_lock.lock_owned().await
    }

    /// Drop mutexes nobody holds or waits on.
    pub async fn prune(&self) {
        self.inner
            .lock()
            .await
            .retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_guild_is_serialized() {
        let locks = GuildLocks::new();
        let guard = locks.lock(1).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.lock(1).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn different_guilds_do_not_block() {
        let locks = GuildLocks::new();
        let _a = locks.lock(1).await;
        let b = tokio::time::timeout(Duration::from_secs(1), locks.lock(2)).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn prune_keeps_held_locks() {
        let locks = GuildLocks::new();
        let held = locks.lock(1).await;
        drop(locks.lock(2).await);
        locks.prune().await;
        assert_eq!(locks.len().await, 1);
        drop(held);
        locks.prune().await;
        assert_eq!(locks.len().await, 0);
    }
}
