use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use mailblaster_types::models::GuildId;

use crate::locks::GuildLocks;
use crate::store::GuildStore;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReapReport {
    pub guilds: usize,
    pub files_deleted: usize,
    pub failures: usize,
}

/// Deletes artifacts of guilds the bot no longer belongs to.
#[derive(Clone)]
pub struct GuildReaper {
    store: Arc<GuildStore>,
    locks: GuildLocks,
}

impl GuildReaper {
    pub fn new(store: Arc<GuildStore>, locks: GuildLocks) -> Self {
        Self { store, locks }
    }

    /// Remove every known guild that is not in `active`.
    pub async fn reap(&self, active: &HashSet<GuildId>) -> Result<ReapReport> {
        let known = self.store.list_known_guild_ids().await?;
        let mut report = ReapReport::default();

        for guild_id in known.into_iter().filter(|id| !active.contains(id)) {
            let guild = self.reap_guild(guild_id).await;
            report.guilds += guild.guilds;
            report.files_deleted += guild.files_deleted;
            report.failures += guild.failures;
        }

        self.locks.prune().await;

        if report.guilds > 0 {
            info!(
                guilds = report.guilds,
                files = report.files_deleted,
                failures = report.failures,
                "Reaped state for departed guilds"
            );
        }
        Ok(report)
    }

    /// Remove both artifacts of one guild, plus scratch files left by an
    /// interrupted write. A failure on one file does not stop the others.
    pub async fn reap_guild(&self, guild_id: GuildId) -> ReapReport {
        let _guard = self.locks.lock(guild_id).await;
        let mut report = ReapReport {
            guilds: 1,
            ..Default::default()
        };

        let artifacts = [
            self.store.config_path(guild_id),
            self.store.subscribers_path(guild_id),
        ];
        let scratch: Vec<_> = artifacts
            .iter()
            .filter_map(|path| self.store.temp_path(path))
            .collect();

        for path in artifacts.iter().chain(&scratch) {
            match self.store.delete_artifact(path).await {
                Ok(true) => report.files_deleted += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        guild_id,
                        path = %path.display(),
                        error = %e,
                        "Failed to delete guild artifact"
                    );
                    report.failures += 1;
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::open_store;
    use mailblaster_types::models::{GuildConfig, Subscriber};

    async fn seeded(dir: &std::path::Path, guilds: &[GuildId]) -> (Arc<GuildStore>, GuildReaper) {
        let store = Arc::new(open_store(dir).await);
        for &id in guilds {
            store.save(id, &GuildConfig::default()).await.unwrap();
            store
                .save_subscribers(id, &[Subscriber::verified("a@x.com".into())])
                .await
                .unwrap();
        }
        let reaper = GuildReaper::new(store.clone(), GuildLocks::new());
        (store, reaper)
    }

    #[tokio::test]
    async fn empty_active_set_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let (store, reaper) = seeded(dir.path(), &[1, 2, 3]).await;

        let report = reaper.reap(&HashSet::new()).await.unwrap();

        assert_eq!(report.guilds, 3);
        assert_eq!(report.files_deleted, 6);
        assert!(store.list_known_guild_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn full_active_set_removes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (store, reaper) = seeded(dir.path(), &[1, 2, 3]).await;

        let active: HashSet<GuildId> = [1, 2, 3].into_iter().collect();
        let report = reaper.reap(&active).await.unwrap();

        assert_eq!(report, ReapReport::default());
        assert_eq!(store.list_known_guild_ids().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn only_departed_guilds_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let (store, reaper) = seeded(dir.path(), &[1, 2]).await;

        let active: HashSet<GuildId> = [2, 99].into_iter().collect();
        reaper.reap(&active).await.unwrap();

        let left: Vec<GuildId> = store.list_known_guild_ids().await.unwrap().into_iter().collect();
        assert_eq!(left, vec![2]);
        assert_eq!(store.load_subscribers(2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn single_guild_with_one_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(open_store(dir.path()).await);
        store.save(5, &GuildConfig::default()).await.unwrap();
        let reaper = GuildReaper::new(store.clone(), GuildLocks::new());

        let report = reaper.reap_guild(5).await;
        assert_eq!(report.files_deleted, 1);
        assert_eq!(report.failures, 0);
        assert!(!store.config_path(5).exists());
    }

    #[tokio::test]
    async fn interrupted_write_leftovers_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(open_store(dir.path()).await);
        store.save(5, &GuildConfig::default()).await.unwrap();
        std::fs::write(dir.path().join(".5-config.json.tmp"), "{").unwrap();
        std::fs::write(dir.path().join(".5-subscribers.txt.tmp"), "a@x.com").unwrap();
        std::fs::write(dir.path().join(".6-config.json.tmp"), "{").unwrap();
        let reaper = GuildReaper::new(store.clone(), GuildLocks::new());

        let report = reaper.reap_guild(5).await;

        assert_eq!(report.files_deleted, 3);
        assert!(!dir.path().join(".5-config.json.tmp").exists());
        assert!(!dir.path().join(".5-subscribers.txt.tmp").exists());
        assert!(dir.path().join(".6-config.json.tmp").exists());
    }
}
