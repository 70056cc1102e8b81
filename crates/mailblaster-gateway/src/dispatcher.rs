use std::collections::HashSet;

use tracing::{info, warn};

use mailblaster_api::CommandDispatcher;
use mailblaster_store::GuildReaper;
use mailblaster_types::events::InboundEvent;
use mailblaster_types::models::GuildId;

/// Routes gateway events to the core.
///
/// The gateway runs every event on its own task, so a slow relay in one
/// guild never holds up events for another.
#[derive(Clone)]
pub struct EventDispatcher {
    commands: CommandDispatcher,
    reaper: GuildReaper,
}

impl EventDispatcher {
    pub fn new(commands: CommandDispatcher, reaper: GuildReaper) -> Self {
        Self { commands, reaper }
    }

    /// Handle one event. Returns the reply text for command invocations.
    pub async fn dispatch(&self, event: InboundEvent) -> Option<String> {
        match event {
            InboundEvent::MessageReceived(msg) => {
                self.commands.bridge().on_message(&msg).await;
                None
            }
            InboundEvent::CommandInvoked(inv) => Some(self.commands.handle(&inv).await),
            InboundEvent::GuildRemoved { guild_id } => {
                let report = self.reaper.reap_guild(guild_id).await;
                info!(
                    guild_id,
                    files = report.files_deleted,
                    failures = report.failures,
                    "Removed from guild; deleted its mailing list"
                );
                None
            }
        }
    }

    /// Delete state for every stored guild not in `active`.
    pub async fn reap_departed(&self, active: &HashSet<GuildId>) {
        match self.reaper.reap(active).await {
            Ok(report) => info!(
                active = active.len(),
                reaped = report.guilds,
                "Startup cleanup finished"
            ),
            Err(e) => warn!(error = %e, "Startup cleanup failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use mailblaster_api::{AppStateInner, Settings};
    use mailblaster_crypto::CredentialCipher;
    use mailblaster_mail::testing::RecordingMailer;
    use mailblaster_store::{GuildLocks, GuildStore};
    use mailblaster_types::events::{ChannelMessage, CommandInvocation, SlashCommand};
    use mailblaster_types::models::{SenderAccount, Subscriber};

    async fn dispatcher(
        dir: &std::path::Path,
    ) -> (EventDispatcher, Arc<GuildStore>, Arc<RecordingMailer>) {
        let store = Arc::new(
            GuildStore::open(
                dir.to_path_buf(),
                CredentialCipher::from_secret("gateway-test"),
                SenderAccount {
                    email: "bot@default.test".into(),
                    password: "pw".into(),
                    host: "smtp.default.test".into(),
                    port: 465,
                    use_ssl: true,
                },
            )
            .await
            .unwrap(),
        );
        let locks = GuildLocks::new();
        let mailer = Arc::new(RecordingMailer::new());
        let state = Arc::new(AppStateInner {
            store: store.clone(),
            locks: locks.clone(),
            mailer: mailer.clone(),
            settings: Settings::default(),
        });
        let events = EventDispatcher::new(
            CommandDispatcher::new(state),
            GuildReaper::new(store.clone(), locks),
        );
        (events, store, mailer)
    }

    #[tokio::test]
    async fn commands_reply_and_messages_relay() {
        let dir = tempfile::tempdir().unwrap();
        let (events, store, mailer) = dispatcher(dir.path()).await;
        store
            .save_subscribers(100, &[Subscriber::verified("a@x.com".into())])
            .await
            .unwrap();

        let reply = events
            .dispatch(InboundEvent::CommandInvoked(CommandInvocation {
                guild_id: 100,
                user_id: 1,
                is_admin: true,
                command: SlashCommand::SetChannel { channel_id: 555 },
            }))
            .await;
        assert!(reply.unwrap().contains("<#555>"));

        let reply = events
            .dispatch(InboundEvent::MessageReceived(ChannelMessage {
                guild_id: 100,
                channel_id: 555,
                author_is_bot: false,
                content: "hello".into(),
            }))
            .await;
        assert_eq!(reply, None);
        assert_eq!(mailer.sent_to("a@x.com").await.len(), 1);
    }

    #[tokio::test]
    async fn guild_removal_deletes_only_that_guild() {
        let dir = tempfile::tempdir().unwrap();
        let (events, store, _) = dispatcher(dir.path()).await;
        for id in [1, 2] {
            store
                .save_subscribers(id, &[Subscriber::verified("a@x.com".into())])
                .await
                .unwrap();
        }

        events.dispatch(InboundEvent::GuildRemoved { guild_id: 1 }).await;

        let left: Vec<GuildId> = store.list_known_guild_ids().await.unwrap().into_iter().collect();
        assert_eq!(left, vec![2]);
    }

    #[tokio::test]
    async fn startup_reap_keeps_active_guilds() {
        let dir = tempfile::tempdir().unwrap();
        let (events, store, _) = dispatcher(dir.path()).await;
        for id in [1, 2, 3] {
            store
                .save_subscribers(id, &[Subscriber::verified("a@x.com".into())])
                .await
                .unwrap();
        }

        events.reap_departed(&[1, 3].into_iter().collect()).await;

        let left: Vec<GuildId> = store.list_known_guild_ids().await.unwrap().into_iter().collect();
        assert_eq!(left, vec![1, 3]);
    }
}
