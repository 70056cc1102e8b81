use futures_util::{StreamExt, stream};
use tracing::{debug, error, info, warn};

use mailblaster_types::events::ChannelMessage;
use mailblaster_types::models::{GuildConfig, GuildId, SenderAccount};

use crate::error::ListError;
use crate::state::AppState;

/// Subject line marker for the first line of an announcement.
const SUBJECT_MARKER: char = '#';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayReport {
    pub recipients: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Turns messages in a guild's announcement channel into emails.
#[derive(Clone)]
pub struct AnnouncementBridge {
    state: AppState,
}

impl AnnouncementBridge {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Relay `msg` to every verified subscriber of its guild.
    ///
    /// Returns `None` when the message is not an announcement (wrong channel,
    /// bot author) or the guild's state could not be read.
    pub async fn on_message(&self, msg: &ChannelMessage) -> Option<RelayReport> {
        if msg.author_is_bot {
            return None;
        }

        let (config, recipients) = match self.snapshot(msg.guild_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(
                    guild_id = msg.guild_id,
                    error = %e,
                    "Cannot read guild state; message not relayed"
                );
                return None;
            }
        };
        if config.announcement_channel_id != Some(msg.channel_id) {
            return None;
        }

        let announcement = compose(&config, &self.state.settings.default_subject, &msg.content);
        let account = self.state.store.resolve_account(&config).clone();
        let report = self
            .deliver(msg.guild_id, &account, &announcement, recipients)
            .await;

        info!(
            guild_id = msg.guild_id,
            recipients = report.recipients,
            delivered = report.delivered,
            failed = report.failed,
            "Announcement relayed"
        );
        Some(report)
    }

    /// Send one email from the guild's resolved account to that same address.
    pub async fn send_test(&self, guild_id: GuildId) -> Result<String, ListError> {
        let config = {
            let _guard = self.state.locks.lock(guild_id).await;
            self.state.store.load(guild_id).await?
        };
        let account = self.state.store.resolve_account(&config);

        let subject = with_prefix(&config, "Mailblaster test email");
        let body = format!(
            "This is a test email from the announcement bridge.\n\n\
             Sent from {} via {}:{} (ssl: {}).",
            account.email, account.host, account.port, account.use_ssl
        );
        self.state
            .mailer
            .send(account, &account.email, &subject, &body)
            .await?;

        info!(guild_id, "Test email sent");
        Ok(account.email.clone())
    }

    async fn snapshot(&self, guild_id: GuildId) -> anyhow::Result<(GuildConfig, Vec<String>)> {
        let _guard = self.state.locks.lock(guild_id).await;
        let config = self.state.store.load(guild_id).await?;
        if config.announcement_channel_id.is_none() {
            return Ok((config, Vec::new()));
        }
        let recipients = self
            .state
            .store
            .load_subscribers(guild_id)
            .await?
            .into_iter()
            .filter(|s| s.is_verified())
            .map(|s| s.email)
            .collect();
        Ok((config, recipients))
    }

    /// One independent send per recipient, at most `relay_workers` at a time.
    async fn deliver(
        &self,
        guild_id: GuildId,
        account: &SenderAccount,
        announcement: &Announcement,
        recipients: Vec<String>,
    ) -> RelayReport {
        let workers = self.state.settings.relay_workers.max(1);
        let total = recipients.len();

        let results: Vec<bool> = stream::iter(recipients)
            .map(|to| async move {
                match self
                    .state
                    .mailer
                    .send(account, &to, &announcement.subject, &announcement.body)
                    .await
                {
                    Ok(()) => {
                        debug!(guild_id, to = %to, "Delivered announcement");
                        true
                    }
                    Err(e) => {
                        warn!(guild_id, to = %to, error = %e, "Failed to deliver announcement");
                        false
                    }
                }
            })
            .buffer_unordered(workers)
            .collect()
            .await;

        let delivered = results.iter().filter(|ok| **ok).count();
        RelayReport {
            recipients: total,
            delivered,
            failed: total - delivered,
        }
    }
}

/// Derive subject and body from a raw message.
///
/// A first line starting with `#` is the subject and the rest is the body.
/// Exactly one marker is removed and the remainder trimmed, so `## Title`
/// gives the subject `# Title`; an indented `#` is ordinary text.
/// Otherwise the guild's default subject (or `fallback_subject`) is used and
/// the whole message is the body.
pub fn compose(config: &GuildConfig, fallback_subject: &str, raw: &str) -> Announcement {
    let (first, rest) = match raw.split_once('\n') {
        Some((first, rest)) => (first.trim_end_matches('\r'), rest),
        None => (raw, ""),
    };

    let explicit = first
        .strip_prefix(SUBJECT_MARKER)
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let (subject, body) = match explicit {
        Some(subject) => (subject.to_string(), rest.to_string()),
        None => {
            let subject = config
                .default_subject
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(fallback_subject);
            (subject.to_string(), raw.to_string())
        }
    };

    Announcement {
        subject: with_prefix(config, &subject),
        body,
    }
}

fn with_prefix(config: &GuildConfig, subject: &str) -> String {
    match config.subject_prefix.as_deref().filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{} {}", prefix, subject),
        None => subject.to_string(),
    }
}
