use std::sync::Arc;

use chrono::Duration;

use mailblaster_mail::Mailer;
use mailblaster_store::{GuildLocks, GuildStore};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub store: Arc<GuildStore>,
    pub locks: GuildLocks,
    pub mailer: Arc<dyn Mailer>,
    pub settings: Settings,
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Subject used when neither the message nor the guild supplies one.
    pub default_subject: String,
    pub code_expiry: Duration,
    /// Max concurrent SMTP sends per relay.
    pub relay_workers: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_subject: "Announcement".into(),
            code_expiry: Duration::minutes(15),
            relay_workers: 4,
        }
    }
}
