use std::sync::Arc;

use tempfile::TempDir;

use mailblaster_crypto::CredentialCipher;
use mailblaster_mail::Mailer;
use mailblaster_mail::testing::RecordingMailer;
use mailblaster_store::{GuildLocks, GuildStore};
use mailblaster_types::models::SenderAccount;

use crate::state::{AppState, AppStateInner, Settings};

pub struct Harness {
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    _dir: TempDir,
}

pub fn default_account() -> SenderAccount {
    SenderAccount {
        email: "bot@default.test".into(),
        password: "default-pass".into(),
        host: "smtp.default.test".into(),
        port: 465,
        use_ssl: true,
    }
}

pub async fn harness() -> Harness {
    harness_with(RecordingMailer::new()).await
}

pub async fn harness_with(mailer: RecordingMailer) -> Harness {
    let mailer = Arc::new(mailer);
    let (state, dir) = state_with(mailer.clone(), Settings::default()).await;
    Harness {
        state,
        mailer,
        _dir: dir,
    }
}

/// State over a fresh data directory; keep the `TempDir` alive with it.
pub async fn state_with(mailer: Arc<dyn Mailer>, settings: Settings) -> (AppState, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = GuildStore::open(
        dir.path().to_path_buf(),
        CredentialCipher::from_secret("api-test"),
        default_account(),
    )
    .await
    .unwrap();

    let state = Arc::new(AppStateInner {
        store: Arc::new(store),
        locks: GuildLocks::new(),
        mailer,
        settings,
    });
    (state, dir)
}
