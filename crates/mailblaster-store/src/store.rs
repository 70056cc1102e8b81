use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use mailblaster_crypto::CredentialCipher;
use mailblaster_types::models::{GuildConfig, GuildId, SealedAccount, SenderAccount, Subscriber};

use crate::subscribers;

pub const CONFIG_SUFFIX: &str = "-config.json";
pub const SUBSCRIBERS_SUFFIX: &str = "-subscribers.txt";

/// On-disk shape of a guild's config. The password is cipher output.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    announcement_channel_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sender_account: Option<StoredAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subject_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_subject: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredAccount {
    email: String,
    password: String,
    host: String,
    port: u16,
    use_ssl: bool,
}

/// Per-guild config and subscriber files under one data directory.
///
/// Each guild owns `{guild_id}-config.json` and `{guild_id}-subscribers.txt`.
/// Files are created lazily on first save; writes replace the target
/// atomically via a synced temporary file and a rename.
pub struct GuildStore {
    dir: PathBuf,
    cipher: CredentialCipher,
    default_account: SenderAccount,
}

impl GuildStore {
    pub async fn open(
        dir: PathBuf,
        cipher: CredentialCipher,
        default_account: SenderAccount,
    ) -> Result<Self> {
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating data directory {}", dir.display()))?;
        info!("Guild data directory: {}", dir.display());
        Ok(Self {
            dir,
            cipher,
            default_account,
        })
    }

    pub fn config_path(&self, guild_id: GuildId) -> PathBuf {
        self.dir.join(format!("{}{}", guild_id, CONFIG_SUFFIX))
    }

    pub fn subscribers_path(&self, guild_id: GuildId) -> PathBuf {
        self.dir.join(format!("{}{}", guild_id, SUBSCRIBERS_SUFFIX))
    }

    pub fn default_account(&self) -> &SenderAccount {
        &self.default_account
    }

    /// The guild's override if complete, else the process-wide default.
    pub fn resolve_account<'a>(&'a self, config: &'a GuildConfig) -> &'a SenderAccount {
        match &config.sender_account {
            Some(account) if account.is_complete() => account,
            _ => &self.default_account,
        }
    }

    /// Missing file means an unconfigured guild, not an error.
    pub async fn load(&self, guild_id: GuildId) -> Result<GuildConfig> {
        let path = self.config_path(guild_id);
        let Some(bytes) = read_if_exists(&path).await? else {
            return Ok(GuildConfig::default());
        };

        let stored: StoredConfig = serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing {}", path.display()))?;

        let mut sender_account = None;
        let mut sealed_account = None;
        if let Some(account) = stored.sender_account {
            match self.cipher.decrypt(&account.password) {
                Ok(password) => {
                    sender_account = Some(SenderAccount {
                        email: account.email,
                        password,
                        host: account.host,
                        port: account.port,
                        use_ssl: account.use_ssl,
                    })
                }
                Err(e) => {
                    warn!(
                        guild_id,
                        error = %e,
                        "Stored sender password could not be decrypted; using default account"
                    );
                    sealed_account = Some(SealedAccount(serde_json::to_string(&account)?));
                }
            }
        }

        Ok(GuildConfig {
            announcement_channel_id: stored.announcement_channel_id,
            sender_account,
            subject_prefix: stored.subject_prefix,
            default_subject: stored.default_subject,
            sealed_account,
        })
    }

    pub async fn save(&self, guild_id: GuildId, config: &GuildConfig) -> Result<()> {
        let sender_account = match &config.sender_account {
            Some(account) => {
                if !account.is_complete() {
                    bail!(
                        "sender account override for guild {} is incomplete",
                        guild_id
                    );
                }
                Some(StoredAccount {
                    email: account.email.clone(),
                    password: self.cipher.encrypt(&account.password)?,
                    host: account.host.clone(),
                    port: account.port,
                    use_ssl: account.use_ssl,
                })
            }
            None => match &config.sealed_account {
                Some(sealed) => Some(
                    serde_json::from_str(&sealed.0)
                        .context("sealed sender account is not a stored account")?,
                ),
                None => None,
            },
        };

        let stored = StoredConfig {
            announcement_channel_id: config.announcement_channel_id,
            sender_account,
            subject_prefix: config.subject_prefix.clone(),
            default_subject: config.default_subject.clone(),
        };

        let json = serde_json::to_vec_pretty(&stored)?;
        self.write_atomic(&self.config_path(guild_id), &json).await?;
        debug!(guild_id, "Saved guild config");
        Ok(())
    }

    pub async fn load_subscribers(&self, guild_id: GuildId) -> Result<Vec<Subscriber>> {
        let path = self.subscribers_path(guild_id);
        let Some(bytes) = read_if_exists(&path).await? else {
            return Ok(Vec::new());
        };
        let text = String::from_utf8(bytes)
            .with_context(|| format!("{} is not valid UTF-8", path.display()))?;
        Ok(subscribers::decode(&text))
    }

    pub async fn save_subscribers(&self, guild_id: GuildId, subs: &[Subscriber]) -> Result<()> {
        let text = subscribers::encode(subs);
        self.write_atomic(&self.subscribers_path(guild_id), text.as_bytes())
            .await?;
        debug!(guild_id, count = subs.len(), "Saved subscriber list");
        Ok(())
    }

    /// Guild ids owning at least one artifact, derived from file names only.
    pub async fn list_known_guild_ids(&self) -> Result<BTreeSet<GuildId>> {
        let mut ids = BTreeSet::new();
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let is_file = match entry.file_type().await {
                Ok(ft) => ft.is_file(),
                Err(_) => false,
            };
            if !is_file {
                continue;
            }
            if let Some(id) = entry.file_name().to_str().and_then(parse_artifact_name) {
                ids.insert(id);
            }
        }
        Ok(ids)
    }

    /// Remove one file, treating "already gone" as success.
    /// Returns whether a file was actually deleted.
    pub(crate) async fn delete_artifact(&self, path: &Path) -> Result<bool> {
        match fs::remove_file(path).await {
            Ok(()) => {
                info!("Deleted {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Scratch file a write to `target` goes through.
    pub(crate) fn temp_path(&self, target: &Path) -> Option<PathBuf> {
        let file_name = target.file_name()?.to_str()?;
        Some(self.dir.join(format!(".{}.tmp", file_name)))
    }

    async fn write_atomic(&self, target: &Path, contents: &[u8]) -> Result<()> {
        let tmp = self
            .temp_path(target)
            .with_context(|| format!("invalid artifact path {}", target.display()))?;

        let mut file = fs::File::create(&tmp)
            .await
            .with_context(|| format!("creating {}", tmp.display()))?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp, target)
            .await
            .with_context(|| format!("replacing {}", target.display()))?;
        self.sync_dir().await
    }

    /// Persist the rename itself.
    #[cfg(unix)]
    async fn sync_dir(&self) -> Result<()> {
        fs::File::open(&self.dir)
            .await?
            .sync_all()
            .await
            .with_context(|| format!("syncing {}", self.dir.display()))
    }

    #[cfg(not(unix))]
    async fn sync_dir(&self) -> Result<()> {
        Ok(())
    }
}

/// `123-config.json` -> `Some(123)`. Anything else -> `None`.
pub fn parse_artifact_name(name: &str) -> Option<GuildId> {
    let stem = name
        .strip_suffix(CONFIG_SUFFIX)
        .or_else(|| name.strip_suffix(SUBSCRIBERS_SUFFIX))?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

async fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(anyhow::Error::new(e).context(format!("reading {}", path.display()))),
    }
}
