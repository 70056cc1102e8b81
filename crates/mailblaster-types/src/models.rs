use std::fmt;

use chrono::{DateTime, Duration, Utc};

/// Discord snowflakes are 64-bit; guilds, channels and users share the type.
pub type GuildId = u64;
pub type ChannelId = u64;
pub type UserId = u64;

/// Per-guild settings. Everything is optional until an administrator sets it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuildConfig {
    pub announcement_channel_id: Option<ChannelId>,
    pub sender_account: Option<SenderAccount>,
    pub subject_prefix: Option<String>,
    pub default_subject: Option<String>,
    /// Stored override that could not be decrypted. Saved back untouched so
    /// a wrong secret never erases it; only a new or cleared sender replaces it.
    pub sealed_account: Option<SealedAccount>,
}

impl GuildConfig {
    pub fn set_sender(&mut self, account: SenderAccount) {
        self.sender_account = Some(account);
        self.sealed_account = None;
    }

    pub fn clear_sender(&mut self) {
        self.sender_account = None;
        self.sealed_account = None;
    }
}

/// Opaque on-disk form of a sender account, as the store wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedAccount(pub String);

/// SMTP credentials used to send mail on behalf of a guild.
///
/// `password` is always plaintext in memory; only the store sees it encrypted.
#[derive(Clone, PartialEq, Eq)]
pub struct SenderAccount {
    pub email: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub use_ssl: bool,
}

impl SenderAccount {
    /// All five fields must be populated for an override to be usable.
    pub fn is_complete(&self) -> bool {
        !self.email.is_empty()
            && !self.password.is_empty()
            && !self.host.is_empty()
            && self.port > 0
    }
}

impl fmt::Debug for SenderAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderAccount")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_ssl", &self.use_ssl)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberStatus {
    Pending,
    Verified,
}

impl SubscriberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "verified" => Some(Self::Verified),
            _ => None,
        }
    }
}

/// One address on a guild's mailing list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    pub email: String,
    pub status: SubscriberStatus,
    /// Present only while pending.
    pub verification_code: Option<u32>,
    pub requested_at: Option<DateTime<Utc>>,
    /// Member who ran `/mailadd`; `/verify` only matches their own records.
    pub requested_by: Option<UserId>,
}

impl Subscriber {
    pub fn pending(email: String, code: u32, requested_by: UserId, now: DateTime<Utc>) -> Self {
        Self {
            email,
            status: SubscriberStatus::Pending,
            verification_code: Some(code),
            requested_at: Some(now),
            requested_by: Some(requested_by),
        }
    }

    pub fn verified(email: String) -> Self {
        Self {
            email,
            status: SubscriberStatus::Verified,
            verification_code: None,
            requested_at: None,
            requested_by: None,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.status == SubscriberStatus::Verified
    }

    pub fn is_pending(&self) -> bool {
        self.status == SubscriberStatus::Pending
    }

    /// A pending record with no timestamp is treated as already expired.
    pub fn is_expired(&self, now: DateTime<Utc>, expiry: Duration) -> bool {
        match (self.status, self.requested_at) {
            (SubscriberStatus::Verified, _) => false,
            (SubscriberStatus::Pending, Some(at)) => now - at > expiry,
            (SubscriberStatus::Pending, None) => true,
        }
    }

    /// Transition `Pending -> Verified`, clearing the code.
    pub fn mark_verified(&mut self) {
        self.status = SubscriberStatus::Verified;
        self.verification_code = None;
        self.requested_at = None;
        self.requested_by = None;
    }
}

/// Addresses are unique per guild ignoring ASCII case and surrounding space.
pub fn same_address(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_expiry_window() {
        let now = Utc::now();
        let sub = Subscriber::pending("a@x.com".into(), 123456, 7, now - Duration::minutes(20));
        assert!(sub.is_expired(now, Duration::minutes(15)));
        assert!(!sub.is_expired(now, Duration::minutes(30)));
    }

    #[test]
    fn verified_never_expires() {
        let sub = Subscriber::verified("a@x.com".into());
        assert!(!sub.is_expired(Utc::now(), Duration::zero()));
    }

    #[test]
    fn mark_verified_clears_code() {
        let mut sub = Subscriber::pending("a@x.com".into(), 42, 7, Utc::now());
        sub.mark_verified();
        assert!(sub.is_verified());
        assert_eq!(sub.verification_code, None);
        assert_eq!(sub.requested_by, None);
    }

    #[test]
    fn new_sender_replaces_sealed_account() {
        let mut config = GuildConfig {
            sealed_account: Some(SealedAccount("{}".into())),
            ..Default::default()
        };
        config.set_sender(SenderAccount {
            email: "bot@x.com".into(),
            password: "pw".into(),
            host: "smtp.x.com".into(),
            port: 465,
            use_ssl: true,
        });
        assert_eq!(config.sealed_account, None);

        config.sealed_account = Some(SealedAccount("{}".into()));
        config.clear_sender();
        assert_eq!(config, GuildConfig::default());
    }

    #[test]
    fn sender_debug_hides_password() {
        let account = SenderAccount {
            email: "bot@x.com".into(),
            password: "hunter2".into(),
            host: "smtp.x.com".into(),
            port: 465,
            use_ssl: true,
        };
        assert!(!format!("{:?}", account).contains("hunter2"));
        assert!(account.is_complete());
    }
}
