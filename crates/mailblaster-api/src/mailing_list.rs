use std::time::Duration as StdDuration;

use chrono::Utc;
use rand::Rng;
use tracing::{debug, info, warn};

use mailblaster_mail::parse_address;
use mailblaster_types::models::{GuildId, Subscriber, UserId, same_address};

use crate::error::ListError;
use crate::state::AppState;

const CODE_MIN: u32 = 100_000;
const CODE_MAX: u32 = 999_999;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Address was already verified; nothing was sent.
    AlreadyVerified,
    /// A code was emailed. `resent` is true when it replaced an older code.
    CodeSent { email: String, resent: bool },
}

/// Subscriber verification state machine for each guild.
///
/// `Pending(code)` becomes `Verified` on a matching `/verify`; a pending
/// record is removed when it expires or is removed explicitly. A verified
/// record never returns to pending.
#[derive(Clone)]
pub struct MailingList {
    state: AppState,
}

impl MailingList {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Register `email` for `guild_id` and mail it a verification code.
    pub async fn add(
        &self,
        guild_id: GuildId,
        email: &str,
        requested_by: UserId,
    ) -> Result<AddOutcome, ListError> {
        let email = parse_address(email)?.to_string();
        let code = generate_code();

        let (account, resent) = {
            let _guard = self.state.locks.lock(guild_id).await;
            let mut subs = self.state.store.load_subscribers(guild_id).await?;

            let resent = match subs.iter_mut().find(|s| same_address(&s.email, &email)) {
                Some(existing) if existing.is_verified() => {
                    debug!(guild_id, "Address already verified");
                    return Ok(AddOutcome::AlreadyVerified);
                }
                Some(existing) => {
                    let email = existing.email.clone();
                    *existing = Subscriber::pending(email, code, requested_by, Utc::now());
                    true
                }
                None => {
                    subs.push(Subscriber::pending(email.clone(), code, requested_by, Utc::now()));
                    false
                }
            };
            self.state.store.save_subscribers(guild_id, &subs).await?;

            let config = self.state.store.load(guild_id).await?;
            (self.state.store.resolve_account(&config).clone(), resent)
        };

        let minutes = self.state.settings.code_expiry.num_minutes();
        let body = format!(
            "Someone asked to add this address to a Discord server's announcement mailing list.\n\n\
             Your verification code is {code}\n\n\
             Run /verify {code} in that server within {minutes} minutes \
             to start receiving announcements. \
             If this wasn't you, ignore this email and the request will expire."
        );
        self.state
            .mailer
            .send(&account, &email, "Mailing list verification code", &body)
            .await?;

        info!(guild_id, resent, "Verification code sent");
        Ok(AddOutcome::CodeSent { email, resent })
    }

    /// Confirm the invoker's pending address with `code`.
    /// Returns the address that became verified.
    pub async fn verify(
        &self,
        guild_id: GuildId,
        requester: UserId,
        code: i64,
    ) -> Result<String, ListError> {
        let code = u32::try_from(code)
            .ok()
            .filter(|c| (CODE_MIN..=CODE_MAX).contains(c))
            .ok_or_else(|| {
                ListError::InvalidInput("Verification codes are 6-digit numbers.".into())
            })?;

        let _guard = self.state.locks.lock(guild_id).await;
        let mut subs = self.state.store.load_subscribers(guild_id).await?;

        // scoped so the iterator is not held across the await below
        let email = {
            let mut mine = subs
                .iter_mut()
                .filter(|s| s.is_pending() && s.requested_by == Some(requester))
                .peekable();
            if mine.peek().is_none() {
                return Err(ListError::NotFound(
                    "You have no pending email to verify. Run /mailadd first.".into(),
                ));
            }

            let sub = mine
                .find(|s| s.verification_code == Some(code))
                .ok_or(ListError::InvalidCode)?;
            if sub.is_expired(Utc::now(), self.state.settings.code_expiry) {
                return Err(ListError::CodeExpired);
            }

            sub.mark_verified();
            sub.email.clone()
        };
        self.state.store.save_subscribers(guild_id, &subs).await?;

        info!(guild_id, "Subscriber verified");
        Ok(email)
    }

    /// Delete `email` regardless of its status.
    pub async fn remove(&self, guild_id: GuildId, email: &str) -> Result<String, ListError> {
        let _guard = self.state.locks.lock(guild_id).await;
        let mut subs = self.state.store.load_subscribers(guild_id).await?;

        let index = subs
            .iter()
            .position(|s| same_address(&s.email, email))
            .ok_or_else(|| {
                ListError::NotFound(format!("{} is not on the mailing list.", email.trim()))
            })?;
        let removed = subs.remove(index);
        self.state.store.save_subscribers(guild_id, &subs).await?;

        info!(guild_id, "Subscriber removed");
        Ok(removed.email)
    }

    /// Verified addresses in list order.
    pub async fn list(&self, guild_id: GuildId) -> Result<Vec<String>, ListError> {
        Ok(self
            .subscribers(guild_id)
            .await?
            .into_iter()
            .filter(Subscriber::is_verified)
            .map(|s| s.email)
            .collect())
    }

    /// All records, pending included.
    pub async fn subscribers(&self, guild_id: GuildId) -> Result<Vec<Subscriber>, ListError> {
        let _guard = self.state.locks.lock(guild_id).await;
        Ok(self.state.store.load_subscribers(guild_id).await?)
    }

    /// Drop pending records whose code has expired. Returns how many went.
    pub async fn prune_expired(&self, guild_id: GuildId) -> Result<usize, ListError> {
        let _guard = self.state.locks.lock(guild_id).await;
        let mut subs = self.state.store.load_subscribers(guild_id).await?;

        let now = Utc::now();
        let expiry = self.state.settings.code_expiry;
        let before = subs.len();
        subs.retain(|s| !s.is_expired(now, expiry));
        let pruned = before - subs.len();

        if pruned > 0 {
            self.state.store.save_subscribers(guild_id, &subs).await?;
        }
        Ok(pruned)
    }

    pub async fn prune_all_expired(&self) -> Result<usize, ListError> {
        let mut total = 0;
        for guild_id in self.state.store.list_known_guild_ids().await? {
            match self.prune_expired(guild_id).await {
                Ok(n) => total += n,
                Err(e) => warn!(guild_id, error = %e, "Failed to prune expired subscribers"),
            }
        }
        Ok(total)
    }
}

/// Background task that removes expired pending subscribers on an interval.
pub async fn run_prune_loop(list: MailingList, interval_secs: u64) {
    let mut interval = tokio::time::interval(StdDuration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        match list.prune_all_expired().await {
            Ok(count) => {
                if count > 0 {
                    info!("Pruned {} expired pending subscribers", count);
                }
            }
            Err(e) => {
                warn!("Prune error: {}", e);
            }
        }
    }
}

fn generate_code() -> u32 {
    rand::rng().random_range(CODE_MIN..=CODE_MAX)
}
