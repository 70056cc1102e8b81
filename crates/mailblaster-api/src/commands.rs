use tracing::{error, info, warn};

use mailblaster_mail::parse_address;
use mailblaster_mail::presets::preset_for;
use mailblaster_types::commands::Permission;
use mailblaster_types::events::{CommandInvocation, SlashCommand};
use mailblaster_types::models::{GuildConfig, GuildId, SenderAccount};

use crate::bridge::AnnouncementBridge;
use crate::error::ListError;
use crate::mailing_list::{AddOutcome, MailingList};
use crate::state::AppState;

/// Discord rejects message content longer than this.
pub const MAX_REPLY_LEN: usize = 2000;

/// Runs slash commands against the mailing list and guild config.
#[derive(Clone)]
pub struct CommandDispatcher {
    state: AppState,
    list: MailingList,
    bridge: AnnouncementBridge,
}

impl CommandDispatcher {
    pub fn new(state: AppState) -> Self {
        Self {
            list: MailingList::new(state.clone()),
            bridge: AnnouncementBridge::new(state.clone()),
            state,
        }
    }

    pub fn mailing_list(&self) -> &MailingList {
        &self.list
    }

    pub fn bridge(&self) -> &AnnouncementBridge {
        &self.bridge
    }

    /// Execute a command and render the reply text, success or not.
    pub async fn handle(&self, inv: &CommandInvocation) -> String {
        let name = inv.command.name();
        let reply = match self.execute(inv).await {
            Ok(reply) => reply,
            Err(e) => {
                if let ListError::Storage(_) = &e {
                    error!(guild_id = inv.guild_id, command = name, error = %e, "Command failed");
                } else {
                    info!(guild_id = inv.guild_id, command = name, error = %e, "Command rejected");
                }
                e.user_message()
            }
        };
        truncate_reply(reply)
    }

    pub async fn execute(&self, inv: &CommandInvocation) -> Result<String, ListError> {
        if inv.command.permission() == Permission::Administrator && !inv.is_admin {
            warn!(
                guild_id = inv.guild_id,
                user_id = inv.user_id,
                command = inv.command.name(),
                "Permission denied"
            );
            return Err(ListError::PermissionDenied);
        }

        let guild_id = inv.guild_id;
        match &inv.command {
            SlashCommand::SetChannel { channel_id } => {
                let channel_id = *channel_id;
                self.update_config(guild_id, |c| c.announcement_channel_id = Some(channel_id))
                    .await?;
                Ok(format!(
                    "Messages posted in <#{}> will now be emailed to the mailing list.",
                    channel_id
                ))
            }

            SlashCommand::MailList => {
                let subs = self.list.subscribers(guild_id).await?;
                let verified: Vec<&str> = subs
                    .iter()
                    .filter(|s| s.is_verified())
                    .map(|s| s.email.as_str())
                    .collect();
                let pending = subs.len() - verified.len();
                Ok(format_list(&verified, pending))
            }

            SlashCommand::MailAdd { email } => {
                let address = validate_email(email)?;
                match self.list.add(guild_id, &address, inv.user_id).await? {
                    AddOutcome::AlreadyVerified => {
                        Ok(format!("{} is already on the mailing list.", address))
                    }
                    AddOutcome::CodeSent { email, resent } => Ok(format!(
                        "{}verification code was sent to {}. \
                         Run /verify with that code within {} minutes.",
                        if resent { "A new " } else { "A " },
                        email,
                        self.state.settings.code_expiry.num_minutes()
                    )),
                }
            }

            SlashCommand::MailRemove { email } => {
                let address = validate_email(email)?;
                let removed = self.list.remove(guild_id, &address).await?;
                Ok(format!("{} was removed from the mailing list.", removed))
            }

            SlashCommand::Verify { code } => {
                let email = self.list.verify(guild_id, inv.user_id, *code).await?;
                Ok(format!("{} is verified and will now receive announcements.", email))
            }

            SlashCommand::MailTest => {
                let to = self.bridge.send_test(guild_id).await?;
                Ok(format!("A test email was sent to {}. Check that inbox.", to))
            }

            SlashCommand::SubjectPrefix { prefix } => {
                let prefix = non_blank(prefix);
                let reply = match &prefix {
                    Some(p) => format!("Email subjects will now start with \"{}\".", p),
                    None => "Email subjects will no longer have a prefix.".to_string(),
                };
                self.update_config(guild_id, |c| c.subject_prefix = prefix).await?;
                Ok(reply)
            }

            SlashCommand::SubjectDefault { subject } => {
                let subject = non_blank(subject);
                let reply = match &subject {
                    Some(s) => format!("Messages without a # subject line will use \"{}\".", s),
                    None => format!(
                        "Messages without a # subject line will use \"{}\".",
                        self.state.settings.default_subject
                    ),
                };
                self.update_config(guild_id, |c| c.default_subject = subject).await?;
                Ok(reply)
            }

            SlashCommand::Setup { email, password } => {
                let address = validate_email(email)?;
                let preset = preset_for(&address).ok_or_else(|| {
                    ListError::InvalidInput(format!(
                        "The mail server for {} is not known. Use /setupadvanced to enter it.",
                        address
                    ))
                })?;
                let account = SenderAccount {
                    email: address,
                    password: validate_password(password)?,
                    host: preset.host.to_string(),
                    port: preset.port,
                    use_ssl: preset.use_ssl,
                };
                self.set_sender(guild_id, account).await
            }

            SlashCommand::SetupAdvanced {
                email,
                password,
                hostname,
                port,
                ssl,
            } => {
                let account = SenderAccount {
                    email: validate_email(email)?,
                    password: validate_password(password)?,
                    host: validate_hostname(hostname)?,
                    port: validate_port(*port)?,
                    use_ssl: *ssl,
                };
                self.set_sender(guild_id, account).await
            }

            SlashCommand::SetupClear => {
                self.update_config(guild_id, GuildConfig::clear_sender).await?;
                Ok(format!(
                    "Custom email settings cleared. Emails will come from {}.",
                    self.state.store.default_account().email
                ))
            }

            SlashCommand::Info => self.info(guild_id).await,
        }
    }

    async fn set_sender(
        &self,
        guild_id: GuildId,
        account: SenderAccount,
    ) -> Result<String, ListError> {
        let reply = format!(
            "Emails will now come from {} via {}:{}. Run /mailtest to check the settings.",
            account.email, account.host, account.port
        );
        self.update_config(guild_id, |c| c.set_sender(account)).await?;
        Ok(reply)
    }

    /// Load, mutate and save a guild's config under its lock.
    async fn update_config<F>(&self, guild_id: GuildId, mutate: F) -> Result<(), ListError>
    where
        F: FnOnce(&mut GuildConfig),
    {
        let _guard = self.state.locks.lock(guild_id).await;
        let mut config = self.state.store.load(guild_id).await?;
        mutate(&mut config);
        self.state.store.save(guild_id, &config).await?;
        Ok(())
    }

    async fn info(&self, guild_id: GuildId) -> Result<String, ListError> {
        let config = {
            let _guard = self.state.locks.lock(guild_id).await;
            self.state.store.load(guild_id).await?
        };
        let subs = self.list.subscribers(guild_id).await?;
        let verified = subs.iter().filter(|s| s.is_verified()).count();

        let channel = config
            .announcement_channel_id
            .map(|id| format!("<#{}>", id))
            .unwrap_or_else(|| "not set (use /setchannel)".into());
        let default_email = &self.state.store.default_account().email;
        let sender = match (&config.sender_account, &config.sealed_account) {
            (Some(a), _) => format!("{} via {}:{} (ssl: {})", a.email, a.host, a.port, a.use_ssl),
            (None, Some(_)) => format!(
                "default account ({}); the saved account could not be decrypted, \
                 run /setup again",
                default_email
            ),
            (None, None) => format!("default account ({})", default_email),
        };
        let prefix = config.subject_prefix.as_deref().unwrap_or("none");
        let default_subject = config
            .default_subject
            .clone()
            .unwrap_or_else(|| format!("{} (built-in)", self.state.settings.default_subject));

        Ok(format!(
            "**Announcement channel:** {}\n\
             **Sender:** {}\n\
             **Subject prefix:** {}\n\
             **Default subject:** {}\n\
             **Subscribers:** {} verified, {} pending",
            channel,
            sender,
            prefix,
            default_subject,
            verified,
            subs.len() - verified
        ))
    }
}

fn validate_email(input: &str) -> Result<String, ListError> {
    Ok(parse_address(input)?.to_string())
}

fn validate_password(input: &str) -> Result<String, ListError> {
    if input.is_empty() {
        return Err(ListError::InvalidInput("The password cannot be empty.".into()));
    }
    Ok(input.to_string())
}

fn validate_hostname(input: &str) -> Result<String, ListError> {
    let host = input.trim();
    let valid = !host.is_empty()
        && host.len() <= 253
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if !valid {
        return Err(ListError::InvalidInput(format!(
            "'{}' is not a valid server hostname.",
            input
        )));
    }
    Ok(host.to_ascii_lowercase())
}

fn validate_port(port: i64) -> Result<u16, ListError> {
    u16::try_from(port)
        .ok()
        .filter(|p| *p > 0)
        .ok_or_else(|| ListError::InvalidInput(format!("{} is not a valid port (1-65535).", port)))
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Verified addresses, cut to fit one reply. The pending count is always kept.
fn format_list(verified: &[&str], pending: usize) -> String {
    let trailer = if pending > 0 {
        format!("\n{} awaiting verification.", pending)
    } else {
        String::new()
    };
    if verified.is_empty() {
        return format!("The mailing list is empty.{}", trailer);
    }

    let mut out = format!("**Mailing list ({}):**", verified.len());
    for (i, email) in verified.iter().enumerate() {
        let hidden = format!("\n...and {} more", verified.len() - i);
        if out.len() + 1 + email.len() + hidden.len() + trailer.len() > MAX_REPLY_LEN {
            out.push_str(&hidden);
            break;
        }
        out.push('\n');
        out.push_str(email);
    }
    out.push_str(&trailer);
    out
}

/// Cut `reply` on a char boundary to fit one message.
fn truncate_reply(reply: String) -> String {
    if reply.len() <= MAX_REPLY_LEN {
        return reply;
    }
    let mut end = MAX_REPLY_LEN - 3;
    while !reply.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &reply[..end])
}
