use crate::commands::Permission;
use crate::models::{ChannelId, GuildId, UserId};

/// Events handed from the chat gateway to the core, as plain data.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    /// A message was posted in some guild channel
    MessageReceived(ChannelMessage),

    /// A member ran one of our slash commands
    CommandInvoked(CommandInvocation),

    /// The bot was removed from a guild
    GuildRemoved { guild_id: GuildId },
}

#[derive(Debug, Clone)]
pub struct ChannelMessage {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub author_is_bot: bool,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct CommandInvocation {
    pub guild_id: GuildId,
    pub user_id: UserId,
    /// Whether the invoker holds administrator-tier permissions in the guild.
    pub is_admin: bool,
    pub command: SlashCommand,
}

/// A slash command with its typed option values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    SetChannel { channel_id: ChannelId },
    MailList,
    MailAdd { email: String },
    MailRemove { email: String },
    MailTest,
    SubjectPrefix { prefix: Option<String> },
    SubjectDefault { subject: Option<String> },
    Setup { email: String, password: String },
    SetupAdvanced {
        email: String,
        password: String,
        hostname: String,
        port: i64,
        ssl: bool,
    },
    SetupClear,
    Verify { code: i64 },
    Info,
}

impl SlashCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetChannel { .. } => "setchannel",
            Self::MailList => "maillist",
            Self::MailAdd { .. } => "mailadd",
            Self::MailRemove { .. } => "mailremove",
            Self::MailTest => "mailtest",
            Self::SubjectPrefix { .. } => "subjectprefix",
            Self::SubjectDefault { .. } => "subjectdefault",
            Self::Setup { .. } => "setup",
            Self::SetupAdvanced { .. } => "setupadvanced",
            Self::SetupClear => "setupclear",
            Self::Verify { .. } => "verify",
            Self::Info => "info",
        }
    }

    /// Required tier, looked up from the command catalog.
    pub fn permission(&self) -> Permission {
        crate::commands::find(self.name())
            .map(|spec| spec.permission)
            .unwrap_or(Permission::Administrator)
    }
}
