//! Slash-command catalog. The gateway registers these; the core enforces
//! the permission tier independently of what the chat platform allows.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Configuration and listing
    Administrator,
    /// Self-service subscribe, unsubscribe, verify
    Member,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    String,
    Integer,
    Boolean,
    Channel,
}

#[derive(Debug, Clone, Copy)]
pub struct OptionSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: OptionKind,
    pub required: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub permission: Permission,
    pub options: &'static [OptionSpec],
}

const fn opt(
    name: &'static str,
    description: &'static str,
    kind: OptionKind,
    required: bool,
) -> OptionSpec {
    OptionSpec { name, description, kind, required }
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "setchannel",
        description: "Sets the announcement channel to listen to",
        permission: Permission::Administrator,
        options: &[opt("channel", "The announcement channel", OptionKind::Channel, true)],
    },
    CommandSpec {
        name: "maillist",
        description: "Lists all emails on the mailing list",
        permission: Permission::Administrator,
        options: &[],
    },
    CommandSpec {
        name: "mailadd",
        description: "Adds an email to the mailing list",
        permission: Permission::Member,
        options: &[opt("email", "The email to add to the mailing list", OptionKind::String, true)],
    },
    CommandSpec {
        name: "mailremove",
        description: "Removes an email from the mailing list",
        permission: Permission::Member,
        options: &[opt(
            "email",
            "The email to remove from the mailing list",
            OptionKind::String,
            true,
        )],
    },
    CommandSpec {
        name: "mailtest",
        description: "Tests whether the setup run by /setup or /setupadvanced is functioning correctly",
        permission: Permission::Administrator,
        options: &[],
    },
    CommandSpec {
        name: "subjectprefix",
        description: "Sets the subject prefix to use in emails",
        permission: Permission::Administrator,
        options: &[opt("prefix", "The prefix to use in emails", OptionKind::String, false)],
    },
    CommandSpec {
        name: "subjectdefault",
        description: "Sets the default subject to use if the first line in an announcement message doesn't start with a #",
        permission: Permission::Administrator,
        options: &[opt(
            "subject",
            "The default subject to use if none is provided by a message",
            OptionKind::String,
            false,
        )],
    },
    CommandSpec {
        name: "setup",
        description: "Sets email to come from a different email account",
        permission: Permission::Administrator,
        options: &[
            opt("email", "The email address messages will come from", OptionKind::String, true),
            opt("password", "The password of the email account", OptionKind::String, true),
        ],
    },
    CommandSpec {
        name: "setupadvanced",
        description: "Sets email to come from a different email account, with settings for unrecognized email domains",
        permission: Permission::Administrator,
        options: &[
            opt("email", "The email address messages will come from", OptionKind::String, true),
            opt("password", "The password of the email account", OptionKind::String, true),
            opt(
                "hostname",
                "The server address of the email service (e.g. smtp.gmail.com)",
                OptionKind::String,
                true,
            ),
            opt("port", "The port for email traffic (e.g. 25)", OptionKind::Integer, true),
            opt("ssl", "Whether or not the email service uses SSL", OptionKind::Boolean, true),
        ],
    },
    CommandSpec {
        name: "setupclear",
        description: "Clears the email configuration and uses the default email",
        permission: Permission::Administrator,
        options: &[],
    },
    CommandSpec {
        name: "verify",
        description: "Verifies that you are in control of an email to perform an action on it",
        permission: Permission::Member,
        options: &[opt(
            "code",
            "The verification code received in your email",
            OptionKind::Integer,
            true,
        )],
    },
    CommandSpec {
        name: "info",
        description: "Shows the current configuration for this server",
        permission: Permission::Administrator,
        options: &[],
    },
];

pub fn find(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::SlashCommand;

    #[test]
    fn catalog_names_are_unique() {
        for (i, a) in COMMANDS.iter().enumerate() {
            for b in &COMMANDS[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
        assert_eq!(COMMANDS.len(), 12);
    }

    #[test]
    fn member_tier_is_self_service_only() {
        let members: Vec<&str> = COMMANDS
            .iter()
            .filter(|c| c.permission == Permission::Member)
            .map(|c| c.name)
            .collect();
        assert_eq!(members, vec!["mailadd", "mailremove", "verify"]);
    }

    #[test]
    fn command_permission_comes_from_catalog() {
        assert_eq!(SlashCommand::Verify { code: 1 }.permission(), Permission::Member);
        assert_eq!(SlashCommand::Info.permission(), Permission::Administrator);
    }
}
