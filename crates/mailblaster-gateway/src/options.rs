use std::collections::HashMap;

use serenity::all::{CommandDataOption, CommandDataOptionValue};

use mailblaster_types::events::SlashCommand;

/// Option values we accept, detached from serenity's types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    Channel(u64),
}

pub fn collect(options: &[CommandDataOption]) -> HashMap<String, OptionValue> {
    options
        .iter()
        .filter_map(|opt| {
            let value = match &opt.value {
                CommandDataOptionValue::String(s) => OptionValue::String(s.clone()),
                CommandDataOptionValue::Integer(i) => OptionValue::Integer(*i),
                CommandDataOptionValue::Boolean(b) => OptionValue::Boolean(*b),
                CommandDataOptionValue::Channel(id) => OptionValue::Channel(id.get()),
                _ => return None,
            };
            Some((opt.name.clone(), value))
        })
        .collect()
}

/// Build a typed command from its name and options. `Err` carries the text
/// shown to the user.
pub fn parse_command(
    name: &str,
    options: &HashMap<String, OptionValue>,
) -> Result<SlashCommand, String> {
    let args = Args { options };
    let command = match name {
        "setchannel" => SlashCommand::SetChannel {
            channel_id: args.channel("channel")?,
        },
        "maillist" => SlashCommand::MailList,
        "mailadd" => SlashCommand::MailAdd {
            email: args.string("email")?,
        },
        "mailremove" => SlashCommand::MailRemove {
            email: args.string("email")?,
        },
        "mailtest" => SlashCommand::MailTest,
        "subjectprefix" => SlashCommand::SubjectPrefix {
            prefix: args.optional_string("prefix")?,
        },
        "subjectdefault" => SlashCommand::SubjectDefault {
            subject: args.optional_string("subject")?,
        },
        "setup" => SlashCommand::Setup {
            email: args.string("email")?,
            password: args.string("password")?,
        },
        "setupadvanced" => SlashCommand::SetupAdvanced {
            email: args.string("email")?,
            password: args.string("password")?,
            hostname: args.string("hostname")?,
            port: args.integer("port")?,
            ssl: args.boolean("ssl")?,
        },
        "setupclear" => SlashCommand::SetupClear,
        "verify" => SlashCommand::Verify {
            code: args.integer("code")?,
        },
        "info" => SlashCommand::Info,
        other => return Err(format!("Unknown command /{}", other)),
    };
    Ok(command)
}

struct Args<'a> {
    options: &'a HashMap<String, OptionValue>,
}

impl Args<'_> {
    fn missing(name: &str) -> String {
        format!("Missing or invalid option '{}'", name)
    }

    fn optional_string(&self, name: &str) -> Result<Option<String>, String> {
        match self.options.get(name) {
            None => Ok(None),
            Some(OptionValue::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(Self::missing(name)),
        }
    }

    fn string(&self, name: &str) -> Result<String, String> {
        self.optional_string(name)?.ok_or_else(|| Self::missing(name))
    }

    fn integer(&self, name: &str) -> Result<i64, String> {
        match self.options.get(name) {
            Some(OptionValue::Integer(i)) => Ok(*i),
            _ => Err(Self::missing(name)),
        }
    }

    fn boolean(&self, name: &str) -> Result<bool, String> {
        match self.options.get(name) {
            Some(OptionValue::Boolean(b)) => Ok(*b),
            _ => Err(Self::missing(name)),
        }
    }

    fn channel(&self, name: &str) -> Result<u64, String> {
        match self.options.get(name) {
            Some(OptionValue::Channel(id)) => Ok(*id),
            _ => Err(Self::missing(name)),
        }
    }
}
