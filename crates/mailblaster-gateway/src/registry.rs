use std::sync::Arc;

use serenity::all::{
    ChannelType, Command, CommandOptionType, CreateCommand, CreateCommandOption, Http, Permissions,
};
use tracing::info;

use mailblaster_types::commands::{COMMANDS, CommandSpec, OptionKind, Permission};

/// Build the serenity command for one catalog entry. Administrator-tier
/// commands are hidden from members by default; the core still checks.
pub fn build(spec: &CommandSpec) -> CreateCommand {
    let mut command = CreateCommand::new(spec.name)
        .description(spec.description)
        .dm_permission(false);

    if spec.permission == Permission::Administrator {
        command = command.default_member_permissions(Permissions::ADMINISTRATOR);
    }

    for opt in spec.options {
        let kind = match opt.kind {
            OptionKind::String => CommandOptionType::String,
            OptionKind::Integer => CommandOptionType::Integer,
            OptionKind::Boolean => CommandOptionType::Boolean,
            OptionKind::Channel => CommandOptionType::Channel,
        };
        let mut option =
            CreateCommandOption::new(kind, opt.name, opt.description).required(opt.required);
        if opt.kind == OptionKind::Channel {
            option = option.channel_types(vec![ChannelType::Text, ChannelType::News]);
        }
        command = command.add_option(option);
    }

    command
}

/// Replace the bot's global command set with the catalog.
pub async fn register_all(http: &Arc<Http>) -> anyhow::Result<()> {
    let commands: Vec<CreateCommand> = COMMANDS.iter().map(build).collect();
    let registered = Command::set_global_commands(http, commands).await?;
    info!(count = registered.len(), "Registered slash commands");
    Ok(())
}
