use std::collections::HashSet;

use serenity::{
    all::{
        CommandInteraction, Context, EditInteractionResponse, EventHandler, GatewayIntents, Guild,
        Interaction, Message, Ready, UnavailableGuild,
    },
    async_trait,
};
use tracing::{debug, info, warn};

use mailblaster_types::events::{ChannelMessage, CommandInvocation, InboundEvent};
use mailblaster_types::models::GuildId;

use crate::dispatcher::EventDispatcher;
use crate::options;
use crate::registry;

/// Handler for Discord gateway events.
pub struct MailblasterHandler {
    events: EventDispatcher,
}

impl MailblasterHandler {
    pub fn new(events: EventDispatcher) -> Self {
        Self { events }
    }

    /// Required gateway intents for the bot.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
    }

    async fn handle_command(&self, ctx: &Context, command: CommandInteraction) {
        // commands are registered guild-only
        let Some(guild_id) = command.guild_id else {
            return;
        };

        // SMTP can take longer than the interaction deadline
        if let Err(e) = command.defer_ephemeral(&ctx.http).await {
            warn!(error = %e, command = %command.data.name, "failed to defer interaction");
            return;
        }

        let values = options::collect(&command.data.options);
        let parsed = options::parse_command(&command.data.name, &values);
        let reply = match parsed {
            Ok(slash) => {
                let is_admin = command
                    .member
                    .as_ref()
                    .and_then(|m| m.permissions)
                    .is_some_and(|p| p.administrator() || p.manage_guild());
                let invocation = CommandInvocation {
                    guild_id: guild_id.get(),
                    user_id: command.user.id.get(),
                    is_admin,
                    command: slash,
                };
                self.events
                    .dispatch(InboundEvent::CommandInvoked(invocation))
                    .await
                    .unwrap_or_default()
            }
            Err(msg) => msg,
        };

        if let Err(e) = command
            .edit_response(&ctx.http, EditInteractionResponse::new().content(reply))
            .await
        {
            warn!(error = %e, command = %command.data.name, "failed to send command response");
        }
    }
}

#[async_trait]
impl EventHandler for MailblasterHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            "discord bot ready"
        );

        if let Err(e) = registry::register_all(&ctx.http).await {
            warn!(error = %e, "failed to register slash commands");
        }

        // The bot may have been removed from guilds while offline
        let active: HashSet<GuildId> = ready.guilds.iter().map(|g| g.id.get()).collect();
        self.events.reap_departed(&active).await;
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        let Some(guild_id) = msg.guild_id else {
            return;
        };

        let event = InboundEvent::MessageReceived(ChannelMessage {
            guild_id: guild_id.get(),
            channel_id: msg.channel_id.get(),
            author_is_bot: msg.author.bot,
            content: msg.content,
        });
        self.events.dispatch(event).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            self.handle_command(&ctx, command).await;
        }
    }

    async fn guild_delete(
        &self,
        _ctx: Context,
        incomplete: UnavailableGuild,
        _full: Option<Guild>,
    ) {
        // An outage also marks guilds unavailable; only a real removal reaps
        if incomplete.unavailable {
            debug!(guild_id = %incomplete.id, "guild became unavailable");
            return;
        }
        self.events
            .dispatch(InboundEvent::GuildRemoved {
                guild_id: incomplete.id.get(),
            })
            .await;
    }
}
