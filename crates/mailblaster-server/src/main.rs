mod cli;
mod config;

use std::sync::Arc;

use clap::Parser;
use serenity::Client;
use tracing::{info, warn};

use mailblaster_api::mailing_list::run_prune_loop;
use mailblaster_api::{AppStateInner, CommandDispatcher};
use mailblaster_crypto::CredentialCipher;
use mailblaster_gateway::{EventDispatcher, MailblasterHandler};
use mailblaster_mail::SmtpMailer;
use mailblaster_store::{GuildLocks, GuildReaper, GuildStore};

use crate::cli::Cli;
use crate::config::Config;

const DEFAULT_LOG_FILTER: &str = "mailblaster=info,mailblaster_api=info,\
                                  mailblaster_gateway=info,mailblaster_store=info,serenity=warn";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    if let Some(command) = cli.command {
        std::process::exit(cli::run(command));
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {:#}", e);
            eprintln!("       Set it in your .env file and restart.");
            std::process::exit(1);
        }
    };

    let cipher = CredentialCipher::from_secret(&config.secret);
    let default_account = config.default_account(&cipher)?;
    info!(
        sender = %default_account.email,
        host = %default_account.host,
        "Default SMTP account loaded"
    );

    let store = Arc::new(GuildStore::open(config.data_dir.clone(), cipher, default_account).await?);

    let locks = GuildLocks::new();
    let state = Arc::new(AppStateInner {
        store: store.clone(),
        locks: locks.clone(),
        mailer: Arc::new(SmtpMailer::new()),
        settings: config.settings(),
    });

    let commands = CommandDispatcher::new(state);
    tokio::spawn(run_prune_loop(
        commands.mailing_list().clone(),
        config.prune_interval_secs,
    ));

    let events = EventDispatcher::new(commands, GuildReaper::new(store, locks));
    let mut client = Client::builder(&config.discord_token, MailblasterHandler::intents())
        .event_handler(MailblasterHandler::new(events))
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shard_manager.shutdown_all().await;
    });

    info!("Mailblaster starting");
    client.start().await?;
    info!("Mailblaster stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                let _ = ctrl_c.await;
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        info!("Received Ctrl+C, shutting down...");
    }
}
