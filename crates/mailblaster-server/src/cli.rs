use clap::{Parser, Subcommand};

use mailblaster_crypto::CredentialCipher;

use crate::config;

#[derive(Debug, Parser)]
#[command(
    name = "mailblaster",
    version,
    about = "Relays Discord announcements to email mailing lists",
    long_about = "Runs the bot when called without a subcommand. The encrypt and decrypt \
                  subcommands use MAILBLASTER_SECRET to prepare stored SMTP passwords."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Encrypt a password for MAILBLASTER_SMTP_PASSWORD
    Encrypt { text: String },
    /// Decrypt a value produced by `encrypt`
    Decrypt { text: String },
}

/// Run a utility subcommand and return the process exit code.
pub fn run(command: CliCommand) -> i32 {
    let secret = match config::load_secret() {
        Ok(secret) => secret,
        Err(e) => {
            eprintln!("{:#}", e);
            return 1;
        }
    };
    let cipher = CredentialCipher::from_secret(&secret);

    let result = match command {
        CliCommand::Encrypt { text } => cipher.encrypt(&text),
        CliCommand::Decrypt { text } => cipher.decrypt(&text),
    };
    match result {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            eprintln!("{}", e);
            1
        }
    }
}
