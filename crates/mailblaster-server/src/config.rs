use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::Duration;

use mailblaster_api::Settings;
use mailblaster_crypto::CredentialCipher;
use mailblaster_types::models::SenderAccount;

/// Secrets that ship in sample env files and must never be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me", "change-me-to-a-random-string", "secret"];

/// Process configuration, read from the environment after `.env` is loaded.
#[derive(Debug)]
pub struct Config {
    pub discord_token: String,
    pub secret: String,
    pub data_dir: PathBuf,
    pub smtp_email: String,
    /// Encrypted with `mailblaster encrypt`.
    pub smtp_password: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_ssl: bool,
    pub default_subject: String,
    pub code_expiry_minutes: i64,
    pub relay_workers: usize,
    pub prune_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let required = |key: &str| -> Result<String> {
            match lookup(key) {
                Some(v) if !v.trim().is_empty() => Ok(v),
                _ => bail!("{} is not set", key),
            }
        };

        let code_expiry_minutes: i64 = var("MAILBLASTER_CODE_EXPIRY_MINUTES", "15")
            .parse()
            .context("MAILBLASTER_CODE_EXPIRY_MINUTES must be a number")?;
        if code_expiry_minutes <= 0 {
            bail!("MAILBLASTER_CODE_EXPIRY_MINUTES must be positive");
        }
        let relay_workers: usize = var("MAILBLASTER_RELAY_WORKERS", "4")
            .parse()
            .context("MAILBLASTER_RELAY_WORKERS must be a number")?;
        if relay_workers == 0 {
            bail!("MAILBLASTER_RELAY_WORKERS must be at least 1");
        }
        let prune_interval_secs: u64 = var("MAILBLASTER_PRUNE_INTERVAL_SECS", "3600")
            .parse()
            .context("MAILBLASTER_PRUNE_INTERVAL_SECS must be a number")?;
        if prune_interval_secs == 0 {
            bail!("MAILBLASTER_PRUNE_INTERVAL_SECS must be at least 1");
        }

        Ok(Self {
            discord_token: required("MAILBLASTER_DISCORD_TOKEN")?,
            secret: check_secret(lookup("MAILBLASTER_SECRET"))?,
            data_dir: var("MAILBLASTER_DATA_DIR", "./data").into(),
            smtp_email: required("MAILBLASTER_SMTP_EMAIL")?,
            smtp_password: required("MAILBLASTER_SMTP_PASSWORD")?,
            smtp_host: var("MAILBLASTER_SMTP_HOST", "smtp.gmail.com"),
            smtp_port: var("MAILBLASTER_SMTP_PORT", "465")
                .parse()
                .context("MAILBLASTER_SMTP_PORT must be a port number")?,
            smtp_ssl: parse_bool(&var("MAILBLASTER_SMTP_SSL", "true"))
                .context("MAILBLASTER_SMTP_SSL must be true or false")?,
            default_subject: var("MAILBLASTER_DEFAULT_SUBJECT", "Announcement"),
            code_expiry_minutes,
            relay_workers,
            prune_interval_secs,
        })
    }

    /// Decrypt the configured password into the fallback sender account.
    pub fn default_account(&self, cipher: &CredentialCipher) -> Result<SenderAccount> {
        let password = cipher
            .decrypt(&self.smtp_password)
            .context("MAILBLASTER_SMTP_PASSWORD could not be decrypted with MAILBLASTER_SECRET")?;
        Ok(SenderAccount {
            email: self.smtp_email.clone(),
            password,
            host: self.smtp_host.clone(),
            port: self.smtp_port,
            use_ssl: self.smtp_ssl,
        })
    }

    pub fn settings(&self) -> Settings {
        Settings {
            default_subject: self.default_subject.clone(),
            code_expiry: Duration::minutes(self.code_expiry_minutes),
            relay_workers: self.relay_workers,
        }
    }
}

/// Read only the encryption secret. Used by the CLI subcommands.
pub fn load_secret() -> Result<String> {
    check_secret(std::env::var("MAILBLASTER_SECRET").ok())
}

fn check_secret(secret: Option<String>) -> Result<String> {
    match secret {
        Some(s) if !s.is_empty() && !PLACEHOLDER_SECRETS.contains(&s.as_str()) => Ok(s),
        _ => bail!("MAILBLASTER_SECRET is unset or still a placeholder"),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        let mut map: HashMap<String, String> = [
            ("MAILBLASTER_DISCORD_TOKEN", "token"),
            ("MAILBLASTER_SECRET", "a-real-secret"),
            ("MAILBLASTER_SMTP_EMAIL", "bot@example.com"),
            ("MAILBLASTER_SMTP_PASSWORD", "ciphertext"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in pairs {
            map.insert(k.to_string(), v.to_string());
        }
        map
    }

    fn load(map: &HashMap<String, String>) -> Result<Config> {
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&env(&[])).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.smtp_host, "smtp.gmail.com");
        assert_eq!(config.smtp_port, 465);
        assert!(config.smtp_ssl);
        assert_eq!(config.default_subject, "Announcement");
        assert_eq!(config.settings().code_expiry, Duration::minutes(15));
        assert_eq!(config.relay_workers, 4);
        assert_eq!(config.prune_interval_secs, 3600);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&env(&[
            ("MAILBLASTER_SMTP_PORT", "587"),
            ("MAILBLASTER_SMTP_SSL", "false"),
            ("MAILBLASTER_RELAY_WORKERS", "8"),
        ]))
        .unwrap();
        assert_eq!(config.smtp_port, 587);
        assert!(!config.smtp_ssl);
        assert_eq!(config.settings().relay_workers, 8);
    }

    #[test]
    fn placeholder_secret_is_rejected() {
        assert!(load(&env(&[("MAILBLASTER_SECRET", "change-me")])).is_err());
        assert!(load(&env(&[("MAILBLASTER_SECRET", "")])).is_err());
    }

    #[test]
    fn missing_token_is_rejected() {
        let mut map = env(&[]);
        map.remove("MAILBLASTER_DISCORD_TOKEN");
        assert!(load(&map).is_err());
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        assert!(load(&env(&[("MAILBLASTER_SMTP_PORT", "70000")])).is_err());
        assert!(load(&env(&[("MAILBLASTER_RELAY_WORKERS", "0")])).is_err());
        assert!(load(&env(&[("MAILBLASTER_SMTP_SSL", "maybe")])).is_err());
    }

    #[test]
    fn default_account_decrypts_password() {
        let cipher = CredentialCipher::from_secret("a-real-secret");
        let encrypted = cipher.encrypt("app-password").unwrap();
        let config = load(&env(&[("MAILBLASTER_SMTP_PASSWORD", &encrypted)])).unwrap();

        let account = config.default_account(&cipher).unwrap();
        assert_eq!(account.password, "app-password");
        assert_eq!(account.email, "bot@example.com");

        let wrong = CredentialCipher::from_secret("other-secret");
        assert!(config.default_account(&wrong).is_err());
    }
}
