//! Outbound mail.
//!
//! The core only talks to the [`Mailer`] trait; [`SmtpMailer`] is the real
//! transport and `testing::RecordingMailer` the in-memory one.

pub mod address;
pub mod presets;
pub mod smtp;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

use async_trait::async_trait;

use mailblaster_types::models::SenderAccount;

pub use address::parse_address;
pub use smtp::SmtpMailer;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid email address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to build email: {0}")]
    Build(String),

    #[error("SMTP delivery failed: {0}")]
    Transport(String),
}

/// Sends one plain-text email from `account` to `to`.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        account: &SenderAccount,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), MailError>;
}
