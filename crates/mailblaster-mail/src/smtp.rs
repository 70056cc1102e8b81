use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use mailblaster_types::models::SenderAccount;

use crate::{MailError, Mailer, parse_address};

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends through the account's own SMTP server.
///
/// `use_ssl` selects implicit TLS (usually port 465); otherwise the
/// connection upgrades with STARTTLS when the server offers it.
#[derive(Debug, Default, Clone)]
pub struct SmtpMailer;

impl SmtpMailer {
    pub fn new() -> Self {
        Self
    }

    fn transport(
        &self,
        account: &SenderAccount,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
        let tls_params = TlsParameters::new(account.host.clone())
            .map_err(|e| MailError::Transport(format!("TLS setup for {}: {}", account.host, e)))?;
        let tls = if account.use_ssl {
            Tls::Wrapper(tls_params)
        } else {
            Tls::Opportunistic(tls_params)
        };

        let creds = Credentials::new(account.email.clone(), account.password.clone());
        Ok(
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(account.host.as_str())
                .port(account.port)
                .tls(tls)
                .credentials(creds)
                .timeout(Some(SMTP_TIMEOUT))
                .build(),
        )
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(
        &self,
        account: &SenderAccount,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), MailError> {
        let from = Mailbox::new(None, parse_address(&account.email)?);
        let to = Mailbox::new(None, parse_address(to)?);

        let email = Message::builder()
            .from(from)
            .to(to.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport(account)?
            .send(email)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        debug!(to = %to, host = %account.host, "Email sent");
        Ok(())
    }
}
