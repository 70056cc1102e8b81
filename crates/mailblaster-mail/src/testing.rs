use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::Mutex;

use mailblaster_types::models::SenderAccount;

use crate::{MailError, Mailer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Records every send instead of talking to a server. Recipients listed in
/// `failing` get a transport error.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
    failing: HashSet<String>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for<I, S>(recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: recipients.into_iter().map(Into::into).collect(),
        }
    }

    pub async fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_to(&self, to: &str) -> Vec<SentMail> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|m| m.to == to)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        account: &SenderAccount,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), MailError> {
        if self.failing.contains(to) {
            return Err(MailError::Transport(format!("550 mailbox unavailable: {}", to)));
        }
        self.sent.lock().await.push(SentMail {
            from: account.email.clone(),
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
