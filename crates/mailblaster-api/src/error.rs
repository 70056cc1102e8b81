use mailblaster_mail::MailError;

/// Failures of mailing-list and configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ListError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("verification code expired")]
    CodeExpired,

    #[error("verification code does not match")]
    InvalidCode,

    #[error("administrator permission required")]
    PermissionDenied,

    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),

    #[error("email delivery failed: {0}")]
    Delivery(MailError),
}

impl From<MailError> for ListError {
    fn from(e: MailError) -> Self {
        match e {
            MailError::InvalidAddress { address, reason } => {
                Self::InvalidInput(format!(
                    "'{}' is not a valid email address ({})",
                    address, reason
                ))
            }
            other => Self::Delivery(other),
        }
    }
}

impl ListError {
    /// Text shown to the member who ran the command.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput(msg) => msg.clone(),
            Self::NotFound(msg) => msg.clone(),
            Self::CodeExpired => {
                "That verification code has expired. Run /mailadd again to get a new one.".into()
            }
            Self::InvalidCode => "That verification code is not correct.".into(),
            Self::PermissionDenied => "Only server administrators can use this command.".into(),
            Self::Storage(_) => {
                "Something went wrong saving this server's settings. Please try again later."
                    .into()
            }
            Self::Delivery(e) => format!("Could not send the email: {}", e),
        }
    }
}
