//! Email adapters.

use async_trait::async_trait;

use crate::domain::{EmailError, EmailSender};

/// Writes the verification link to the log instead of sending mail.
///
/// Stands in for an SMTP transport in development and tests.
#[derive(Debug, Default)]
pub struct LogEmailSender;

impl LogEmailSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send_verification_email(
        &self,
        email: &str,
        verification_link: &str,
    ) -> Result<(), EmailError> {
        if email.is_empty() {
            return Err(EmailError::Delivery("empty recipient".to_string()));
        }
        tracing::info!(
            email = %email,
            link = %verification_link,
            "verification email"
        );
        Ok(())
    }
}
