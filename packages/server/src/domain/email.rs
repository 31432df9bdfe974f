//! Outbound email port.

use async_trait::async_trait;

use super::EmailError;

/// Delivery of account emails. Only the verification mail exists today.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send `verification_link` to `email`
    async fn send_verification_email(
        &self,
        email: &str,
        verification_link: &str,
    ) -> Result<(), EmailError>;
}
