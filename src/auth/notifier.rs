//! Out-of-band delivery of password-reset tokens.

use std::sync::Arc;

use async_trait::async_trait;

use crate::email::SystemMailer;

/// Receives a freshly issued reset token for `email`. Delivery outcome is
/// not reported back to the caller.
#[async_trait]
pub trait ResetNotifier: Send + Sync {
    async fn send_reset_token(&self, email: &str, token: &str);
}

/// Emails a reset link through the system SMTP relay.
pub struct MailNotifier {
    mailer: Arc<SystemMailer>,
    base_url: String,
}

impl MailNotifier {
    pub fn new(mailer: Arc<SystemMailer>, base_url: &str) -> Self {
        Self {
            mailer,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ResetNotifier for MailNotifier {
    async fn send_reset_token(&self, email: &str, token: &str) {
        let mailer = self.mailer.clone();
        let to = email.to_string();
        let reset_url = format!("{}/reset-password?token={token}", self.base_url);

        tokio::spawn(async move {
            if let Err(e) = mailer.send_password_reset(&to, &reset_url).await {
                tracing::error!("Failed to send password reset email: {e}");
            }
        });
    }
}

/// Fallback when SMTP is not configured: the token only reaches the server log.
pub struct LogNotifier;

#[async_trait]
impl ResetNotifier for LogNotifier {
    async fn send_reset_token(&self, email: &str, token: &str) {
        tracing::warn!("System SMTP not configured. Password reset token for {email}: {token}");
    }
}
