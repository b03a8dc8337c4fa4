pub mod templates;

use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;

/// SMTP relay used for account mail. Only password-reset links go out.
pub struct SystemMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SystemMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, String> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| format!("Invalid SKILLTRACK_SMTP_FROM address: {e}"))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| format!("System SMTP error: {e}"))?
            .port(config.port)
            .credentials(Credentials::new(config.user.clone(), config.pass.clone()))
            .build();

        Ok(Self { transport, from })
    }

    pub async fn send_password_reset(&self, to_email: &str, reset_url: &str) -> Result<(), String> {
        let to: Mailbox = to_email
            .parse()
            .map_err(|e| format!("Invalid recipient address: {e}"))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject("Reset your SkillTrack password")
            .multipart(MultiPart::alternative_plain_html(
                templates::password_reset_text(reset_url),
                templates::password_reset_html(reset_url),
            ))
            .map_err(|e| format!("Failed to build reset email: {e}"))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| format!("Failed to send reset email: {e}"))?;

        tracing::debug!("Password reset email handed to SMTP relay");
        Ok(())
    }
}
