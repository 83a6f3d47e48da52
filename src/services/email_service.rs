use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::MailConfig;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("invalid email address: {0}")]
    InvalidAddress(String),
}

/// Outbound mail collaborator used by registration and login.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError>;
}

#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    pub fn new(
        host: &str,
        port: u16,
        username: String,
        password: String,
        from_address: String,
    ) -> Result<Self, EmailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
            .port(port)
            .credentials(Credentials::new(username, password))
            .build();
        Ok(Self {
            transport,
            from_address,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError> {
        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        self.transport.send(message).await?;
        tracing::info!(to = %to, subject = %subject, "email sent");
        Ok(())
    }
}

/// Stand-in used when SMTP is not configured: the message is only logged.
#[derive(Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError> {
        tracing::warn!(to = %to, subject = %subject, "SMTP not configured, email not delivered");
        tracing::debug!(body = %body, "undelivered email body");
        Ok(())
    }
}

/// Pick the transport from configuration.
pub fn mailer_from_config(config: &MailConfig) -> Result<Box<dyn Mailer>, EmailError> {
    match &config.smtp {
        Some(smtp) => {
            let mailer = SmtpMailer::new(
                &smtp.host,
                smtp.port,
                smtp.username.clone(),
                smtp.password.expose_secret().to_string(),
                config.from_address.clone(),
            )?;
            Ok(Box::new(mailer))
        }
        None => Ok(Box::new(LogMailer)),
    }
}

pub fn welcome_email(name: &str, email: &str, phone: &str) -> (String, String) {
    let subject = "Welcome to Nexus Store!".to_string();
    let body = format!(
        "Hi {name},\n\n\
         Welcome to Nexus Store! We're thrilled to have you join our community of shoe enthusiasts.\n\n\
         Your account details:\n\
         - Email: {email}\n\
         - Phone: {phone}\n\
         - Name: {name}\n\n\
         Log in, browse our collections, add items to your cart and track your orders.\n\n\
         Best regards,\n\
         Nexus Store Team\n"
    );
    (subject, body)
}

pub fn otp_email(name: &str, code: &str, validity_minutes: i64) -> (String, String) {
    let subject = "Your Nexus Store Login OTP".to_string();
    let body = format!(
        "Hi {name},\n\n\
         Your OTP for Nexus Store login is: {code}\n\n\
         This OTP is valid for {validity_minutes} minutes.\n\
         If you didn't request this, please ignore this email.\n\n\
         Best regards,\n\
         Nexus Store Team\n"
    );
    (subject, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_email_contains_code_and_window() {
        let (subject, body) = otp_email("Ada", "123456", 10);
        assert_eq!(subject, "Your Nexus Store Login OTP");
        assert!(body.contains("123456"));
        assert!(body.contains("valid for 10 minutes"));
        assert!(body.starts_with("Hi Ada,"));
    }

    #[test]
    fn welcome_email_lists_account_details() {
        let (_, body) = welcome_email("Ada", "a@x.com", "555-0100");
        assert!(body.contains("Email: a@x.com"));
        assert!(body.contains("Phone: 555-0100"));
    }

    #[tokio::test]
    async fn log_mailer_never_fails() {
        let mailer = LogMailer;
        assert!(mailer.send("a@x.com", "hi", "body").await.is_ok());
    }
}
