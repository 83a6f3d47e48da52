use std::env;

use secrecy::SecretString;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Public URL of the storefront; decides whether session cookies are `Secure`.
    pub base_url: String,
    pub mail: MailConfig,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub from_address: String,
    /// `None` when SMTP is not configured; mail is then only logged.
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let base_url =
            env::var("APP_BASE_URL").unwrap_or_else(|_| format!("http://localhost:{port}"));
        Ok(Self {
            port,
            database_url,
            host,
            base_url,
            mail: MailConfig::from_env(),
        })
    }

    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl MailConfig {
    pub fn from_env() -> Self {
        let from_address = env::var("MAIL_FROM")
            .unwrap_or_else(|_| "Nexus Store <no-reply@nexusstore.com>".to_string());

        let smtp = match (
            env::var("SMTP_HOST"),
            env::var("SMTP_USERNAME"),
            env::var("SMTP_PASSWORD"),
        ) {
            (Ok(host), Ok(username), Ok(password)) => Some(SmtpConfig {
                host,
                port: env::var("SMTP_PORT")
                    .ok()
                    .and_then(|p| p.parse::<u16>().ok())
                    .unwrap_or(587),
                username,
                password: SecretString::from(password),
            }),
            _ => None,
        };

        Self { from_address, smtp }
    }
}
