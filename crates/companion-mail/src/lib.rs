//! Outbound transactional email. Fire-and-forget from the caller's point
//! of view: a failed send is reported, never retried.

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_email: String,
    pub from_name: String,
}

impl MailConfig {
    pub fn from_env() -> Self {
        MailConfig {
            smtp_host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string()),
            smtp_port: std::env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".to_string())
                .parse()
                .unwrap_or(587),
            smtp_username: std::env::var("SMTP_USERNAME").unwrap_or_default(),
            smtp_password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
            from_email: std::env::var("FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@companion.local".to_string()),
            from_name: std::env::var("FROM_NAME").unwrap_or_else(|_| "AI Companion".to_string()),
        }
    }
}

pub struct SmtpMailer {
    config: MailConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: MailConfig) -> Result<Self> {
        let creds = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(creds)
            .build();
        Ok(Self { config, transport })
    }

    pub fn is_configured(&self) -> bool {
        !self.config.smtp_username.is_empty()
            && !self.config.smtp_password.is_empty()
            && !self.config.smtp_host.is_empty()
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        if !self.is_configured() {
            bail!("SMTP credentials not configured");
        }

        let from = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| anyhow!("Invalid from address: {}", e))?;
        let to_addr = to
            .parse()
            .map_err(|e| anyhow!("Invalid recipient address: {}", e))?;

        let message = Message::builder()
            .from(from)
            .to(to_addr)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        self.transport.send(message).await?;
        info!("Email sent to {}", to);
        Ok(())
    }
}

pub async fn send_welcome_email(mailer: &dyn Mailer, to: &str, name: &str) -> Result<()> {
    let body = format!(
        "Hi {name},\n\nWelcome to AI Companion! Your account has been created.\n\nThanks!"
    );
    mailer.send(to, "Welcome to AI Companion!", &body).await
}

pub async fn send_otp_email(mailer: &dyn Mailer, to: &str, otp: &str) -> Result<()> {
    let body = format!("Your OTP for password reset is: {otp}\n\nValid for 10 minutes.");
    mailer.send(to, "AI Companion - OTP", &body).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_env_has_defaults() {
        let config = MailConfig::from_env();
        assert!(config.smtp_port > 0);
        assert!(!config.from_email.is_empty());
    }

    #[tokio::test]
    async fn unconfigured_mailer_refuses_to_send() {
        let mailer = SmtpMailer::new(MailConfig {
            smtp_host: "localhost".to_string(),
            smtp_port: 1025,
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_email: "noreply@companion.local".to_string(),
            from_name: "AI Companion".to_string(),
        })
        .unwrap();

        assert!(!mailer.is_configured());
        assert!(mailer.send("ann@x.com", "subject", "body").await.is_err());
    }
}
