use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::debug;

use crate::config::MailConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()>;
}

/// SMTP relay over STARTTLS.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(cfg: &MailConfig) -> anyhow::Result<Self> {
        let from: Mailbox = cfg.from.parse().context("parse sender address")?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.smtp_host)
            .with_context(|| format!("smtp relay {}", cfg.smtp_host))?
            .port(cfg.smtp_port)
            .credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()))
            .build();
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()> {
        let to: Mailbox = mail.to.parse().context("parse recipient address")?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject)
            .header(ContentType::TEXT_HTML)
            .body(mail.html)
            .context("build message")?;
        self.transport.send(message).await.context("smtp send")?;
        debug!(to = %mail.to, "mail sent");
        Ok(())
    }
}

pub const RESET_SUBJECT: &str = "Password Reset Request";

pub fn password_reset_email(to: &str, link: &str, ttl_minutes: i64) -> OutgoingMail {
    let html = format!(
        "<p>We received a request to reset the password for this account.</p>\n\
         <p><a href=\"{link}\">Choose a new password</a></p>\n\
         <p>The link expires in {ttl_minutes} minutes. If you did not ask for a reset, \
         you can ignore this email.</p>\n"
    );
    OutgoingMail {
        to: to.to_string(),
        subject: RESET_SUBJECT.to_string(),
        html,
    }
}
