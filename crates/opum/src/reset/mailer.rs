//! Outbound mail for reset links.
//!
//! [`MailTransport`] is the seam; [`SmtpMailTransport`] sends through an SMTP
//! relay with lettre's blocking transport.

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use serde::Serialize;

use crate::config::SmtpConfig;

/// A fully rendered plain-text email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Delivery seam so the reset flow can run without a mail server.
pub trait MailTransport: Send + Sync {
    fn send(&self, email: &OutboundEmail) -> Result<(), MailError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("email could not be assembled: {0}")]
    Build(String),
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

pub struct SmtpMailTransport {
    transport: SmtpTransport,
}

impl SmtpMailTransport {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let mut builder = SmtpTransport::starttls_relay(&config.host)?.port(config.port);
        if let (Some(user), Some(password)) = (&config.user, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }
        Ok(Self {
            transport: builder.build(),
        })
    }
}

impl MailTransport for SmtpMailTransport {
    fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        let message = Message::builder()
            .from(email.from.parse()?)
            .to(email.to.parse()?)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|err| MailError::Build(err.to_string()))?;

        self.transport.send(&message)?;
        tracing::info!(to = %email.to, "reset email sent");
        Ok(())
    }
}

/// Wording of the reset email. `{link}` and `{hours}` are substituted.
#[derive(Debug, Clone)]
pub struct ResetEmailTemplate {
    pub subject: String,
    pub text: String,
    pub closing: String,
    pub signature: String,
}

impl Default for ResetEmailTemplate {
    fn default() -> Self {
        Self {
            subject: "Online PUM: set your password".to_string(),
            text: "Hello,\n\nAn Online PUM account has been created for you. \
                   Use the link below to set your password:\n\n{link}\n\n\
                   The link expires in {hours} hours."
                .to_string(),
            closing: "Thank you.".to_string(),
            signature: "Online PUM Administrator".to_string(),
        }
    }
}

impl ResetEmailTemplate {
    pub fn render(&self, link: &str, hours: i64) -> String {
        let text = self
            .text
            .replace("{link}", link)
            .replace("{hours}", &hours.to_string());
        format!("{}\n\n{}\n{}", text, self.closing, self.signature)
    }
}
