//! Contact form delivery.
//!
//! Messages are forwarded to the blog owner over smtp. Replying to the
//! delivered email goes straight to the visitor.

use lettre::message::header::ContentType;
use lettre::Message;
use validator::{ValidateEmail, ValidateLength};

use crate::email::{mailbox, send_async};
use crate::error::{ErrorKind, Result};
use crate::Config;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl ContactMessage {
    pub fn validate(&self) -> Result<()> {
        if !self.name.trim().validate_length(Some(1), Some(100), None) {
            return Err(ErrorKind::BadInput("name must be 1 to 100 characters".to_string()).into());
        }
        if !self.email.validate_email() {
            return Err(ErrorKind::BadInput(format!("invalid email: {}", self.email)).into());
        }
        if !self.subject.validate_length(None, Some(200), None) {
            return Err(
                ErrorKind::BadInput("subject must be at most 200 characters".to_string()).into(),
            );
        }
        if !self.message.trim().validate_length(Some(10), Some(5000), None) {
            return Err(
                ErrorKind::BadInput("message must be 10 to 5000 characters".to_string()).into(),
            );
        }
        Ok(())
    }

    fn subject_line(&self, config: &Config) -> String {
        let subject = self.subject.trim();
        if subject.is_empty() {
            format!("[{}] Message from {}", config.domain, self.name.trim())
        } else {
            format!("[{}] {}", config.domain, subject)
        }
    }
}

/// Builds the email delivered to the owner.
pub fn build_message(config: &Config, contact: &ContactMessage) -> Result<Message> {
    let body = format!(
        "From: {} <{}>\n\n{}",
        contact.name.trim(),
        contact.email,
        contact.message.trim()
    );
    let message = Message::builder()
        .from(mailbox(Some(config.name.as_str()), &config.email.address)?)
        .reply_to(mailbox(Some(contact.name.trim()), &contact.email)?)
        .to(mailbox(None, &config.email.owner)?)
        .subject(contact.subject_line(config))
        .header(ContentType::TEXT_PLAIN)
        .body(body)?;
    Ok(message)
}

/// Validates and delivers a contact form submission.
pub async fn send_contact(config: &Config, contact: ContactMessage) -> Result<()> {
    contact.validate()?;
    let message = build_message(config, &contact)?;
    send_async(message, config.email.clone()).await?;
    tracing::info!("delivered contact message from {}", contact.email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> ContactMessage {
        ContactMessage {
            name: "Visitor".to_string(),
            email: "visitor@example.com".to_string(),
            subject: "Hello".to_string(),
            message: "I enjoyed your latest post.".to_string(),
        }
    }

    #[test]
    fn validates_fields() {
        assert!(message().validate().is_ok());

        let mut bad = message();
        bad.email = "not-an-email".to_string();
        assert!(bad.validate().is_err());

        let mut short = message();
        short.message = "hi".to_string();
        assert!(short.validate().is_err());

        let mut long = message();
        long.message = "x".repeat(5001);
        assert!(long.validate().is_err());
    }

    #[test]
    fn reply_goes_to_sender() -> Result<()> {
        let config = Config {
            domain: "blog.example.com".to_string(),
            email: crate::config::Email {
                address: "noreply@blog.example.com".to_string(),
                owner: "owner@blog.example.com".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let formatted = String::from_utf8(build_message(&config, &message())?.formatted())
            .map_err(|e| ErrorKind::Other(e.to_string()))?;
        assert!(formatted.contains("Reply-To: Visitor <visitor@example.com>"));
        assert!(formatted.contains("To: owner@blog.example.com"));
        assert!(formatted.contains("Subject: [blog.example.com] Hello"));
        Ok(())
    }

    #[tokio::test]
    async fn unconfigured_transport_fails() {
        let config = Config::default();
        assert!(send_contact(&config, message()).await.is_err());
    }
}
