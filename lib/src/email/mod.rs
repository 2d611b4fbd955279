use lettre::{
    address::AddressError, message::Mailbox, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::{Error, ErrorKind, Result};

pub async fn send_async(message: Message, config: crate::config::Email) -> Result<()> {
    if config.smtp_server.is_empty() {
        return Err(ErrorKind::Other("smtp server is not configured".to_string()).into());
    }
    let creds = Credentials::new(config.smtp_user.clone(), config.smtp_password.clone());

    // Open a remote connection to mail server
    let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)?
        .port(config.smtp_port)
        .credentials(creds)
        .build();

    // Send the email
    let response = mailer.send(message).await?;
    if response.is_positive() {
        Ok(())
    } else {
        Err(ErrorKind::EmailBadResponse(response.code().to_string()).into())
    }
}

/// Parses `name <address>` or a bare address into a mailbox.
pub fn mailbox(name: Option<&str>, address: &str) -> Result<Mailbox> {
    let address = address
        .parse()
        .map_err(|e: AddressError| Error::new(ErrorKind::EmailParseError(e.to_string())))?;
    Ok(Mailbox::new(name.map(str::to_string), address))
}
