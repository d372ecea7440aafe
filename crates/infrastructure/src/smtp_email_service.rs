//! SMTP email service using the `lettre` crate.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tally_application::EmailService;
use tally_core::{AppError, AppResult};

/// SMTP email service configuration.
#[derive(Debug, Clone)]
pub struct SmtpEmailConfig {
    /// SMTP server hostname.
    pub host: String,
    /// SMTP server port.
    pub port: u16,
    /// SMTP username.
    pub username: String,
    /// SMTP password.
    pub password: String,
    /// Sender email address.
    pub from_address: String,
}

/// Email service delivering through an SMTP relay.
#[derive(Clone)]
pub struct SmtpEmailService {
    from: Mailbox,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpEmailService {
    /// Creates an SMTP email service, validating the sender and relay up front.
    pub fn new(config: SmtpEmailConfig) -> AppResult<Self> {
        let from = config.from_address.parse::<Mailbox>().map_err(|error| {
            AppError::Validation(format!(
                "invalid SMTP from address '{}': {error}",
                config.from_address
            ))
        })?;

        let credentials = Credentials::new(config.username, config.password);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(config.host.as_str())
            .map_err(|error| {
                AppError::Validation(format!(
                    "failed to create SMTP transport for '{}': {error}",
                    config.host
                ))
            })?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self { from, mailer })
    }
}

#[async_trait]
impl EmailService for SmtpEmailService {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: Option<&str>,
    ) -> AppResult<()> {
        let to_mailbox = to.parse::<Mailbox>().map_err(|error| {
            AppError::Notification(format!("invalid recipient address '{to}': {error}"))
        })?;

        let builder = Message::builder()
            .from(self.from.clone())
            .to(to_mailbox)
            .subject(subject);

        let message = match html_body {
            Some(html_body) => builder.multipart(MultiPart::alternative_plain_html(
                text_body.to_owned(),
                html_body.to_owned(),
            )),
            None => builder
                .header(ContentType::TEXT_PLAIN)
                .body(text_body.to_owned()),
        }
        .map_err(|error| AppError::Notification(format!("failed to build email: {error}")))?;

        self.mailer.send(message).await.map_err(|error| {
            AppError::Notification(format!("failed to send email to '{to}': {error}"))
        })?;

        Ok(())
    }
}
