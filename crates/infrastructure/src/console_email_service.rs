//! Console email service for development. Logs emails to tracing output.

use async_trait::async_trait;
use tally_application::EmailService;
use tally_core::AppResult;
use tracing::info;

/// Development email service that logs emails to the console.
#[derive(Clone, Default)]
pub struct ConsoleEmailService;

impl ConsoleEmailService {
    /// Creates a new console email service.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmailService for ConsoleEmailService {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: Option<&str>,
    ) -> AppResult<()> {
        info!(
            to,
            subject,
            has_html = html_body.is_some(),
            "--- EMAIL (console) ---\nTo: {to}\nSubject: {subject}\n\n{text_body}\n--- END EMAIL ---"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tally_application::EmailService;

    use super::ConsoleEmailService;

    #[tokio::test]
    async fn console_delivery_always_succeeds() {
        let service = ConsoleEmailService::new();
        let result = service
            .send_email("owner-1@tally.test", "Approval requested", "body", None)
            .await;
        assert!(result.is_ok());
    }
}
