//! Approval-request notification ports.

use std::sync::Arc;

use async_trait::async_trait;
use tally_core::{AppError, AppResult};
use tally_domain::{CrudAction, Transaction, TransactionId};

/// Port for sending emails. Infrastructure provides SMTP or console implementations.
#[async_trait]
pub trait EmailService: Send + Sync {
    /// Sends a plain-text or HTML email.
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: Option<&str>,
    ) -> AppResult<()>;
}

/// Approval request addressed to the eligible checkers of one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalNotice {
    /// Transaction awaiting a decision.
    pub transaction_id: TransactionId,
    /// Gated action kind.
    pub action: CrudAction,
    /// Resource the action targets.
    pub resource_type: String,
    /// Maker's description.
    pub description: String,
    /// Checker delivery addresses.
    pub addresses: Vec<String>,
}

impl ApprovalNotice {
    /// Builds a notice for a pending transaction.
    #[must_use]
    pub fn for_transaction(transaction: &Transaction, addresses: Vec<String>) -> Self {
        Self {
            transaction_id: transaction.id(),
            action: transaction.action(),
            resource_type: transaction.resource_type().as_str().to_owned(),
            description: transaction.description().to_owned(),
            addresses,
        }
    }

    fn subject(&self) -> String {
        format!("Approval requested: {} on {}", self.action.as_str(), self.resource_type)
    }

    fn text_body(&self) -> String {
        format!(
            "A {} request on {} is waiting for your decision.\n\nTransaction: {}\nDescription: {}\n",
            self.action.as_str(),
            self.resource_type,
            self.transaction_id,
            self.description
        )
    }

    fn html_body(&self) -> String {
        format!(
            "<p>A <strong>{}</strong> request on <strong>{}</strong> is waiting for your decision.</p>\n\
             <p>Transaction: <code>{}</code></p>\n<p>Description: {}</p>\n",
            self.action.as_str(),
            escape_html(self.resource_type.as_str()),
            self.transaction_id,
            escape_html(self.description.as_str())
        )
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for character in value.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Port for telling checkers a transaction awaits them.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Delivers the notice to every address it lists.
    async fn notify(&self, notice: &ApprovalNotice) -> AppResult<()>;
}

/// Dispatcher that sends one email per checker address.
#[derive(Clone)]
pub struct EmailNotificationDispatcher {
    email_service: Arc<dyn EmailService>,
}

impl EmailNotificationDispatcher {
    /// Creates a dispatcher backed by an email service.
    #[must_use]
    pub fn new(email_service: Arc<dyn EmailService>) -> Self {
        Self { email_service }
    }
}

#[async_trait]
impl NotificationDispatcher for EmailNotificationDispatcher {
    async fn notify(&self, notice: &ApprovalNotice) -> AppResult<()> {
        let subject = notice.subject();
        let text_body = notice.text_body();
        let html_body = notice.html_body();
        let mut failures = Vec::new();

        // Every address gets an attempt even after a failure.
        for address in &notice.addresses {
            if let Err(error) = self
                .email_service
                .send_email(
                    address,
                    subject.as_str(),
                    text_body.as_str(),
                    Some(html_body.as_str()),
                )
                .await
            {
                failures.push(format!("{address}: {error}"));
            }
        }

        if failures.is_empty() {
            return Ok(());
        }

        Err(AppError::Notification(format!(
            "failed to notify {} of {} checkers for transaction '{}': {}",
            failures.len(),
            notice.addresses.len(),
            notice.transaction_id,
            failures.join("; ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tally_core::{AppError, AppResult};
    use tally_domain::{CrudAction, TransactionId};
    use tokio::sync::Mutex;

    use super::{ApprovalNotice, EmailNotificationDispatcher, EmailService, NotificationDispatcher};

    #[derive(Default)]
    struct FlakyEmailService {
        sent: Mutex<Vec<(String, String)>>,
        html_bodies: Mutex<Vec<String>>,
        rejected_recipient: Option<String>,
    }

    #[async_trait]
    impl EmailService for FlakyEmailService {
        async fn send_email(
            &self,
            to: &str,
            subject: &str,
            _text_body: &str,
            html_body: Option<&str>,
        ) -> AppResult<()> {
            if self.rejected_recipient.as_deref() == Some(to) {
                return Err(AppError::Notification("mailbox unavailable".to_owned()));
            }

            self.sent.lock().await.push((to.to_owned(), subject.to_owned()));
            if let Some(html_body) = html_body {
                self.html_bodies.lock().await.push(html_body.to_owned());
            }
            Ok(())
        }
    }

    fn notice(addresses: &[&str]) -> ApprovalNotice {
        ApprovalNotice {
            transaction_id: TransactionId::new(),
            action: CrudAction::Update,
            resource_type: "points_ledger".to_owned(),
            description: "goodwill credit".to_owned(),
            addresses: addresses.iter().map(|value| (*value).to_owned()).collect(),
        }
    }

    #[tokio::test]
    async fn sends_one_email_per_checker() {
        let email_service = Arc::new(FlakyEmailService::default());
        let dispatcher = EmailNotificationDispatcher::new(email_service.clone());

        let result = dispatcher
            .notify(&notice(&["owner@tally.test", "manager@tally.test"]))
            .await;
        assert!(result.is_ok());

        let sent = email_service.sent.lock().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].1, "Approval requested: update on points_ledger");
    }

    #[tokio::test]
    async fn partial_failure_still_reaches_remaining_checkers() {
        let email_service = Arc::new(FlakyEmailService {
            sent: Mutex::new(Vec::new()),
            html_bodies: Mutex::new(Vec::new()),
            rejected_recipient: Some("owner@tally.test".to_owned()),
        });
        let dispatcher = EmailNotificationDispatcher::new(email_service.clone());

        let result = dispatcher
            .notify(&notice(&["owner@tally.test", "manager@tally.test"]))
            .await;
        assert!(matches!(result, Err(AppError::Notification(_))));

        let sent = email_service.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "manager@tally.test");
    }

    #[tokio::test]
    async fn html_body_escapes_maker_text() {
        let email_service = Arc::new(FlakyEmailService::default());
        let dispatcher = EmailNotificationDispatcher::new(email_service.clone());
        let notice = ApprovalNotice {
            description: "refund <script>alert(1)</script> & \"goodwill\"".to_owned(),
            ..notice(&["owner@tally.test"])
        };

        assert!(dispatcher.notify(&notice).await.is_ok());

        let html_bodies = email_service.html_bodies.lock().await;
        assert_eq!(html_bodies.len(), 1);
        assert!(html_bodies[0].contains(
            "refund &lt;script&gt;alert(1)&lt;/script&gt; &amp; &quot;goodwill&quot;"
        ));
        assert!(html_bodies[0].contains(notice.transaction_id.to_string().as_str()));
        assert!(!html_bodies[0].contains("<script>"));
    }
}
