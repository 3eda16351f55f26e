//! Operator notifications.
//!
//! Delivery is best effort: callers log a [`NotifyError`] and move on.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::SmtpSettings;
use crate::error::NotifyError;
use crate::http_client::{HttpClient, HttpRequest};

pub trait Notifier: Send + Sync {
    fn notify<'a>(
        &'a self,
        message: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + 'a>>;
}

/// Sends a notification and logs delivery failures instead of returning them.
pub async fn notify_best_effort(notifier: &dyn Notifier, message: &str) {
    if let Err(error) = notifier.notify(message).await {
        warn!(%error, "operator notification was not delivered");
    }
}

/// Writes notifications to the log only.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier {
    recipient: Option<String>,
}

impl LogNotifier {
    pub fn new(recipient: Option<String>) -> Self {
        Self { recipient }
    }
}

impl Notifier for LogNotifier {
    fn notify<'a>(
        &'a self,
        message: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + 'a>> {
        Box::pin(async move {
            info!(
                recipient = self.recipient.as_deref().unwrap_or("operator"),
                text = message,
                "notification"
            );
            Ok(())
        })
    }
}

/// POSTs `{"recipient": ..., "text": ...}` to a webhook.
pub struct WebhookNotifier {
    http_client: Arc<dyn HttpClient>,
    url: String,
    recipient: Option<String>,
}

impl WebhookNotifier {
    pub fn new(http_client: Arc<dyn HttpClient>, url: impl Into<String>) -> Self {
        Self {
            http_client,
            url: url.into(),
            recipient: None,
        }
    }

    pub fn with_recipient(mut self, recipient: Option<String>) -> Self {
        self.recipient = recipient;
        self
    }

    fn request(&self, message: &str) -> HttpRequest {
        let body = json!({
            "recipient": self.recipient,
            "text": message,
        });
        HttpRequest::post(&self.url)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
    }
}

impl Notifier for WebhookNotifier {
    fn notify<'a>(
        &'a self,
        message: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .http_client
                .execute(self.request(message))
                .await
                .map_err(|error| NotifyError::new(error.message()))?;

            if response.is_success() {
                Ok(())
            } else {
                Err(NotifyError::new(format!(
                    "webhook answered with status {}",
                    response.status
                )))
            }
        })
    }
}

impl std::fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookNotifier")
            .field("url", &self.url)
            .field("recipient", &self.recipient)
            .finish()
    }
}

/// Mails notifications over implicit-TLS SMTP with a fixed subject.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    recipient: Mailbox,
    subject: String,
}

impl SmtpNotifier {
    /// Parses both addresses and prepares the transport. No connection is
    /// made until the first notification.
    pub fn from_settings(settings: &SmtpSettings, recipient: &str) -> Result<Self, NotifyError> {
        let sender = if settings.sender.trim().is_empty() {
            &settings.username
        } else {
            &settings.sender
        };
        let sender = parse_mailbox("sender", sender)?;
        let recipient = parse_mailbox("recipient", recipient)?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
            .map_err(|error| NotifyError::new(format!("smtp relay {}: {error}", settings.host)))?
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            sender,
            recipient,
            subject: settings.subject.clone(),
        })
    }

    fn message(&self, text: &str) -> Result<Message, NotifyError> {
        Message::builder()
            .from(self.sender.clone())
            .to(self.recipient.clone())
            .subject(self.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(text.to_owned())
            .map_err(|error| NotifyError::new(format!("building email: {error}")))
    }
}

fn parse_mailbox(role: &str, address: &str) -> Result<Mailbox, NotifyError> {
    address
        .parse::<Mailbox>()
        .map_err(|error| NotifyError::new(format!("invalid {role} address '{address}': {error}")))
}

impl Notifier for SmtpNotifier {
    fn notify<'a>(
        &'a self,
        message: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + 'a>> {
        Box::pin(async move {
            let email = self.message(message)?;
            self.transport
                .send(email)
                .await
                .map_err(|error| NotifyError::new(format!("smtp delivery: {error}")))?;
            debug!(recipient = %self.recipient, "notification mailed");
            Ok(())
        })
    }
}

impl std::fmt::Debug for SmtpNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpNotifier")
            .field("sender", &self.sender)
            .field("recipient", &self.recipient)
            .field("subject", &self.subject)
            .finish()
    }
}
