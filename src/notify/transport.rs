//! Notification transports.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use super::{Notification, Notifier};
use crate::config::Config;
use crate::error::NotifyError;

/// SMTP notifier using implicit TLS.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl std::fmt::Debug for SmtpNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpNotifier")
            .field("from", &self.from.to_string())
            .field("to", &self.to.to_string())
            .finish_non_exhaustive()
    }
}

impl SmtpNotifier {
    /// Create a notifier sending from `username` to `recipient`.
    pub fn new(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        recipient: &str,
    ) -> Result<Self, NotifyError> {
        let from: Mailbox = username.parse()?;
        let to: Mailbox = recipient.parse()?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)?
            .port(port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();

        Ok(Self {
            transport,
            from,
            to,
        })
    }

    /// Build from config. Returns `None` when no mail credentials are set.
    pub fn from_config(config: &Config) -> Result<Option<Self>, NotifyError> {
        let (Some(user), Some(password)) = (&config.gmail_user, &config.gmail_password) else {
            return Ok(None);
        };
        let recipient = config.recipient().unwrap_or(user.as_str());

        Self::new(&config.smtp_host, config.smtp_port, user, password, recipient).map(Some)
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(notification.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(notification.body.clone())?;

        let response = self.transport.send(message).await?;
        debug!(code = %response.code(), "SMTP response");
        info!(to = %self.to, subject = %notification.subject, "Email sent");
        Ok(())
    }
}

/// Writes notifications to the log instead of mailing them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            subject = %notification.subject,
            body = %notification.body,
            "Notification (mail not configured)"
        );
        Ok(())
    }
}

/// Records notifications in memory, optionally failing every send.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    fail: bool,
}

impl RecordingNotifier {
    /// Create a notifier that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a notifier whose transport always fails. Attempts are still
    /// recorded.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Notifications handed to the transport so far.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Subjects of everything sent, in order.
    pub fn subjects(&self) -> Vec<String> {
        self.sent().into_iter().map(|n| n.subject).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(notification.clone());
        }
        if self.fail {
            return Err(NotifyError::Unavailable("recording notifier set to fail".to_string()));
        }
        Ok(())
    }
}
