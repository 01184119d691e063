//! Email notifications for purchase outcomes.
//!
//! Delivery is best effort: a transport failure is logged and counted, and
//! never changes how the run ends.

pub mod format;
pub mod transport;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::NotifyError;
use crate::metrics;

pub use format::{MessageFormatter, SUBJECT_FAILURE, SUBJECT_FAULT, SUBJECT_SUCCESS};
pub use transport::{LogNotifier, RecordingNotifier, SmtpNotifier};

/// A plain-text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Subject line.
    pub subject: String,
    /// Body text.
    pub body: String,
}

impl Notification {
    /// Create a notification.
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Something that can deliver a notification.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Send a notification, swallowing transport errors.
///
/// Returns whether delivery succeeded.
pub async fn deliver(notifier: &dyn Notifier, notification: &Notification) -> bool {
    match notifier.send(notification).await {
        Ok(()) => {
            info!(subject = %notification.subject, "Notification delivered");
            true
        }
        Err(e) => {
            metrics::inc_notify_failures();
            warn!(subject = %notification.subject, error = %e, "Failed to send notification");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deliver_reports_success() {
        let notifier = RecordingNotifier::new();
        assert!(deliver(&notifier, &Notification::new("DCA-KRAKEN", "ok")).await);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn deliver_swallows_failures() {
        let notifier = RecordingNotifier::failing();
        assert!(!deliver(&notifier, &Notification::new("DCA-KRAKEN", "ok")).await);
    }
}
