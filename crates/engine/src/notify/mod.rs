//! Best-effort notification dispatch.
//!
//! The engine commits state first and notifies afterwards. A delivery that
//! fails (or exceeds the per-attempt timeout) is retried once with the plain
//! rendering; if that fails too the failure is logged and the caller proceeds.
//! Nothing here returns an error to engine operations.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;

use crate::{Badge, Budget, Threshold};

mod messages;

pub use messages::{badge_awarded, budget_alert};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    #[error("no delivery address for user \"{0}\"")]
    NoRecipient(String),
    #[error("message rejected by channel: {0}")]
    Rejected(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("delivery timed out")]
    Timeout,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageFormat {
    /// HTML markup and emoji.
    Rich,
    /// Plain text fallback.
    Plain,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub subject: String,
    pub body: String,
    pub format: MessageFormat,
}

/// Who a notification is for. Channels pick the address they understand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recipient {
    pub user_id: String,
    pub telegram_id: Option<String>,
}

impl Recipient {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            telegram_id: None,
        }
    }
}

/// A concrete delivery mechanism (chat bot, mail, log, ...).
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn deliver(
        &self,
        recipient: &Recipient,
        message: &OutgoingMessage,
    ) -> Result<(), NotificationError>;
}

/// Channel that only writes to the tracing log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    async fn deliver(
        &self,
        recipient: &Recipient,
        message: &OutgoingMessage,
    ) -> Result<(), NotificationError> {
        tracing::info!(
            user = %recipient.user_id,
            subject = %message.subject,
            format = ?message.format,
            "notification"
        );
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// The rich message failed and the plain fallback went through.
    Degraded,
    Failed,
}

impl DeliveryOutcome {
    pub fn is_delivered(self) -> bool {
        !matches!(self, Self::Failed)
    }
}

#[derive(Clone)]
pub struct Notifier {
    channel: Arc<dyn NotificationChannel>,
    timeout: Duration,
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(Arc::new(LogChannel), DEFAULT_TIMEOUT)
    }
}

impl Notifier {
    pub fn new(channel: Arc<dyn NotificationChannel>, timeout: Duration) -> Self {
        Self { channel, timeout }
    }

    pub async fn send_budget_threshold_alert(
        &self,
        recipient: &Recipient,
        budget: &Budget,
        threshold: Threshold,
    ) -> DeliveryOutcome {
        let rich = budget_alert(budget, threshold, MessageFormat::Rich);
        let plain = budget_alert(budget, threshold, MessageFormat::Plain);
        self.dispatch(recipient, &rich, &plain).await
    }

    pub async fn send_badge_awarded(
        &self,
        recipient: &Recipient,
        badge: &Badge,
    ) -> DeliveryOutcome {
        let rich = badge_awarded(badge, MessageFormat::Rich);
        let plain = badge_awarded(badge, MessageFormat::Plain);
        self.dispatch(recipient, &rich, &plain).await
    }

    async fn dispatch(
        &self,
        recipient: &Recipient,
        rich: &OutgoingMessage,
        plain: &OutgoingMessage,
    ) -> DeliveryOutcome {
        let err = match self.attempt(recipient, rich).await {
            Ok(()) => return DeliveryOutcome::Delivered,
            Err(err) => err,
        };
        tracing::warn!(
            user = %recipient.user_id,
            subject = %rich.subject,
            error = %err,
            "rich notification failed, retrying as plain text"
        );

        match self.attempt(recipient, plain).await {
            Ok(()) => DeliveryOutcome::Degraded,
            Err(err) => {
                tracing::error!(
                    user = %recipient.user_id,
                    subject = %plain.subject,
                    error = %err,
                    "notification dropped"
                );
                DeliveryOutcome::Failed
            }
        }
    }

    async fn attempt(
        &self,
        recipient: &Recipient,
        message: &OutgoingMessage,
    ) -> Result<(), NotificationError> {
        tokio::time::timeout(self.timeout, self.channel.deliver(recipient, message))
            .await
            .map_err(|_| NotificationError::Timeout)?
    }
}
