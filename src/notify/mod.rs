//! Outbound notification transports.
//!
//! Delivery is best-effort: every send reports success as a `bool` and logs
//! the failure, nothing is retried.

pub mod email;
pub mod telegram;

use crate::config::{SmtpConfig, TelegramConfig};
use crate::metrics::Metrics;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

pub use email::EmailSender;
pub use telegram::TelegramClient;

pub const EMAIL_SUBJECT: &str = "Stock Alert";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("telegram api returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("invalid address {0}")]
    Address(String),
    #[error("smtp error: {0}")]
    Smtp(String),
    #[error("delivery timed out")]
    Timeout,
}

#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send_email(&self, address: &str, subject: &str, body: &str) -> bool;

    async fn send_telegram(&self, chat_id: &str, text: &str) -> bool;
}

/// Telegram + SMTP; either transport may be absent, in which case its sends
/// return `false`.
pub struct Notifier {
    telegram: Option<TelegramClient>,
    email: Option<EmailSender>,
    metrics: Option<Arc<Metrics>>,
}

impl Notifier {
    pub fn new(telegram: Option<&TelegramConfig>, smtp: Option<SmtpConfig>) -> Result<Self, NotifyError> {
        Ok(Self {
            telegram: telegram.map(TelegramClient::new).transpose()?,
            email: smtp.map(EmailSender::new),
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn record(&self, ok: bool) {
        if let Some(m) = &self.metrics {
            if ok {
                m.notifications_sent_total.inc();
            } else {
                m.notification_failures_total.inc();
            }
        }
    }
}

#[async_trait]
impl NotificationChannel for Notifier {
    async fn send_email(&self, address: &str, subject: &str, body: &str) -> bool {
        let Some(sender) = &self.email else {
            warn!(to = %address, "Notifier: SMTP not configured, email to {} skipped", address);
            return false;
        };
        let ok = match sender.send(address, subject, body).await {
            Ok(()) => {
                info!(to = %address, "Notifier: email sent to {}", address);
                true
            }
            Err(e) => {
                error!(to = %address, error = %e, "Notifier: failed to send email to {}", address);
                false
            }
        };
        self.record(ok);
        ok
    }

    async fn send_telegram(&self, chat_id: &str, text: &str) -> bool {
        let Some(client) = &self.telegram else {
            warn!(chat_id = %chat_id, "Notifier: Telegram token not configured, message to {} skipped", chat_id);
            return false;
        };
        let ok = match client.send_message(chat_id, text).await {
            Ok(()) => {
                info!(chat_id = %chat_id, "Notifier: Telegram message sent to {}", chat_id);
                true
            }
            Err(e) => {
                error!(chat_id = %chat_id, error = %e, "Notifier: failed to send Telegram message to {}", chat_id);
                false
            }
        };
        self.record(ok);
        ok
    }
}
