//! Alarm consumer: pops the queue and fans each alarm out to Telegram and
//! e-mail.
//!
//! The loop never exits on queue errors (the queue reports those as an empty
//! pop); it only stops when the shutdown channel flips to `true` or its
//! sender is dropped. Failed deliveries are logged and dropped.

use crate::core::context::AppContext;
use crate::models::alarm::{Alarm, NotifyTarget};
use crate::notify::EMAIL_SUBJECT;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Per-channel result for one alarm; `None` means the channel was not attempted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub telegram: Option<bool>,
    pub email: Option<bool>,
}

pub struct Worker {
    ctx: Arc<AppContext>,
}

impl Worker {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let pop_timeout = self.ctx.worker.pop_timeout;
        let idle_sleep = self.ctx.worker.idle_sleep;
        info!(
            pop_timeout_ms = pop_timeout.as_millis() as u64,
            "Worker: started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.ctx.queue.pop(pop_timeout).await {
                Some(alarm) => {
                    self.process(&alarm).await;
                }
                None => {
                    tokio::select! {
                        changed = shutdown.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                        _ = tokio::time::sleep(idle_sleep) => {}
                    }
                }
            }
        }

        info!("Worker: stopped");
    }

    async fn resolve_target(&self, user_id: i64) -> Option<NotifyTarget> {
        match self.ctx.notify_targets.get(user_id).await {
            Ok(Some(target)) => Some(target),
            Ok(None) => {
                warn!(user_id = user_id, "Worker: no notify settings for user {}", user_id);
                None
            }
            Err(e) => {
                error!(user_id = user_id, error = %e, "Worker: failed to load notify settings for user {}", user_id);
                None
            }
        }
    }

    /// Deliver one alarm on every configured channel. The two sends run
    /// concurrently and neither outcome affects the other.
    pub async fn process(&self, alarm: &Alarm) -> DeliveryReport {
        debug!(
            code = %alarm.instrument_code,
            user_id = alarm.user_id,
            "Worker: processing alarm for {}",
            alarm.instrument_code
        );
        let target = self.resolve_target(alarm.user_id).await;
        let message = alarm.message();

        let chat_id = target
            .as_ref()
            .and_then(|t| t.telegram_id.clone())
            .or_else(|| self.ctx.telegram_fallback_chat_id.clone());
        let email = target.as_ref().and_then(|t| t.email.clone());

        let channel = &self.ctx.channel;
        let telegram = async {
            match &chat_id {
                Some(id) => Some(channel.send_telegram(id, &message).await),
                None => None,
            }
        };
        let mail = async {
            match &email {
                Some(addr) => Some(channel.send_email(addr, EMAIL_SUBJECT, &message).await),
                None => None,
            }
        };
        let (telegram, email) = tokio::join!(telegram, mail);

        let report = DeliveryReport { telegram, email };
        if report.telegram.is_none() && report.email.is_none() {
            warn!(
                code = %alarm.instrument_code,
                user_id = alarm.user_id,
                "Worker: no delivery channel for alarm on {}",
                alarm.instrument_code
            );
        } else {
            info!(
                code = %alarm.instrument_code,
                telegram = ?report.telegram,
                email = ?report.email,
                "Worker: alarm for {} processed",
                alarm.instrument_code
            );
        }
        report
    }
}
