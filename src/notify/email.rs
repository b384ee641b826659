//! SMTP delivery over STARTTLS. lettre's transport is blocking, so each send
//! runs on the blocking pool under an overall timeout.

use super::NotifyError;
use crate::config::SmtpConfig;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::time::Duration;

const SMTP_TIMEOUT: Duration = Duration::from_secs(10);
const TOTAL_TIMEOUT: Duration = Duration::from_secs(15);

pub struct EmailSender {
    config: SmtpConfig,
}

impl EmailSender {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let message = Message::builder()
            .from(self.config.user.parse().map_err(|e| NotifyError::Address(format!("{}", e)))?)
            .to(to.parse().map_err(|e| NotifyError::Address(format!("{}: {}", to, e)))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        let config = self.config.clone();
        let task = tokio::task::spawn_blocking(move || send_blocking(&config, &message));
        match tokio::time::timeout(TOTAL_TIMEOUT, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(NotifyError::Smtp(format!("email task failed: {}", e))),
            Err(_) => Err(NotifyError::Timeout),
        }
    }
}

fn send_blocking(config: &SmtpConfig, message: &Message) -> Result<(), NotifyError> {
    let creds = Credentials::new(config.user.clone(), config.password.clone());
    let mailer = SmtpTransport::starttls_relay(&config.host)
        .map_err(|e| NotifyError::Smtp(e.to_string()))?
        .port(config.port)
        .credentials(creds)
        .timeout(Some(SMTP_TIMEOUT))
        .build();
    mailer
        .send(message)
        .map(|_| ())
        .map_err(|e| NotifyError::Smtp(e.to_string()))
}
