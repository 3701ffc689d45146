//! Completion notifications sent after a successful load.

use crate::config::{NotificationConfig, Transport};
use crate::constants::{NOTIFICATION_HTML, NOTIFICATION_SUBJECT};
use crate::error::{EtlError, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// A one-shot message to the operator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl Notification {
    pub fn completed(config: &NotificationConfig) -> Self {
        Self {
            to: config.recipient.clone(),
            subject: NOTIFICATION_SUBJECT.to_string(),
            html: NOTIFICATION_HTML.to_string(),
        }
    }
}

pub trait Notifier {
    fn notify(&self, notification: &Notification) -> Result<()>;

    fn transport_name(&self) -> &'static str;
}

/// Writes the message to the log only.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        info!(to = %notification.to, subject = %notification.subject, "📧 {}", notification.html);
        Ok(())
    }

    fn transport_name(&self) -> &'static str {
        "log"
    }
}

/// Drops an `.eml` file into a directory for a mail relay to pick up.
pub struct OutboxNotifier {
    dir: PathBuf,
}

impl OutboxNotifier {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Notifier for OutboxNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            EtlError::Notification(format!("cannot create outbox '{}': {e}", self.dir.display()))
        })?;

        let now = Utc::now();
        let filename = format!(
            "{}_{}.eml",
            now.format("%Y%m%d_%H%M%S"),
            uuid::Uuid::new_v4().simple()
        );
        let path = self.dir.join(filename);
        let message = format!(
            "To: {}\r\nSubject: {}\r\nDate: {}\r\nMIME-Version: 1.0\r\nContent-Type: text/html; charset=utf-8\r\n\r\n{}\r\n",
            notification.to,
            notification.subject,
            now.to_rfc2822(),
            notification.html
        );
        fs::write(&path, message).map_err(|e| {
            EtlError::Notification(format!("cannot write '{}': {e}", path.display()))
        })?;
        info!("📧 Queued notification at {}", path.display());
        Ok(())
    }

    fn transport_name(&self) -> &'static str {
        "outbox"
    }
}

/// POSTs the message as JSON to an HTTP endpoint.
pub struct WebhookNotifier {
    url: String,
    client: reqwest::blocking::Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        let response = self.client.post(&self.url).json(notification).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(EtlError::Notification(format!(
                "webhook responded with status {}",
                status.as_u16()
            )));
        }
        info!("📧 Notification delivered to webhook ({})", status.as_u16());
        Ok(())
    }

    fn transport_name(&self) -> &'static str {
        "webhook"
    }
}

pub fn notifier_from_config(config: &NotificationConfig) -> Result<Box<dyn Notifier>> {
    let notifier: Box<dyn Notifier> = match config.transport {
        Transport::Log => Box::new(LogNotifier),
        Transport::Outbox => Box::new(OutboxNotifier::new(&config.outbox_dir)),
        Transport::Webhook => {
            let url = config.webhook_url.as_deref().ok_or_else(|| {
                EtlError::Config("webhook transport requires notification.webhook_url".into())
            })?;
            Box::new(WebhookNotifier::new(
                url,
                Duration::from_secs(config.timeout_seconds),
            )?)
        }
    };
    Ok(notifier)
}
