// Notification dispatch interface used by the due-date scheduler
// Outcomes are reported for logging only; the scheduler never retries.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::{
    models::User,
    services::{
        email::{EmailDelivery, EmailService},
        push::{PushDelivery, PushService},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Push,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStatus {
    /// Handed to the provider
    Delivered,
    /// No provider configured; the message was logged instead
    Logged,
    /// Nothing to do on this channel (not configured, no devices)
    Skipped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    pub channel: Channel,
    pub status: DispatchStatus,
    pub detail: Option<String>,
}

impl DispatchOutcome {
    pub fn new(channel: Channel, status: DispatchStatus) -> Self {
        Self {
            channel,
            status,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_failure(&self) -> bool {
        self.status == DispatchStatus::Failed
    }
}

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Send an email notification. Never panics on provider errors.
    async fn send_notification(&self, address: &str, subject: &str, body: &str)
        -> DispatchOutcome;

    /// Send a device push notification to every subscription of `user`.
    async fn send_push_notification(&self, _user: &User, _title: &str, _body: &str) -> DispatchOutcome {
        DispatchOutcome::new(Channel::Push, DispatchStatus::Skipped).with_detail("unsupported")
    }
}

/// Production dispatcher: Resend email plus gateway-relayed browser push
#[derive(Clone)]
pub struct ChannelDispatcher {
    email: Arc<EmailService>,
    push: Option<Arc<PushService>>,
}

impl ChannelDispatcher {
    pub fn new(email: Arc<EmailService>, push: Option<Arc<PushService>>) -> Self {
        Self { email, push }
    }
}

#[async_trait]
impl NotificationDispatcher for ChannelDispatcher {
    async fn send_notification(&self, address: &str, subject: &str, body: &str) -> DispatchOutcome {
        match self.email.send_notification(address, subject, body).await {
            Ok(EmailDelivery::Sent) => DispatchOutcome::new(Channel::Email, DispatchStatus::Delivered),
            Ok(EmailDelivery::Logged) => {
                DispatchOutcome::new(Channel::Email, DispatchStatus::Logged).with_detail("console")
            },
            Err(e) => {
                error!("[NOTIFICATION] Failed to send email: {}", e);
                // Keep the event visible even though delivery failed
                info!("Notify {}: {} - {}", address, subject, body);
                DispatchOutcome::new(Channel::Email, DispatchStatus::Failed).with_detail(e.to_string())
            },
        }
    }

    async fn send_push_notification(&self, user: &User, title: &str, body: &str) -> DispatchOutcome {
        let Some(push) = &self.push else {
            return DispatchOutcome::new(Channel::Push, DispatchStatus::Skipped)
                .with_detail("vapid-not-configured");
        };

        match push.send_to_user(user.id, title, body).await {
            Ok(PushDelivery::NotConfigured) => {
                DispatchOutcome::new(Channel::Push, DispatchStatus::Skipped)
                    .with_detail("vapid-not-configured")
            },
            Ok(PushDelivery::NoSubscriptions) => {
                DispatchOutcome::new(Channel::Push, DispatchStatus::Skipped)
                    .with_detail("no-subscriptions")
            },
            Ok(PushDelivery::Sent {
                attempted,
                succeeded,
            }) if succeeded > 0 => DispatchOutcome::new(Channel::Push, DispatchStatus::Delivered)
                .with_detail(format!("{}/{} devices", succeeded, attempted)),
            Ok(PushDelivery::Sent { attempted, .. }) => {
                DispatchOutcome::new(Channel::Push, DispatchStatus::Failed)
                    .with_detail(format!("0/{} devices", attempted))
            },
            Err(e) => {
                error!("[NOTIFICATION] Failed to send push: {}", e);
                DispatchOutcome::new(Channel::Push, DispatchStatus::Failed).with_detail(e.to_string())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::EmailConfig;
    use chrono::Utc;
    use uuid::Uuid;

    fn dispatcher() -> ChannelDispatcher {
        let email = EmailService::new(EmailConfig {
            resend_api_key: String::new(),
            resend_api_url: "https://api.resend.com/emails".to_string(),
            from_email: "no-reply@taskflow.test".to_string(),
            from_name: "TaskFlow".to_string(),
            app_url: "https://taskflow.test".to_string(),
            max_retries: 1,
        })
        .unwrap();
        ChannelDispatcher::new(Arc::new(email), None)
    }

    #[tokio::test]
    async fn test_unconfigured_email_is_logged() {
        let outcome = dispatcher()
            .send_notification("ada@example.com", "Task Due Soon", "soon")
            .await;
        assert_eq!(outcome.channel, Channel::Email);
        assert_eq!(outcome.status, DispatchStatus::Logged);
        assert!(!outcome.is_failure());
    }

    #[tokio::test]
    async fn test_invalid_address_is_a_failure() {
        let outcome = dispatcher()
            .send_notification("not-an-address", "Task Due Soon", "soon")
            .await;
        assert!(outcome.is_failure());
    }

    #[tokio::test]
    async fn test_push_without_service_is_skipped() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            email_notifications: true,
            timezone: "UTC".to_string(),
            created_at: now,
            updated_at: now,
        };
        let outcome = dispatcher()
            .send_push_notification(&user, "Task Overdue", "late")
            .await;
        assert_eq!(outcome.status, DispatchStatus::Skipped);
        assert_eq!(outcome.detail.as_deref(), Some("vapid-not-configured"));
    }
}
