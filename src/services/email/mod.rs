// Email Service Module
// Orchestrates template builders and the provider sender

pub mod builders;
pub mod sender;
pub mod types;

use self::types::EmailBuilder;
use crate::app_config::EmailConfig;
use builders::DueDateEmailBuilder;
use handlebars::Handlebars;
use sender::EmailSender;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// How an email notification left the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailDelivery {
    /// Accepted by the provider
    Sent,
    /// No provider configured; written to the log instead
    Logged,
}

/// Email service for due-date notifications
#[derive(Clone)]
pub struct EmailService {
    sender: Option<EmailSender>,
    config: EmailConfig,
    templates: Arc<Handlebars<'static>>,
}

impl EmailService {
    /// Create a new email service instance.
    ///
    /// Without a Resend API key the service still renders messages but only logs them.
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let mut templates = Handlebars::new();
        templates.set_strict_mode(true);
        Self::register_templates(&mut templates)?;

        let sender = if config.is_configured() {
            Some(
                EmailSender::new_resend(
                    config.resend_api_key.clone(),
                    config.resend_api_url.clone(),
                )
                .with_max_retries(config.max_retries)
                .with_retry_delay(Duration::from_secs(1)),
            )
        } else {
            info!("RESEND_API_KEY not set, email notifications will be logged only");
            None
        };

        Ok(Self {
            sender,
            config,
            templates: Arc::new(templates),
        })
    }

    fn register_templates(templates: &mut Handlebars) -> Result<(), EmailError> {
        let due_date_template =
            include_str!("../../../templates/email/due_date_notification.html");
        templates
            .register_template_string("due_date_notification", due_date_template)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.sender.is_some()
    }

    /// Send a due-date notification email
    #[instrument(skip(self, body))]
    pub async fn send_notification(
        &self,
        to_email: &str,
        subject: &str,
        body: &str,
    ) -> Result<EmailDelivery, EmailError> {
        let message =
            DueDateEmailBuilder::new(to_email, subject, body, &self.config, &self.templates)
                .build()?;

        match &self.sender {
            Some(sender) => {
                sender.send_with_retry(message).await?;
                Ok(EmailDelivery::Sent)
            },
            None => {
                info!("Notify {}: {} - {}", to_email, subject, body);
                Ok(EmailDelivery::Logged)
            },
        }
    }
}

pub use types::{EmailError, EmailMessage};
