// Email Builders - one builder per email type

use super::types::{DueDateEmailData, EmailBuilder, EmailError, EmailMessage};
use crate::app_config::EmailConfig;
use handlebars::Handlebars;
use tracing::instrument;

/// Builder for "Task Due Soon" / "Task Overdue" emails
pub struct DueDateEmailBuilder<'a> {
    to_email: &'a str,
    subject: &'a str,
    message: &'a str,
    config: &'a EmailConfig,
    templates: &'a Handlebars<'a>,
}

impl<'a> DueDateEmailBuilder<'a> {
    pub fn new(
        to_email: &'a str,
        subject: &'a str,
        message: &'a str,
        config: &'a EmailConfig,
        templates: &'a Handlebars<'a>,
    ) -> Self {
        Self {
            to_email,
            subject,
            message,
            config,
            templates,
        }
    }
}

impl<'a> EmailBuilder for DueDateEmailBuilder<'a> {
    #[instrument(skip(self))]
    fn build(&self) -> Result<EmailMessage, EmailError> {
        if !validator::validate_email(self.to_email) {
            return Err(EmailError::InvalidEmail(self.to_email.to_string()));
        }

        let data = DueDateEmailData {
            subject: self.subject.to_string(),
            message: self.message.to_string(),
            app_name: self.config.from_name.clone(),
            app_url: self.config.app_url.clone(),
        };

        let html = self
            .templates
            .render("due_date_notification", &data)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        let text = format!(
            "{}\n\nOpen {} to review your tasks.\n\n- The {} Team",
            self.message, self.config.app_url, self.config.from_name
        );

        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);

        Ok(EmailMessage::new(
            from,
            vec![self.to_email.to_string()],
            self.subject.to_string(),
            html,
        )
        .with_text(text))
    }
}
