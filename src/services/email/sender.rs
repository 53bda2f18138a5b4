// Email Sender - delivery to the Resend HTTP API

use super::types::{EmailError, EmailMessage, ResendEmailPayload};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Email sender that handles delivery to the email provider
#[derive(Clone)]
pub struct EmailSender {
    client: Arc<Client>,
    api_key: String,
    api_url: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl EmailSender {
    /// Create a new email sender for Resend API
    pub fn new_resend(api_key: String, api_url: String) -> Self {
        Self {
            client: Arc::new(Client::new()),
            api_key,
            api_url,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }

    /// Set maximum retry attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Set delay between retries
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Exponential backoff without jitter, capped at 60 seconds.
    /// `attempt` is 1-based.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = 2_u32
            .checked_pow(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.retry_delay
            .checked_mul(exp)
            .unwrap_or(MAX_RETRY_DELAY)
            .min(MAX_RETRY_DELAY)
    }

    /// Send an email message
    #[instrument(skip(self, message), fields(to = ?message.to, subject = %message.subject))]
    pub async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        let payload: ResendEmailPayload = message.into();

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await;

        match response {
            Ok(res) if res.status().is_success() => {
                info!("Email sent successfully");
                Ok(())
            },
            Ok(res) => {
                let status = res.status();
                let error_text = res
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());

                error!(
                    "Failed to send email. Status: {}, Error: {}",
                    status, error_text
                );

                if status.as_u16() == 429 {
                    Err(EmailError::RateLimitExceeded)
                } else if status.is_server_error() {
                    Err(EmailError::ServiceUnavailable)
                } else {
                    Err(EmailError::SendError(format!(
                        "Email send failed with status {}: {}",
                        status, error_text
                    )))
                }
            },
            Err(e) => {
                error!("Network error while sending email: {:?}", e);
                Err(EmailError::SendError(format!("Network error: {}", e)))
            },
        }
    }

    /// Send an email with automatic retry on failure
    #[instrument(skip(self, message), fields(to = ?message.to, subject = %message.subject))]
    pub async fn send_with_retry(&self, message: EmailMessage) -> Result<(), EmailError> {
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            match self.send(message.clone()).await {
                Ok(()) => return Ok(()),
                Err(EmailError::RateLimitExceeded) => {
                    warn!("Rate limit hit, not retrying");
                    return Err(EmailError::RateLimitExceeded);
                },
                Err(e) => {
                    warn!("Email send attempt {} failed: {:?}", attempt, e);
                    last_error = Some(e);

                    if attempt < self.max_retries {
                        // Random jitter of 0-25% on top of the base delay
                        use rand::rngs::StdRng;
                        use rand::{Rng, SeedableRng};
                        let base_delay = self.backoff_delay(attempt);
                        let mut rng = StdRng::from_entropy();
                        let jitter_millis = rng.gen_range(0..=(base_delay.as_millis() / 4) as u64);
                        let delay = base_delay + Duration::from_millis(jitter_millis);

                        info!("Retrying in {:?} (with jitter)", delay);
                        tokio::time::sleep(delay).await;
                    }
                },
            }
        }

        Err(last_error.unwrap_or_else(|| {
            EmailError::SendError("Failed after maximum retry attempts".to_string())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender(delay: Duration) -> EmailSender {
        EmailSender::new_resend(
            "test_key".to_string(),
            "https://api.resend.com/emails".to_string(),
        )
        .with_retry_delay(delay)
    }

    #[test]
    fn test_resend_payload_conversion() {
        let message = EmailMessage::new(
            "sender@example.com".to_string(),
            vec!["recipient@example.com".to_string()],
            "Task Overdue".to_string(),
            "<p>Late</p>".to_string(),
        );

        let payload: ResendEmailPayload = message.into();
        assert_eq!(payload.to, vec!["recipient@example.com"]);
        assert_eq!(payload.subject, "Task Overdue");
        assert!(payload.text.is_none());

        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("text").is_none());
    }

    #[test]
    fn test_exponential_backoff() {
        let sender = sender(Duration::from_secs(2));
        assert_eq!(sender.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(sender.backoff_delay(2), Duration::from_secs(4));
        assert_eq!(sender.backoff_delay(3), Duration::from_secs(8));
        assert_eq!(sender.backoff_delay(50), Duration::from_secs(60));
    }

    #[test]
    fn test_multiplication_overflow_protection() {
        let sender = sender(Duration::from_secs(u32::MAX as u64));
        assert_eq!(sender.backoff_delay(2), Duration::from_secs(60));
    }

    #[test]
    fn test_max_retries_never_zero() {
        let sender = sender(Duration::from_secs(1)).with_max_retries(0);
        assert_eq!(sender.max_retries, 1);
    }
}
