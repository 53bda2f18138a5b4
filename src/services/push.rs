// Browser push delivery through an HTTP push gateway
// The gateway owns Web Push encryption and VAPID signing; we relay one request per subscription.

use futures_util::future::join_all;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::{
    app_config::PushConfig,
    models::{PushKeys, PushSubscription},
    services::store::PushSubscriptionStore,
    utils::NotifierError,
};

#[derive(Error, Debug)]
pub enum PushError {
    #[error("Push gateway error: {0}")]
    Gateway(String),

    #[error("Subscription lookup failed: {0}")]
    Store(#[from] NotifierError),
}

/// Result of pushing one notification to every device of a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushDelivery {
    NotConfigured,
    NoSubscriptions,
    Sent { attempted: usize, succeeded: usize },
}

/// Message shown by the service worker
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PushMessage<'a> {
    pub title: &'a str,
    pub body: &'a str,
}

/// Request body sent to the push gateway for a single subscription
#[derive(Debug, Serialize)]
pub struct PushRelayPayload<'a> {
    pub endpoint: &'a str,
    pub keys: PushKeys,
    pub vapid_subject: &'a str,
    pub payload: PushMessage<'a>,
}

impl<'a> PushRelayPayload<'a> {
    pub fn new(subscription: &'a PushSubscription, subject: &'a str, message: PushMessage<'a>) -> Self {
        Self {
            endpoint: &subscription.endpoint,
            keys: subscription.keys(),
            vapid_subject: subject,
            payload: message,
        }
    }
}

#[derive(Clone)]
pub struct PushService {
    client: Arc<Client>,
    config: PushConfig,
    subscriptions: Arc<dyn PushSubscriptionStore>,
}

impl PushService {
    pub fn new(config: PushConfig, subscriptions: Arc<dyn PushSubscriptionStore>) -> Self {
        Self {
            client: Arc::new(Client::new()),
            config,
            subscriptions,
        }
    }

    /// Push a notification to all of a user's subscribed devices.
    ///
    /// Individual device failures are logged and counted, not returned.
    #[instrument(skip(self, body))]
    pub async fn send_to_user(
        &self,
        user_id: Uuid,
        title: &str,
        body: &str,
    ) -> Result<PushDelivery, PushError> {
        let Some(gateway_url) = self.config.gateway_url.as_deref() else {
            return Ok(PushDelivery::NotConfigured);
        };

        let subscriptions = self.subscriptions.subscriptions_for(user_id).await?;
        if subscriptions.is_empty() {
            return Ok(PushDelivery::NoSubscriptions);
        }

        let sends = subscriptions.iter().map(|subscription| {
            let payload = PushRelayPayload::new(
                subscription,
                &self.config.vapid_subject,
                PushMessage { title, body },
            );
            self.relay(gateway_url, payload)
        });

        let results = join_all(sends).await;
        let attempted = results.len();
        let mut succeeded = 0;
        for (subscription, result) in subscriptions.iter().zip(results) {
            match result {
                Ok(()) => succeeded += 1,
                Err(e) => warn!(
                    subscription_id = %subscription.id,
                    "[PUSH] Delivery to subscription failed: {}", e
                ),
            }
        }

        debug!("[PUSH] Delivered {}/{} push messages", succeeded, attempted);
        Ok(PushDelivery::Sent {
            attempted,
            succeeded,
        })
    }

    async fn relay(&self, gateway_url: &str, payload: PushRelayPayload<'_>) -> Result<(), PushError> {
        let mut request = self.client.post(gateway_url).json(&payload);
        if let Some(token) = &self.config.gateway_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PushError::Gateway(format!("Network error: {}", e)))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(PushError::Gateway(format!(
                "Gateway responded with status {}",
                response.status()
            )))
        }
    }
}
