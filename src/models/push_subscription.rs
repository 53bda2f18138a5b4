// Browser push subscription records (Web Push endpoint + keys)

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::push_subscriptions;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = push_subscriptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PushSubscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Key material in the shape browsers hand out (`PushSubscription.toJSON().keys`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushKeys {
    pub p256dh: String,
    pub auth: String,
}

impl PushSubscription {
    pub fn keys(&self) -> PushKeys {
        PushKeys {
            p256dh: self.p256dh.clone(),
            auth: self.auth.clone(),
        }
    }
}
