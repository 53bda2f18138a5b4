// User Database Model
// Owners of tasks; resolved by the scheduler to find a contact address.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::users;

/// User model representing a database record
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub email_notifications: bool,
    pub timezone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether due-date notifications may be sent to this user.
    ///
    /// Requires the email preference to be on and a syntactically valid address.
    pub fn accepts_notifications(&self) -> bool {
        self.email_notifications
            && !self.email.trim().is_empty()
            && validator::validate_email(self.email.trim())
    }
}
