// Read-side storage interfaces consumed by the due-date scheduler
// PostgreSQL implementations over the shared diesel-async pool

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    db::DieselPool,
    models::{PushSubscription, Task, User},
    schema::{push_subscriptions, tasks, users},
    utils::NotifierError,
};

/// Due-date constraint of a task query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueDateRange {
    /// `from <= due_date <= to`
    Between {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
    /// `due_date < at`
    Before(DateTime<Utc>),
}

impl DueDateRange {
    pub fn contains(&self, due: DateTime<Utc>) -> bool {
        match *self {
            DueDateRange::Between { from, to } => from <= due && due <= to,
            DueDateRange::Before(at) => due < at,
        }
    }
}

/// Task query filter. Tasks without a due date never match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskFilter {
    pub is_done: bool,
    pub due: DueDateRange,
}

impl TaskFilter {
    /// Pending tasks due inside `[now, until]`
    pub fn upcoming(now: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self {
            is_done: false,
            due: DueDateRange::Between { from: now, to: until },
        }
    }

    /// Pending tasks whose due date has passed
    pub fn overdue(now: DateTime<Utc>) -> Self {
        Self {
            is_done: false,
            due: DueDateRange::Before(now),
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        task.is_done == self.is_done && task.due_date.is_some_and(|due| self.due.contains(due))
    }
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn find_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>, NotifierError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, NotifierError>;
}

#[async_trait]
pub trait PushSubscriptionStore: Send + Sync {
    async fn subscriptions_for(&self, user_id: Uuid) -> Result<Vec<PushSubscription>, NotifierError>;
}

/// PostgreSQL-backed store implementing all read interfaces
#[derive(Clone)]
pub struct PgStore {
    pool: DieselPool,
}

impl PgStore {
    pub fn new(pool: DieselPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for PgStore {
    #[instrument(skip(self))]
    async fn find_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>, NotifierError> {
        let mut conn = self.pool.get().await?;

        let query = tasks::table
            .select(Task::as_select())
            .filter(tasks::is_done.eq(filter.is_done))
            .into_boxed();

        let query = match filter.due {
            DueDateRange::Between { from, to } => query
                .filter(tasks::due_date.ge(from))
                .filter(tasks::due_date.le(to)),
            DueDateRange::Before(at) => query.filter(tasks::due_date.lt(at)),
        };

        let rows = query
            .order(tasks::due_date.asc())
            .load::<Task>(&mut conn)
            .await?;

        Ok(rows)
    }
}

#[async_trait]
impl UserStore for PgStore {
    #[instrument(skip(self))]
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, NotifierError> {
        let mut conn = self.pool.get().await?;

        let user = users::table
            .find(id)
            .select(User::as_select())
            .first::<User>(&mut conn)
            .await
            .optional()?;

        Ok(user)
    }
}

#[async_trait]
impl PushSubscriptionStore for PgStore {
    #[instrument(skip(self))]
    async fn subscriptions_for(&self, user_id: Uuid) -> Result<Vec<PushSubscription>, NotifierError> {
        let mut conn = self.pool.get().await?;

        let rows = push_subscriptions::table
            .filter(push_subscriptions::user_id.eq(user_id))
            .select(PushSubscription::as_select())
            .order(push_subscriptions::created_at.asc())
            .load::<PushSubscription>(&mut conn)
            .await?;

        Ok(rows)
    }
}
