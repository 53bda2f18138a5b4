// Common test utilities: in-memory stores, a recording dispatcher and a manual clock
// Shared across all test files to avoid duplication
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use taskflow_notifier::{
    app_config::NotifierConfig,
    models::{Task, User},
    services::{
        dispatcher::{Channel, DispatchOutcome, DispatchStatus, NotificationDispatcher},
        due_date::{Clock, DueDateScheduler, SchedulerDeps},
        store::{TaskFilter, TaskStore, UserStore},
    },
    utils::NotifierError,
};
use uuid::Uuid;

/// 2025-03-10T09:00:00Z, aligned to an hour boundary
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
}

pub fn make_user(email: &str, email_notifications: bool) -> User {
    let now = t0();
    User {
        id: Uuid::new_v4(),
        name: "Ada Lovelace".to_string(),
        email: email.to_string(),
        email_notifications,
        timezone: "UTC".to_string(),
        created_at: now,
        updated_at: now,
    }
}

pub fn make_task(owner: &User, name: &str, due_date: Option<DateTime<Utc>>) -> Task {
    let now = t0();
    Task {
        id: Uuid::new_v4(),
        user_id: owner.id,
        task_name: name.to_string(),
        is_done: false,
        priority: "medium".to_string(),
        category: "general".to_string(),
        due_date,
        completed_at: None,
        created_at: now,
        updated_at: now,
    }
}

/// Manually advanced wall clock
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap() = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Task store backed by a Vec, honouring `TaskFilter` unless told otherwise
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: Mutex<Vec<Task>>,
    fail_queries: Mutex<bool>,
    ignore_filter: Mutex<bool>,
    queries: Mutex<usize>,
}

impl InMemoryTaskStore {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            ..Self::default()
        }
    }

    pub fn insert(&self, task: Task) {
        self.tasks.lock().unwrap().push(task);
    }

    pub fn set_due_date(&self, task_id: Uuid, due_date: Option<DateTime<Utc>>) {
        let mut tasks = self.tasks.lock().unwrap();
        if let Some(task) = tasks.iter_mut().find(|t| t.id == task_id) {
            task.due_date = due_date;
        }
    }

    pub fn mark_done(&self, task_id: Uuid) {
        let mut tasks = self.tasks.lock().unwrap();
        if let Some(task) = tasks.iter_mut().find(|t| t.id == task_id) {
            task.is_done = true;
        }
    }

    pub fn set_failing(&self, failing: bool) {
        *self.fail_queries.lock().unwrap() = failing;
    }

    /// Return every task regardless of the filter, like a misbehaving backend
    pub fn set_ignore_filter(&self, ignore: bool) {
        *self.ignore_filter.lock().unwrap() = ignore;
    }

    pub fn query_count(&self) -> usize {
        *self.queries.lock().unwrap()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn find_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>, NotifierError> {
        *self.queries.lock().unwrap() += 1;
        if *self.fail_queries.lock().unwrap() {
            return Err(NotifierError::Database("connection refused".to_string()));
        }

        let ignore = *self.ignore_filter.lock().unwrap();
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|task| ignore || filter.matches(task))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
    failing_ids: Mutex<HashSet<Uuid>>,
}

impl InMemoryUserStore {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users: Mutex::new(users.into_iter().map(|u| (u.id, u)).collect()),
            ..Self::default()
        }
    }

    pub fn upsert(&self, user: User) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    pub fn fail_lookup_for(&self, user_id: Uuid) {
        self.failing_ids.lock().unwrap().insert(user_id);
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, NotifierError> {
        if self.failing_ids.lock().unwrap().contains(&id) {
            return Err(NotifierError::Database("user lookup timed out".to_string()));
        }
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentNotification {
    pub channel: Channel,
    pub address: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DispatchBehavior {
    Deliver,
    Fail,
    Hang,
    /// Deliver after the given delay
    Slow(std::time::Duration),
}

/// Dispatcher that records every call instead of delivering
pub struct RecordingDispatcher {
    sent: Mutex<Vec<SentNotification>>,
    delivered: AtomicUsize,
    behavior: DispatchBehavior,
}

impl RecordingDispatcher {
    pub fn new(behavior: DispatchBehavior) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            delivered: AtomicUsize::new(0),
            behavior,
        }
    }

    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn emails(&self) -> Vec<SentNotification> {
        self.sent()
            .into_iter()
            .filter(|n| n.channel == Channel::Email)
            .collect()
    }

    /// Calls that ran to completion with a `Delivered` outcome, across both channels
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    async fn respond(&self, channel: Channel) -> DispatchOutcome {
        let outcome = match self.behavior {
            DispatchBehavior::Deliver => DispatchOutcome::new(channel, DispatchStatus::Delivered),
            DispatchBehavior::Slow(delay) => {
                tokio::time::sleep(delay).await;
                DispatchOutcome::new(channel, DispatchStatus::Delivered)
            },
            DispatchBehavior::Fail => DispatchOutcome::new(channel, DispatchStatus::Failed)
                .with_detail("provider rejected message"),
            DispatchBehavior::Hang => std::future::pending().await,
        };
        if outcome.status == DispatchStatus::Delivered {
            self.delivered.fetch_add(1, Ordering::SeqCst);
        }
        outcome
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn send_notification(&self, address: &str, subject: &str, body: &str) -> DispatchOutcome {
        self.sent.lock().unwrap().push(SentNotification {
            channel: Channel::Email,
            address: address.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        self.respond(Channel::Email).await
    }

    async fn send_push_notification(&self, user: &User, title: &str, body: &str) -> DispatchOutcome {
        self.sent.lock().unwrap().push(SentNotification {
            channel: Channel::Push,
            address: user.id.to_string(),
            subject: title.to_string(),
            body: body.to_string(),
        });
        self.respond(Channel::Push).await
    }
}

pub fn test_notifier_config() -> NotifierConfig {
    NotifierConfig {
        enabled: true,
        check_interval: std::time::Duration::from_secs(15 * 60),
        upcoming_window: std::time::Duration::from_secs(24 * 60 * 60),
        overdue_bucket: std::time::Duration::from_secs(60 * 60),
        warmup_delay: std::time::Duration::from_secs(5),
        dispatch_timeout: std::time::Duration::from_secs(10),
        dedup_max_entries: 1_000,
    }
}

/// Scheduler wired to in-memory collaborators
pub struct Harness {
    pub scheduler: DueDateScheduler,
    pub tasks: Arc<InMemoryTaskStore>,
    pub users: Arc<InMemoryUserStore>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub clock: ManualClock,
}

impl Harness {
    pub fn new(tasks: Vec<Task>, users: Vec<User>) -> Self {
        Self::with_behavior(tasks, users, DispatchBehavior::Deliver, test_notifier_config())
    }

    pub fn with_behavior(
        tasks: Vec<Task>,
        users: Vec<User>,
        behavior: DispatchBehavior,
        config: NotifierConfig,
    ) -> Self {
        let tasks = Arc::new(InMemoryTaskStore::new(tasks));
        let users = Arc::new(InMemoryUserStore::new(users));
        let dispatcher = Arc::new(RecordingDispatcher::new(behavior));
        let clock = ManualClock::new(t0());

        let deps = SchedulerDeps::new(tasks.clone(), users.clone(), dispatcher.clone())
            .with_clock(Arc::new(clock.clone()));

        Self {
            scheduler: DueDateScheduler::new(config, deps),
            tasks,
            users,
            dispatcher,
            clock,
        }
    }
}
