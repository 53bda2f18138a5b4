// Due-date notification scheduler
// Periodically scans for upcoming and overdue tasks and notifies each owner
// at most once per task, condition and time bucket.

pub mod clock;
pub mod dedup;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    app_config::NotifierConfig,
    models::{Task, User},
    services::{
        dispatcher::NotificationDispatcher,
        store::{TaskFilter, TaskStore, UserStore},
    },
    utils::NotifierError,
};

pub use clock::{Clock, SystemClock};
pub use dedup::{approx_hours, bucket_index, Condition, DedupStore, NotificationKey};

/// Counters for one scan cycle
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ScanReport {
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub upcoming_candidates: usize,
    pub overdue_candidates: usize,
    pub dispatched: usize,
    pub deduplicated: usize,
    pub suppressed: usize,
    pub task_errors: usize,
    pub dispatch_failures: usize,
    pub query_errors: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub scans_completed: u64,
    pub dedup_entries: usize,
    pub check_interval_secs: u64,
    pub upcoming_window_secs: u64,
    pub overdue_bucket_secs: u64,
    pub last_scan: Option<ScanReport>,
}

/// Collaborators the scheduler reads from and dispatches through
#[derive(Clone)]
pub struct SchedulerDeps {
    pub tasks: Arc<dyn TaskStore>,
    pub users: Arc<dyn UserStore>,
    pub dispatcher: Arc<dyn NotificationDispatcher>,
    pub clock: Arc<dyn Clock>,
}

impl SchedulerDeps {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        users: Arc<dyn UserStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            tasks,
            users,
            dispatcher,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

enum Decision {
    Duplicate,
    Suppressed,
    Notify(PendingNotification),
}

struct PendingNotification {
    key: NotificationKey,
    user: User,
    subject: &'static str,
    body: String,
}

enum DispatchResult {
    Finished { failed: bool },
    TimedOut,
}

/// Due-date scan loop with explicit `start` / `stop` lifecycle
pub struct DueDateScheduler {
    ctx: Arc<ScanContext>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

struct ScanContext {
    config: NotifierConfig,
    deps: SchedulerDeps,
    dedup: Mutex<DedupStore>,
    scan_guard: tokio::sync::Mutex<()>,
    last_report: Mutex<Option<ScanReport>>,
    scans_completed: AtomicU64,
}

// Poisoning only means another scan panicked mid-update; the data is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl DueDateScheduler {
    pub fn new(config: NotifierConfig, deps: SchedulerDeps) -> Self {
        let dedup = DedupStore::new(config.dedup_retention(), config.dedup_max_entries);
        Self {
            ctx: Arc::new(ScanContext {
                config,
                deps,
                dedup: Mutex::new(dedup),
                scan_guard: tokio::sync::Mutex::new(()),
                last_report: Mutex::new(None),
                scans_completed: AtomicU64::new(0),
            }),
            handle: Mutex::new(None),
        }
    }

    /// Begin periodic scanning after the warm-up delay.
    ///
    /// Returns `false` without scheduling anything if the loop is already running.
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> bool {
        let mut handle = lock(&self.handle);
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!("[DUE_DATE] Scheduler already running");
            return false;
        }

        let config = &self.ctx.config;
        info!(
            "[DUE_DATE] Starting with interval {} min, window {} h",
            config.check_interval.as_secs() / 60,
            config.upcoming_window.as_secs() / 3600
        );

        let ctx = Arc::clone(&self.ctx);
        *handle = Some(tokio::spawn(ctx.run_loop()));
        true
    }

    /// Cancel the periodic scan. Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        match lock(&self.handle).take() {
            Some(handle) => {
                handle.abort();
                info!("[DUE_DATE] Scheduler stopped");
                true
            },
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.handle)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Run one scan immediately, outside the timer.
    ///
    /// Fails with `ScanInProgress` rather than overlapping a running scan.
    pub async fn run_scan(&self) -> Result<ScanReport, NotifierError> {
        self.ctx.scan().await
    }

    pub fn status(&self) -> SchedulerStatus {
        let config = &self.ctx.config;
        SchedulerStatus {
            running: self.is_running(),
            scans_completed: self.ctx.scans_completed.load(Ordering::Relaxed),
            dedup_entries: lock(&self.ctx.dedup).len(),
            check_interval_secs: config.check_interval.as_secs(),
            upcoming_window_secs: config.upcoming_window.as_secs(),
            overdue_bucket_secs: config.overdue_bucket.as_secs(),
            last_scan: lock(&self.ctx.last_report).clone(),
        }
    }

}

impl Drop for DueDateScheduler {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.handle).take() {
            handle.abort();
        }
    }
}

impl ScanContext {
    async fn run_loop(self: Arc<Self>) {
        tokio::time::sleep(self.config.warmup_delay).await;

        let mut ticker = tokio::time::interval(self.config.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            // First tick completes immediately, right after the warm-up
            ticker.tick().await;
            match self.scan().await {
                Ok(_) => {},
                Err(NotifierError::ScanInProgress) => {
                    warn!("[DUE_DATE] Previous scan still in flight, skipping tick");
                },
                Err(e) => error!("[DUE_DATE] Scan failed: {}", e),
            }
        }
    }

    #[instrument(skip(self))]
    async fn scan(&self) -> Result<ScanReport, NotifierError> {
        let _guard = self
            .scan_guard
            .try_lock()
            .map_err(|_| NotifierError::ScanInProgress)?;

        let now = self.deps.clock.now();
        let mut report = ScanReport {
            started_at: Some(now),
            ..ScanReport::default()
        };

        let evicted = lock(&self.dedup).evict_expired(now);
        if evicted > 0 {
            debug!("[DUE_DATE] Evicted {} expired dedup keys", evicted);
        }

        // Sends run detached: dropping this scan (stop, cancelled request) leaves them running
        let mut dispatches = Vec::new();

        match chrono::Duration::from_std(self.config.upcoming_window)
            .ok()
            .and_then(|window| now.checked_add_signed(window))
        {
            Some(until) => {
                self.scan_condition(
                    Condition::Upcoming,
                    TaskFilter::upcoming(now, until),
                    now,
                    &mut report,
                    &mut dispatches,
                )
                .await
            },
            None => {
                error!("[DUE_DATE] Upcoming window overflows the calendar, skipping upcoming scan");
                report.query_errors += 1;
            },
        }

        self.scan_condition(
            Condition::Overdue,
            TaskFilter::overdue(now),
            now,
            &mut report,
            &mut dispatches,
        )
        .await;

        for handle in dispatches {
            match handle.await {
                Ok(DispatchResult::Finished { failed }) => {
                    if failed {
                        report.dispatch_failures += 1;
                    }
                },
                Ok(DispatchResult::TimedOut) => report.dispatch_failures += 1,
                Err(e) => {
                    error!("[DUE_DATE] Dispatch task aborted: {}", e);
                    report.dispatch_failures += 1;
                },
            }
        }

        report.finished_at = Some(self.deps.clock.now());
        self.scans_completed.fetch_add(1, Ordering::Relaxed);
        *lock(&self.last_report) = Some(report.clone());

        info!(
            upcoming = report.upcoming_candidates,
            overdue = report.overdue_candidates,
            dispatched = report.dispatched,
            deduplicated = report.deduplicated,
            suppressed = report.suppressed,
            task_errors = report.task_errors,
            dispatch_failures = report.dispatch_failures,
            query_errors = report.query_errors,
            "[DUE_DATE] Scan complete"
        );

        Ok(report)
    }

    async fn scan_condition(
        &self,
        condition: Condition,
        filter: TaskFilter,
        now: DateTime<Utc>,
        report: &mut ScanReport,
        dispatches: &mut Vec<JoinHandle<DispatchResult>>,
    ) {
        let candidates = match self.deps.tasks.find_tasks(filter).await {
            Ok(tasks) => tasks,
            Err(e) => {
                error!("[DUE_DATE] Error querying {} tasks: {}", condition, e);
                report.query_errors += 1;
                return;
            },
        };

        match condition {
            Condition::Upcoming => report.upcoming_candidates = candidates.len(),
            Condition::Overdue => report.overdue_candidates = candidates.len(),
        }

        for task in &candidates {
            match self.decide(task, condition, now).await {
                Ok(Decision::Duplicate) => report.deduplicated += 1,
                Ok(Decision::Suppressed) => report.suppressed += 1,
                Ok(Decision::Notify(pending)) => {
                    // Recorded before the outcome is known: a failed send still counts as sent
                    if !lock(&self.dedup).record(pending.key.clone(), now) {
                        report.deduplicated += 1;
                        continue;
                    }
                    report.dispatched += 1;
                    dispatches.push(self.spawn_dispatch(pending));
                },
                Err(e) => {
                    warn!(task_id = %task.id, "[DUE_DATE] Skipping task: {}", e);
                    report.task_errors += 1;
                },
            }
        }
    }

    async fn decide(
        &self,
        task: &Task,
        condition: Condition,
        now: DateTime<Utc>,
    ) -> Result<Decision, NotifierError> {
        if task.is_done {
            return Ok(Decision::Suppressed);
        }

        let due = task.due_date.ok_or_else(|| NotifierError::InvalidTask {
            task_id: task.id,
            reason: "missing due date".to_string(),
        })?;

        let key = match condition {
            Condition::Upcoming => {
                NotificationKey::upcoming(task.id, due, self.config.upcoming_window)
            },
            Condition::Overdue => NotificationKey::overdue(task.id, now, self.config.overdue_bucket),
        };
        if lock(&self.dedup).contains(&key) {
            return Ok(Decision::Duplicate);
        }

        let user = self.resolve_owner(task).await?;
        if !user.accepts_notifications() {
            debug!(task_id = %task.id, user_id = %user.id, "[DUE_DATE] Owner opted out or has no address");
            return Ok(Decision::Suppressed);
        }

        let hours = match condition {
            Condition::Upcoming => approx_hours(due - now),
            Condition::Overdue => approx_hours(now - due),
        };

        Ok(Decision::Notify(PendingNotification {
            key,
            user,
            subject: condition.subject(),
            body: condition.message(&task.task_name, hours),
        }))
    }

    async fn resolve_owner(&self, task: &Task) -> Result<User, NotifierError> {
        let user_id: Uuid = task.user_id;
        self.deps
            .users
            .get_user(user_id)
            .await?
            .ok_or(NotifierError::OwnerNotFound {
                task_id: task.id,
                user_id,
            })
    }

    fn spawn_dispatch(&self, pending: PendingNotification) -> JoinHandle<DispatchResult> {
        let dispatcher = Arc::clone(&self.deps.dispatcher);
        let timeout = self.config.dispatch_timeout;

        tokio::spawn(async move {
            let PendingNotification {
                key,
                user,
                subject,
                body,
            } = pending;

            let delivery = async {
                let email = dispatcher
                    .send_notification(&user.email, subject, &body)
                    .await;
                let push = dispatcher
                    .send_push_notification(&user, subject, &body)
                    .await;
                (email, push)
            };

            match tokio::time::timeout(timeout, delivery).await {
                Ok((email, push)) => {
                    debug!(
                        key = %key,
                        email = ?email.status,
                        push = ?push.status,
                        "[DUE_DATE] Dispatch finished"
                    );
                    DispatchResult::Finished {
                        failed: email.is_failure() || push.is_failure(),
                    }
                },
                Err(_) => {
                    warn!(key = %key, "[DUE_DATE] Dispatch timed out");
                    DispatchResult::TimedOut
                },
            }
        })
    }
}
