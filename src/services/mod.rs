// Services module for the TaskFlow notifier
// Business logic layer: storage interfaces, delivery channels and the due-date scheduler

pub mod background_tasks;
pub mod dispatcher;
pub mod due_date;
pub mod email;
pub mod push;
pub mod store;

// Re-export commonly used services
pub use background_tasks::{initialize_background_tasks, BackgroundTaskManager};
pub use dispatcher::{
    Channel, ChannelDispatcher, DispatchOutcome, DispatchStatus, NotificationDispatcher,
};
pub use due_date::{
    Clock, Condition, DueDateScheduler, NotificationKey, ScanReport, SchedulerDeps,
    SchedulerStatus, SystemClock,
};
pub use email::{EmailError, EmailService};
pub use push::{PushDelivery, PushError, PushService};
pub use store::{DueDateRange, PgStore, PushSubscriptionStore, TaskFilter, TaskStore, UserStore};
