// Background task manager
// Owns the lifecycle of periodic jobs; the host calls start after storage is ready
// and stop during graceful shutdown.

use tracing::info;

use crate::app::AppState;

/// Background task manager for the notifier service
pub struct BackgroundTaskManager {
    state: AppState,
}

impl BackgroundTaskManager {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Start all background tasks
    pub fn start_all_tasks(&self) {
        if !self.state.config.notifier.enabled {
            info!("Due-date notifier disabled by configuration");
            return;
        }

        info!("Starting background tasks");
        self.state.scheduler.start();
    }

    /// Stop all background tasks
    pub fn stop_all_tasks(&self) {
        if self.state.scheduler.stop() {
            info!("Background tasks stopped");
        }
    }
}

/// Initialize and start background tasks (call this in main.rs)
pub fn initialize_background_tasks(state: AppState) -> BackgroundTaskManager {
    let task_manager = BackgroundTaskManager::new(state);
    task_manager.start_all_tasks();
    task_manager
}
