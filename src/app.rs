// Application state shared across handlers and background tasks
use std::sync::Arc;

use crate::{app_config::AppConfig, db::DieselPool, services::DueDateScheduler};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub diesel_pool: DieselPool,
    pub scheduler: Arc<DueDateScheduler>,
    pub max_connections: u32,
}
