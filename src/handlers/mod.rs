// Operational HTTP handlers

pub mod notifications;

use crate::app::AppState;
use axum::{
    routing::{get, post},
    Router,
};

// Notification routes
pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(notifications::scheduler_status))
        .route("/scan", post(notifications::trigger_scan))
        .route("/public-key", get(notifications::public_key))
}
