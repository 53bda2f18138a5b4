// Library exports for the TaskFlow due-date notifier

pub mod app;
pub mod app_config;
pub mod db;
pub mod handlers;
pub mod migrations;
pub mod models;
pub mod schema;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use app::AppState;
pub use app_config::{init_config, AppConfig, NotifierConfig, CONFIG};
pub use db::{DieselDatabaseConfig, DieselPool};
pub use services::{
    ChannelDispatcher, DueDateScheduler, EmailService, NotificationDispatcher, PgStore,
    PushService, ScanReport, SchedulerDeps, TaskStore, UserStore,
};
pub use utils::NotifierError;

use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build storage, delivery channels and the scheduler from configuration.
///
/// The scheduler is created stopped; start it once the host is ready.
pub async fn initialize_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    info!("Initializing database pool...");
    let db_config = DieselDatabaseConfig::from(&config.database);
    let max_connections = db_config.max_connections;
    let diesel_pool = db::create_diesel_pool(db_config).await?;

    if migrations::should_run_migrations(config) {
        info!("Running embedded migrations...");
        migrations::run_all_migrations(&config.database_url)
            .await
            .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
    }

    let store = Arc::new(PgStore::new(diesel_pool.clone()));
    let email_service = Arc::new(EmailService::new(config.email.clone())?);
    let push_service = config
        .push
        .gateway_url
        .as_ref()
        .map(|_| Arc::new(PushService::new(config.push.clone(), store.clone())));
    if push_service.is_none() {
        info!("PUSH_GATEWAY_URL not set, browser push disabled");
    }

    let dispatcher = Arc::new(ChannelDispatcher::new(email_service, push_service));
    let deps = SchedulerDeps::new(store.clone(), store, dispatcher);
    let scheduler = Arc::new(DueDateScheduler::new(config.notifier.clone(), deps));

    Ok(AppState {
        config: Arc::new(config.clone()),
        diesel_pool,
        scheduler,
        max_connections,
    })
}

/// Full HTTP router: health plus the notification endpoints
pub fn app_router(state: AppState) -> axum::Router {
    use axum::routing::get;

    axum::Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1/notifications", handlers::notification_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Health check handler
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl axum::response::IntoResponse {
    use axum::http::StatusCode;
    use axum::Json;

    let mut overall_healthy = true;
    let timestamp = chrono::Utc::now().to_rfc3339();

    let postgres_health = match db::check_diesel_health(&state.diesel_pool).await {
        Ok(_) => serde_json::json!({
            "status": "healthy",
            "max_connections": state.max_connections,
            "error": null
        }),
        Err(e) => {
            overall_healthy = false;
            serde_json::json!({
                "status": "unhealthy",
                "error": format!("Database connection failed: {}", e)
            })
        },
    };

    let scheduler_running = state.scheduler.is_running();
    let scheduler_expected = state.config.notifier.enabled;
    if scheduler_expected && !scheduler_running {
        overall_healthy = false;
    }

    let response = serde_json::json!({
        "status": if overall_healthy { "healthy" } else { "degraded" },
        "service": "taskflow-notifier",
        "timestamp": timestamp,
        "components": {
            "postgresql": postgres_health,
            "due_date_scheduler": {
                "status": if scheduler_running { "running" } else { "stopped" },
                "enabled": scheduler_expected
            }
        }
    });

    if overall_healthy {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}
