use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskflow_notifier::{
    app_config::init_config, app_router, db::mask_connection_string, initialize_app_state,
    services::initialize_background_tasks,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskflow_notifier=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match init_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        },
    };

    info!(
        "Starting TaskFlow notifier ({}) on {}",
        config.environment, config.server.bind_address
    );
    info!("Database URL: {}", mask_connection_string(&config.database_url));

    let state = initialize_app_state(config).await?;

    // Storage is confirmed ready at this point
    let background_tasks = initialize_background_tasks(state.clone());

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    info!("Listening on {}", config.server.bind_address);

    let served = axum::serve(listener, app_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    background_tasks.stop_all_tasks();
    served?;

    info!("TaskFlow notifier shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
