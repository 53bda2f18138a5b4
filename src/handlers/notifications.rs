// Notification scheduler endpoints: status, manual scan, VAPID public key

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::info;

use crate::{
    app::AppState,
    services::{ScanReport, SchedulerStatus},
    utils::NotifierError,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyResponse {
    pub public_key: Option<String>,
    pub configured: bool,
}

pub async fn scheduler_status(State(state): State<AppState>) -> Json<SchedulerStatus> {
    Json(state.scheduler.status())
}

/// Run a scan now. Only available when `ENABLE_SCAN_ENDPOINT=true`.
pub async fn trigger_scan(State(state): State<AppState>) -> Result<Json<ScanReport>, NotifierError> {
    if !state.config.features.enable_scan_endpoint {
        return Err(NotifierError::Disabled);
    }

    info!("[DUE_DATE] Manual scan requested");
    let report = state.scheduler.run_scan().await?;
    Ok(Json(report))
}

/// Public VAPID key for the frontend's push subscription
pub async fn public_key(State(state): State<AppState>) -> Json<PublicKeyResponse> {
    let public_key = state.config.push.vapid_public_key.clone();
    Json(PublicKeyResponse {
        configured: public_key.is_some(),
        public_key,
    })
}
