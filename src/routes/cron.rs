use axum::{extract::State, http::HeaderMap, Json};
use serde_json::{json, Value};

use crate::{error::ApiError, services::reminders::ReminderService, AppState};

/// Manual trigger for the reminder sweep, for external schedulers. Guarded by
/// a shared secret when CRON_SECRET is configured.
pub async fn run_reminders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    if let Some(secret) = state.config.cron_secret.as_deref() {
        let provided = headers
            .get("x-cron-secret")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if provided != secret {
            return Err(ApiError::Unauthorized("Niste autorizovani."));
        }
    }

    let sent = ReminderService::run_sweep(&state.db, &state.email).await?;
    Ok(Json(json!({ "sent": sent })))
}
