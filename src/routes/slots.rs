use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::ApiError,
    middleware::auth::SessionUser,
    models::booking::{SlotDto, SlotStatus, TimeSlot, WorkDay},
    services::slots::SlotService,
    timeutil, AppState,
};

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub date: Option<String>,
}

/// Available slots for one date inside the booking window. Slots for the day
/// are generated on first demand so the admin only has to set working hours.
pub async fn list_slots(
    State(state): State<AppState>,
    _session: SessionUser,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Value>, ApiError> {
    let raw = query
        .date
        .as_deref()
        .ok_or_else(|| ApiError::Validation("Neispravan datum.".into()))?;
    let date = timeutil::parse_date_only(raw)
        .ok_or_else(|| ApiError::Validation("Neispravan datum.".into()))?;

    if !timeutil::is_date_within_window(date, state.config.booking_window_days) {
        return Err(ApiError::Validation(
            "Datum nije u dozvoljenom periodu.".into(),
        ));
    }

    let mut slots = fetch_available(&state, date).await?;

    if slots.is_empty() {
        let work_day: Option<WorkDay> =
            sqlx::query_as("SELECT * FROM work_days WHERE work_date = $1")
                .bind(date)
                .fetch_optional(&state.db)
                .await?;
        if let Some(day) = work_day {
            let created = SlotService::generate_for_work_day(&state.db, &day).await?;
            if created > 0 {
                slots = fetch_available(&state, date).await?;
            }
        }
    }

    let slots: Vec<SlotDto> = slots
        .into_iter()
        .map(|slot| SlotDto {
            id: slot.id,
            start_time: timeutil::format_time_label(slot.start_time),
            end_time: timeutil::format_time_label(slot.end_time),
        })
        .collect();

    Ok(Json(json!({ "slots": slots })))
}

async fn fetch_available(
    state: &AppState,
    date: chrono::NaiveDate,
) -> Result<Vec<TimeSlot>, ApiError> {
    let slots = sqlx::query_as(
        "SELECT * FROM time_slots
         WHERE work_date = $1 AND status = $2 AND start_time > $3
         ORDER BY start_time",
    )
    .bind(date)
    .bind(SlotStatus::Available.to_string())
    .bind(Utc::now())
    .fetch_all(&state.db)
    .await?;
    Ok(slots)
}
