use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth::AdminUser,
    models::booking::{
        AdminReservationDto, SlotCounts, SlotStatus, UpsertWorkDayRequest, WorkDay, WorkDayDto,
    },
    services::slots::SlotService,
    timeutil, AppState,
};

/// Create or update the working hours for one date. Closing a day clears its
/// hours and blocks every still-available slot; booked slots are left alone so
/// the admin can contact those customers first.
pub async fn upsert_work_day(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(body): Json<UpsertWorkDayRequest>,
) -> Result<Json<Value>, ApiError> {
    let date = timeutil::parse_date_only(&body.work_date)
        .ok_or_else(|| ApiError::Validation("Neispravan datum.".into()))?;
    if !timeutil::is_date_within_window(date, state.config.booking_window_days) {
        return Err(ApiError::Validation(
            "Datum nije u dozvoljenom opsegu.".into(),
        ));
    }

    let (start, end) = if body.is_closed {
        (None, None)
    } else {
        let start = body
            .start_time
            .as_deref()
            .and_then(timeutil::parse_time)
            .ok_or_else(|| ApiError::Validation("Unesi pocetak radnog vremena.".into()))?;
        let end = body
            .end_time
            .as_deref()
            .and_then(timeutil::parse_time)
            .ok_or_else(|| ApiError::Validation("Unesi kraj radnog vremena.".into()))?;
        if start >= end {
            return Err(ApiError::Validation(
                "Kraj radnog vremena mora biti posle pocetka.".into(),
            ));
        }
        (Some(start), Some(end))
    };

    let work_day_id: Uuid = sqlx::query_scalar(
        "INSERT INTO work_days (work_date, start_time, end_time, is_closed, created_by_admin_id)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (work_date) DO UPDATE
             SET start_time = EXCLUDED.start_time,
                 end_time = EXCLUDED.end_time,
                 is_closed = EXCLUDED.is_closed,
                 updated_at = now()
         RETURNING id",
    )
    .bind(date)
    .bind(start)
    .bind(end)
    .bind(body.is_closed)
    .bind(admin.0.id)
    .fetch_one(&state.db)
    .await?;

    if body.is_closed {
        let blocked = sqlx::query(
            "UPDATE time_slots SET status = $1
             WHERE work_date = $2 AND status = $3",
        )
        .bind(SlotStatus::Blocked.to_string())
        .bind(date)
        .bind(SlotStatus::Available.to_string())
        .execute(&state.db)
        .await?
        .rows_affected();
        if blocked > 0 {
            tracing::info!("blocked {blocked} slots for closed day {date}");
        }
    }

    Ok(Json(json!({ "id": work_day_id })))
}

/// Calendar overview: every date in the booking window with its configured
/// hours (if any) and per-status slot counts.
pub async fn list_work_days(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Value>, ApiError> {
    let today = timeutil::today();
    let last = timeutil::last_window_date(state.config.booking_window_days);

    let days: Vec<WorkDay> = sqlx::query_as(
        "SELECT * FROM work_days WHERE work_date BETWEEN $1 AND $2 ORDER BY work_date",
    )
    .bind(today)
    .bind(last)
    .fetch_all(&state.db)
    .await?;

    let counts_rows: Vec<(NaiveDate, String, i64)> = sqlx::query_as(
        "SELECT work_date, status, COUNT(*)
         FROM time_slots
         WHERE work_date BETWEEN $1 AND $2
         GROUP BY work_date, status",
    )
    .bind(today)
    .bind(last)
    .fetch_all(&state.db)
    .await?;

    let mut counts_by_date: HashMap<NaiveDate, SlotCounts> = HashMap::new();
    for (date, status, count) in counts_rows {
        if let Ok(status) = status.parse::<SlotStatus>() {
            counts_by_date.entry(date).or_default().record(status, count);
        }
    }

    let work_days: Vec<WorkDayDto> = days
        .into_iter()
        .map(|day| WorkDayDto {
            id: day.id,
            date: day.work_date.format("%Y-%m-%d").to_string(),
            start_time: day.start_time.map(|t| t.format("%H:%M").to_string()),
            end_time: day.end_time.map(|t| t.format("%H:%M").to_string()),
            is_closed: day.is_closed,
            counts: counts_by_date.remove(&day.work_date).unwrap_or_default(),
        })
        .collect();

    Ok(Json(json!({ "workDays": work_days })))
}

pub async fn generate_slots(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(work_day_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let work_day: Option<WorkDay> = sqlx::query_as("SELECT * FROM work_days WHERE id = $1")
        .bind(work_day_id)
        .fetch_optional(&state.db)
        .await?;
    let Some(work_day) = work_day else {
        return Err(ApiError::NotFound("Nema dana."));
    };
    if work_day.is_closed {
        return Err(ApiError::Validation("Dan je zatvoren.".into()));
    }
    if work_day.start_time.is_none() || work_day.end_time.is_none() {
        return Err(ApiError::Validation(
            "Nema unetog radnog vremena za taj dan.".into(),
        ));
    }

    let created = SlotService::generate_for_work_day(&state.db, &work_day).await?;
    Ok(Json(json!({ "created": created })))
}

#[derive(Debug, Deserialize)]
pub struct ReservationsQuery {
    pub date: Option<String>,
}

pub async fn list_reservations(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<ReservationsQuery>,
) -> Result<Json<Value>, ApiError> {
    let date = match query.date.as_deref().filter(|d| !d.is_empty()) {
        Some(raw) => Some(
            timeutil::parse_date_only(raw)
                .ok_or_else(|| ApiError::Validation("Neispravan datum filtera.".into()))?,
        ),
        None => None,
    };

    let reservations: Vec<AdminReservationDto> = sqlx::query_as(
        "SELECT r.id, r.status, r.first_name, r.last_name, r.phone, r.baby_name,
                r.baby_age_months, r.notes, r.created_at, r.canceled_at,
                u.email, s.work_date, s.start_time AS slot_start, s.end_time AS slot_end
         FROM reservations r
         JOIN users u ON u.id = r.user_id
         JOIN time_slots s ON s.id = r.slot_id
         WHERE ($1::date IS NULL OR s.work_date = $1)
         ORDER BY s.start_time, r.created_at",
    )
    .bind(date)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({ "reservations": reservations })))
}
