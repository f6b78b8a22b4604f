use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;

use crate::{
    error::ApiError,
    models::booking::{SlotStatus, WorkDay},
    timeutil,
};

/// Derives hourly bookable slots from a work day's operating hours.
pub struct SlotService;

impl SlotService {
    /// Walk the working range in one-hour steps. The trailing partial hour is
    /// dropped; an empty or inverted range is a validation error.
    pub fn build_hourly_slots(
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<Vec<(DateTime<Utc>, DateTime<Utc>)>, ApiError> {
        let start = timeutil::combine(date, start)
            .ok_or_else(|| ApiError::Validation("Neispravno radno vreme dana.".into()))?;
        let end = timeutil::combine(date, end)
            .ok_or_else(|| ApiError::Validation("Neispravno radno vreme dana.".into()))?;

        if start >= end {
            return Err(ApiError::Validation(
                "Kraj radnog vremena mora biti posle pocetka.".into(),
            ));
        }

        let hour = Duration::hours(1);
        let mut slots = Vec::new();
        let mut cursor = start;
        while cursor + hour <= end {
            slots.push((cursor, cursor + hour));
            cursor += hour;
        }

        Ok(slots)
    }

    /// Insert the day's slots as AVAILABLE, keyed on (work_date, start_time)
    /// with insert-or-ignore semantics so repeated calls are idempotent.
    /// Returns the number of rows actually inserted.
    pub async fn generate_for_work_day(
        pool: &PgPool,
        work_day: &WorkDay,
    ) -> Result<u64, ApiError> {
        let (Some(start), Some(end)) = (work_day.start_time, work_day.end_time) else {
            return Ok(0);
        };
        if work_day.is_closed {
            return Ok(0);
        }

        let slots = Self::build_hourly_slots(work_day.work_date, start, end)?;

        let mut created = 0u64;
        for (slot_start, slot_end) in slots {
            let result = sqlx::query(
                "INSERT INTO time_slots (work_date, start_time, end_time, status, work_day_id)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (work_date, start_time) DO NOTHING",
            )
            .bind(work_day.work_date)
            .bind(slot_start)
            .bind(slot_end)
            .bind(SlotStatus::Available.to_string())
            .bind(work_day.id)
            .execute(pool)
            .await?;
            created += result.rows_affected();
        }

        if created > 0 {
            tracing::info!(
                "generated {created} slots for {}",
                work_day.work_date
            );
        }

        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, 1).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn full_working_day_yields_eight_slots() {
        let slots = SlotService::build_hourly_slots(date(), time(9, 0), time(17, 0)).unwrap();
        assert_eq!(slots.len(), 8);
        assert_eq!(timeutil::format_time_label(slots[0].0), "09:00");
        assert_eq!(timeutil::format_time_label(slots[0].1), "10:00");
        assert_eq!(timeutil::format_time_label(slots[7].0), "16:00");
        assert_eq!(timeutil::format_time_label(slots[7].1), "17:00");
    }

    #[test]
    fn slots_are_contiguous_hours() {
        let slots = SlotService::build_hourly_slots(date(), time(10, 0), time(13, 0)).unwrap();
        assert_eq!(slots.len(), 3);
        for window in slots.windows(2) {
            assert_eq!(window[0].1, window[1].0);
        }
        for (start, end) in &slots {
            assert_eq!(*end - *start, Duration::hours(1));
        }
    }

    #[test]
    fn trailing_partial_hour_is_dropped() {
        let slots = SlotService::build_hourly_slots(date(), time(9, 0), time(10, 30)).unwrap();
        assert_eq!(slots.len(), 1);

        let slots = SlotService::build_hourly_slots(date(), time(9, 0), time(9, 30)).unwrap();
        assert!(slots.is_empty());
    }

    #[test]
    fn inverted_or_empty_range_is_rejected() {
        assert!(matches!(
            SlotService::build_hourly_slots(date(), time(10, 0), time(9, 0)),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            SlotService::build_hourly_slots(date(), time(9, 0), time(9, 0)),
            Err(ApiError::Validation(_))
        ));
    }
}
