use std::sync::Arc;

use chrono::{DateTime, Duration, Local, Utc};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    models::booking::ReservationStatus, services::email::EmailService, timeutil,
};

/// Reminders go out this far before the slot starts.
const LOOK_AHEAD_HOURS: i64 = 2;
/// Sweep cadence; also the width of each sweep's window, so every slot start
/// passes through exactly one window as it crosses the look-ahead boundary.
pub const SWEEP_INTERVAL_MINUTES: i64 = 5;

/// The sweep's half-open window: slots starting exactly at the look-ahead
/// boundary are in; slots one interval further out belong to a later sweep.
fn sweep_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now + Duration::hours(LOOK_AHEAD_HOURS);
    (start, start + Duration::minutes(SWEEP_INTERVAL_MINUTES))
}

pub struct ReminderService;

impl ReminderService {
    /// One sweep: find active, un-reminded reservations starting inside
    /// [now+2h, now+2h+interval) and notify them. The reminder_sent_at
    /// marker is set per row, only after that row's send succeeded — a
    /// failed send stays unmarked and is retried on the next sweep, and
    /// overlapping sweeps cannot double-send past the marker.
    pub async fn run_sweep(pool: &PgPool, email_svc: &EmailService) -> anyhow::Result<u64> {
        let (window_start, window_end) = sweep_window(Utc::now());

        let rows: Vec<(Uuid, String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT r.id, u.email, s.start_time
             FROM reservations r
             JOIN users u ON u.id = r.user_id
             JOIN time_slots s ON s.id = r.slot_id
             WHERE r.status = $1 AND r.reminder_sent_at IS NULL
               AND s.start_time >= $2 AND s.start_time < $3",
        )
        .bind(ReservationStatus::Active.to_string())
        .bind(window_start)
        .bind(window_end)
        .fetch_all(pool)
        .await?;

        let mut sent = 0u64;
        for (reservation_id, email, slot_start) in rows {
            let local_date = slot_start.with_timezone(&Local).date_naive();
            let date_label = timeutil::format_date_label(local_date);
            let time_label = timeutil::format_time_label(slot_start);

            if let Err(e) = email_svc.send_reminder(&email, &date_label, &time_label).await {
                // Leave the marker unset; the next sweep retries this row.
                warn!("reminder send failed for reservation {reservation_id}: {e:#}");
                continue;
            }

            sqlx::query("UPDATE reservations SET reminder_sent_at = now() WHERE id = $1")
                .bind(reservation_id)
                .execute(pool)
                .await?;
            sent += 1;
        }

        if sent > 0 {
            info!("reminder sweep sent {sent} reminders");
        }

        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 1, 12, 0, 0).unwrap()
    }

    fn in_window(start: DateTime<Utc>) -> bool {
        let (lo, hi) = sweep_window(now());
        start >= lo && start < hi
    }

    #[test]
    fn window_starts_at_the_look_ahead_boundary_and_spans_one_interval() {
        let (lo, hi) = sweep_window(now());
        assert_eq!(lo, now() + Duration::hours(2));
        assert_eq!(hi - lo, Duration::minutes(SWEEP_INTERVAL_MINUTES));
    }

    #[test]
    fn membership_at_the_window_edges() {
        // Exactly two hours out: inclusive.
        assert!(in_window(now() + Duration::hours(2)));
        assert!(in_window(now() + Duration::hours(2) + Duration::minutes(4)));
        // The end is exclusive; the next sweep picks this one up.
        assert!(!in_window(now() + Duration::hours(2) + Duration::minutes(5)));
    }

    #[test]
    fn far_and_near_slots_are_outside_the_window() {
        // Three hours away waits for a later sweep.
        assert!(!in_window(now() + Duration::hours(3)));
        // One hour away already had its sweep.
        assert!(!in_window(now() + Duration::hours(1)));
        // 1h58m away was swept two minutes ago, not now.
        assert!(!in_window(now() + Duration::minutes(118)));
    }
}

/// Spawn the background sweep loop, one pass per interval.
pub fn start(pool: PgPool, email_svc: Arc<EmailService>) {
    tokio::spawn(async move {
        let period = std::time::Duration::from_secs(SWEEP_INTERVAL_MINUTES as u64 * 60);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = ReminderService::run_sweep(&pool, &email_svc).await {
                warn!("reminder sweep failed: {e:#}");
            }
        }
    });
}
