//! Calendar helpers for the booking window and the Serbian-facing
//! date/time labels used in emails and the cancel page.
//!
//! Calendar values (`NaiveDate`/`NaiveTime`) live in the spa's local time
//! zone; slot instants are stored as UTC and converted back for display.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};

const WEEKDAYS_SR: [&str; 7] = [
    "ponedeljak",
    "utorak",
    "sreda",
    "četvrtak",
    "petak",
    "subota",
    "nedelja",
];

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// The rolling booking window: today through today + (window_days - 1).
pub fn is_date_within_window(date: NaiveDate, window_days: i64) -> bool {
    let start = today();
    date >= start && date < start + Duration::days(window_days)
}

pub fn last_window_date(window_days: i64) -> NaiveDate {
    today() + Duration::days(window_days - 1)
}

pub fn parse_date_only(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Accepts `HH:MM` or `HH:MM:SS`, 24-hour.
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

/// Combine a calendar date and a wall-clock time into a UTC instant.
/// Returns None for local times that do not exist (DST gap).
pub fn combine(date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// e.g. "ponedeljak, 31.08.2026."
pub fn format_date_label(date: NaiveDate) -> String {
    let weekday = WEEKDAYS_SR[date.weekday().num_days_from_monday() as usize];
    format!("{weekday}, {}", date.format("%d.%m.%Y."))
}

/// e.g. "09:00", in the spa's local time zone.
pub fn format_time_label(instant: DateTime<Utc>) -> String {
    instant.with_timezone(&Local).format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dates_and_times() {
        assert_eq!(
            parse_date_only("2026-08-30"),
            NaiveDate::from_ymd_opt(2026, 8, 30)
        );
        assert_eq!(parse_date_only("30.08.2026"), None);
        assert_eq!(parse_date_only("2026-13-01"), None);

        assert_eq!(parse_time("09:30"), NaiveTime::from_hms_opt(9, 30, 0));
        assert_eq!(parse_time("09:30:15"), NaiveTime::from_hms_opt(9, 30, 15));
        assert_eq!(parse_time("9h30"), None);
    }

    #[test]
    fn window_is_today_through_today_plus_six() {
        let start = today();
        assert!(is_date_within_window(start, 7));
        assert!(is_date_within_window(start + Duration::days(6), 7));
        assert!(!is_date_within_window(start + Duration::days(7), 7));
        assert!(!is_date_within_window(start - Duration::days(1), 7));
        assert_eq!(last_window_date(7), start + Duration::days(6));
    }

    #[test]
    fn combine_round_trips_through_local_time() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 31).unwrap();
        let time = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let instant = combine(date, time).unwrap();
        assert_eq!(format_time_label(instant), "09:00");
    }

    #[test]
    fn serbian_date_label() {
        // 2026-08-31 is a Monday.
        let date = NaiveDate::from_ymd_opt(2026, 8, 31).unwrap();
        assert_eq!(format_date_label(date), "ponedeljak, 31.08.2026.");
        let sunday = NaiveDate::from_ymd_opt(2026, 9, 6).unwrap();
        assert_eq!(format_date_label(sunday), "nedelja, 06.09.2026.");
    }
}
