use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotStatus {
    Available,
    Booked,
    Blocked,
}

impl std::fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SlotStatus::Available => "AVAILABLE",
            SlotStatus::Booked => "BOOKED",
            SlotStatus::Blocked => "BLOCKED",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for SlotStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(SlotStatus::Available),
            "BOOKED" => Ok(SlotStatus::Booked),
            "BLOCKED" => Ok(SlotStatus::Blocked),
            _ => Err(anyhow::anyhow!("Unknown slot status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Active,
    Canceled,
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReservationStatus::Active => "ACTIVE",
            ReservationStatus::Canceled => "CANCELED",
        };
        write!(f, "{s}")
    }
}

/// Admin-defined operating hours for one calendar date.
/// Open days carry both times with start < end; closed days carry neither.
#[derive(Debug, Clone, FromRow)]
pub struct WorkDay {
    pub id: Uuid,
    pub work_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub is_closed: bool,
    pub created_by_admin_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A one-hour bookable unit. Status is kept as TEXT and parsed where needed.
#[derive(Debug, Clone, FromRow)]
pub struct TimeSlot {
    pub id: Uuid,
    pub work_date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
    pub work_day_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl TimeSlot {
    pub fn parsed_status(&self) -> Option<SlotStatus> {
        self.status.parse().ok()
    }

    pub fn is_available(&self) -> bool {
        self.parsed_status() == Some(SlotStatus::Available)
    }
}

// Request/Response DTOs

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertWorkDayRequest {
    pub work_date: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    #[serde(default)]
    pub is_closed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotDto {
    pub id: Uuid,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Default, Serialize)]
pub struct SlotCounts {
    pub available: i64,
    pub booked: i64,
    pub blocked: i64,
}

impl SlotCounts {
    pub fn record(&mut self, status: SlotStatus, count: i64) {
        match status {
            SlotStatus::Available => self.available = count,
            SlotStatus::Booked => self.booked = count,
            SlotStatus::Blocked => self.blocked = count,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkDayDto {
    pub id: Uuid,
    pub date: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub is_closed: bool,
    pub counts: SlotCounts,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    pub slot_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub baby_name: String,
    pub baby_age_months: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdminReservationDto {
    pub id: Uuid,
    pub status: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub baby_name: String,
    pub baby_age_months: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub email: String,
    pub work_date: NaiveDate,
    pub slot_start: DateTime<Utc>,
    pub slot_end: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_status_round_trip() {
        assert_eq!(
            "AVAILABLE".parse::<SlotStatus>().unwrap(),
            SlotStatus::Available
        );
        assert_eq!(SlotStatus::Blocked.to_string(), "BLOCKED");
        assert!("FREE".parse::<SlotStatus>().is_err());
    }

    fn slot(status: &str) -> TimeSlot {
        TimeSlot {
            id: Uuid::new_v4(),
            work_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            start_time: Utc::now(),
            end_time: Utc::now(),
            status: status.into(),
            work_day_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn slot_availability_follows_status_text() {
        assert!(slot("AVAILABLE").is_available());
        assert!(!slot("BOOKED").is_available());
        assert!(!slot("BLOCKED").is_available());
        // A row with an unknown status must never count as bookable.
        assert!(!slot("FREE").is_available());
        assert_eq!(slot("FREE").parsed_status(), None);
    }

    #[test]
    fn slot_counts_record_per_status() {
        let mut counts = SlotCounts::default();
        counts.record(SlotStatus::Available, 3);
        counts.record(SlotStatus::Booked, 2);
        assert_eq!(counts.available, 3);
        assert_eq!(counts.booked, 2);
        assert_eq!(counts.blocked, 0);
    }
}
