use chrono::{Duration, Local, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{
        booking::{CreateReservationRequest, ReservationStatus, SlotStatus, TimeSlot},
        user::User,
    },
    services::tokens::{generate_token, hash_token},
    timeutil,
};

const MAX_BABY_AGE_MONTHS: i64 = 36;
const CANCEL_TOKEN_TTL_DAYS: i64 = 7;

/// Validated reservation input, all fields trimmed.
#[derive(Debug)]
pub struct ReservationInput {
    pub slot_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub baby_name: String,
    pub baby_age_months: i32,
    pub notes: Option<String>,
}

/// Everything the caller needs to notify the customer after commit.
/// The plaintext cancel token exists only here; the DB holds its hash.
#[derive(Debug)]
pub struct ReservationConfirmation {
    pub reservation_id: Uuid,
    pub email: String,
    pub date_label: String,
    pub time_label: String,
    pub baby_label: String,
    pub cancel_token: String,
}

#[derive(Debug)]
pub struct CancelOutcome {
    pub email: String,
    pub date_label: String,
    pub time_label: String,
}

pub struct ReservationService;

impl ReservationService {
    pub fn validate(req: CreateReservationRequest) -> Result<ReservationInput, ApiError> {
        let first_name = req.first_name.trim().to_string();
        let last_name = req.last_name.trim().to_string();
        let phone = req.phone.trim().to_string();
        let baby_name = req.baby_name.trim().to_string();

        if first_name.is_empty() || last_name.is_empty() || phone.is_empty() || baby_name.is_empty()
        {
            return Err(ApiError::Validation("Popuni sva obavezna polja.".into()));
        }
        if !(0..=MAX_BABY_AGE_MONTHS).contains(&req.baby_age_months) {
            return Err(ApiError::Validation(
                "Starost bebe mora biti broj meseci (0-36).".into(),
            ));
        }

        let notes = req
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        Ok(ReservationInput {
            slot_id: req.slot_id,
            first_name,
            last_name,
            phone,
            baby_name,
            baby_age_months: req.baby_age_months as i32,
            notes,
        })
    }

    /// Atomically claim a slot for the user.
    ///
    /// The exclusive row lock on the slot serializes concurrent attempts:
    /// exactly one observes AVAILABLE and wins; the rest see BOOKED after the
    /// winner commits and fail with a conflict. The reservation row, the
    /// cancel token and the profile upsert all ride the same transaction, so
    /// a slot is never BOOKED without its reservation or vice versa.
    pub async fn reserve(
        pool: &PgPool,
        user: &User,
        input: ReservationInput,
        window_days: i64,
    ) -> Result<ReservationConfirmation, ApiError> {
        let mut tx = pool.begin().await?;

        // A hung client must not hold the slot lock indefinitely.
        sqlx::query("SET LOCAL lock_timeout = '5s'")
            .execute(&mut *tx)
            .await?;

        let slot = sqlx::query_as::<_, TimeSlot>(
            "SELECT * FROM time_slots WHERE id = $1 FOR UPDATE",
        )
        .bind(input.slot_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(slot) = slot else {
            tx.rollback().await?;
            return Err(ApiError::Conflict("Termin vise nije dostupan.".into()));
        };
        if !slot.is_available() {
            tx.rollback().await?;
            return Err(ApiError::Conflict("Termin vise nije dostupan.".into()));
        }
        if slot.start_time <= Utc::now() {
            tx.rollback().await?;
            return Err(ApiError::Validation("Termin je vec prosao.".into()));
        }
        if !timeutil::is_date_within_window(slot.work_date, window_days) {
            tx.rollback().await?;
            return Err(ApiError::Validation(
                "Termin nije u dozvoljenom opsegu.".into(),
            ));
        }

        sqlx::query("UPDATE time_slots SET status = $1 WHERE id = $2")
            .bind(SlotStatus::Booked.to_string())
            .bind(slot.id)
            .execute(&mut *tx)
            .await?;

        let reservation_id: Uuid = sqlx::query_scalar(
            "INSERT INTO reservations
                 (user_id, slot_id, first_name, last_name, phone, baby_name, baby_age_months, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id",
        )
        .bind(user.id)
        .bind(slot.id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.phone)
        .bind(&input.baby_name)
        .bind(input.baby_age_months)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        let cancel_token = generate_token();
        let cancel_expires_at = Utc::now() + Duration::days(CANCEL_TOKEN_TTL_DAYS);
        sqlx::query(
            "INSERT INTO reservation_cancel_tokens (reservation_id, token_hash, expires_at)
             VALUES ($1, $2, $3)",
        )
        .bind(reservation_id)
        .bind(hash_token(&cancel_token))
        .bind(cancel_expires_at)
        .execute(&mut *tx)
        .await?;

        // The booking form doubles as profile completion.
        sqlx::query(
            "UPDATE users SET first_name = $1, last_name = $2, phone = $3, updated_at = now()
             WHERE id = $4",
        )
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.phone)
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let local_date = slot.start_time.with_timezone(&Local).date_naive();
        Ok(ReservationConfirmation {
            reservation_id,
            email: user.email.clone(),
            date_label: timeutil::format_date_label(local_date),
            time_label: timeutil::format_time_label(slot.start_time),
            baby_label: format!(
                "Beba: {}, {} meseci",
                input.baby_name, input.baby_age_months
            ),
            cancel_token,
        })
    }

    /// Redeem a single-use cancel token: mark it used, cancel the reservation
    /// and free the slot, all in one transaction. A replayed token finds no
    /// matching row (used_at is set) and fails exactly like an unknown or
    /// expired one.
    pub async fn cancel(pool: &PgPool, token: &str) -> Result<CancelOutcome, ApiError> {
        let mut tx = pool.begin().await?;

        let row: Option<(Uuid, Uuid, Uuid, String, chrono::DateTime<Utc>)> = sqlx::query_as(
            "SELECT t.id, r.id, s.id, u.email, s.start_time
             FROM reservation_cancel_tokens t
             JOIN reservations r ON r.id = t.reservation_id
             JOIN time_slots s ON s.id = r.slot_id
             JOIN users u ON u.id = r.user_id
             WHERE t.token_hash = $1 AND t.used_at IS NULL AND t.expires_at > now()
               AND r.status = $2
             FOR UPDATE OF t
             LIMIT 1",
        )
        .bind(hash_token(token))
        .bind(ReservationStatus::Active.to_string())
        .fetch_optional(&mut *tx)
        .await?;

        let Some((token_id, reservation_id, slot_id, email, slot_start)) = row else {
            tx.rollback().await?;
            return Err(ApiError::InvalidToken("Link za otkazivanje nije vazeci."));
        };

        sqlx::query("UPDATE reservation_cancel_tokens SET used_at = now() WHERE id = $1")
            .bind(token_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "UPDATE reservations SET status = $1, canceled_at = now() WHERE id = $2",
        )
        .bind(ReservationStatus::Canceled.to_string())
        .bind(reservation_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE time_slots SET status = $1 WHERE id = $2")
            .bind(SlotStatus::Available.to_string())
            .bind(slot_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let local_date = slot_start.with_timezone(&Local).date_naive();
        Ok(CancelOutcome {
            email,
            date_label: timeutil::format_date_label(local_date),
            time_label: timeutil::format_time_label(slot_start),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(age: i64) -> CreateReservationRequest {
        CreateReservationRequest {
            slot_id: Uuid::new_v4(),
            first_name: "  Ana ".into(),
            last_name: "Petrović".into(),
            phone: "+381601234567".into(),
            baby_name: "Luka".into(),
            baby_age_months: age,
            notes: Some("   ".into()),
        }
    }

    #[test]
    fn validation_trims_and_accepts_good_input() {
        let input = ReservationService::validate(request(6)).unwrap();
        assert_eq!(input.first_name, "Ana");
        assert_eq!(input.baby_age_months, 6);
        // Whitespace-only notes collapse to None.
        assert_eq!(input.notes, None);
    }

    #[test]
    fn validation_rejects_blank_required_fields() {
        let mut req = request(6);
        req.phone = "   ".into();
        assert!(matches!(
            ReservationService::validate(req),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn validation_bounds_baby_age() {
        assert!(ReservationService::validate(request(0)).is_ok());
        assert!(ReservationService::validate(request(36)).is_ok());
        assert!(matches!(
            ReservationService::validate(request(37)),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            ReservationService::validate(request(-1)),
            Err(ApiError::Validation(_))
        ));
    }
}
