use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::user::User,
    services::{
        email::EmailService,
        tokens::{generate_token, hash_token},
    },
};

const MIN_PASSWORD_LEN: usize = 8;

/// Passwordless link auth plus optional password auth, backed by hashed
/// one-shot tokens and DB sessions.
pub struct AuthService;

impl AuthService {
    /// Issue a verification or login link for the given address.
    ///
    /// Upserts the user, then: unverified account -> fresh verification
    /// token, verified account -> fresh login token. Calling it again simply
    /// resends a new link; the outcome is identical either way so the
    /// endpoint does not leak whether an account existed.
    pub async fn request_access(
        pool: &PgPool,
        email_svc: &EmailService,
        email: &str,
        token_ttl_minutes: i64,
    ) -> Result<(), ApiError> {
        let email = normalize_email(email)?;

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (email) VALUES ($1)
             ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
             RETURNING *",
        )
        .bind(&email)
        .fetch_one(pool)
        .await?;

        if user.email_verified_at.is_none() {
            let token =
                Self::create_email_verification_token(pool, user.id, token_ttl_minutes).await?;
            email_svc
                .send_verification_email(&user.email, &token)
                .await
                .map_err(ApiError::Internal)?;
        } else {
            let token = Self::create_login_token(pool, user.id, token_ttl_minutes).await?;
            email_svc
                .send_login_email(&user.email, &token)
                .await
                .map_err(ApiError::Internal)?;
        }

        Ok(())
    }

    /// Create an account with a password (or add a password to an existing
    /// passwordless account), then send a verification link.
    pub async fn register(
        pool: &PgPool,
        email_svc: &EmailService,
        email: &str,
        password: &str,
        token_ttl_minutes: i64,
    ) -> Result<(), ApiError> {
        let email = normalize_email(email)?;
        if password.len() < MIN_PASSWORD_LEN {
            return Err(ApiError::Validation(
                "Lozinka mora imati najmanje 8 karaktera.".into(),
            ));
        }

        let existing = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(&email)
            .fetch_optional(pool)
            .await?;

        let password_hash =
            bcrypt::hash(password, 12).map_err(|e| ApiError::Internal(e.into()))?;

        let user = match existing {
            Some(user) if user.password_hash.is_some() => {
                return Err(ApiError::Validation(
                    "Nalog sa ovim emailom već postoji. Prijavi se.".into(),
                ));
            }
            Some(user) => {
                sqlx::query("UPDATE users SET password_hash = $1, updated_at = now() WHERE id = $2")
                    .bind(&password_hash)
                    .bind(user.id)
                    .execute(pool)
                    .await?;
                user
            }
            None => {
                sqlx::query_as::<_, User>(
                    "INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING *",
                )
                .bind(&email)
                .bind(&password_hash)
                .fetch_one(pool)
                .await?
            }
        };

        if user.email_verified_at.is_none() {
            let token =
                Self::create_email_verification_token(pool, user.id, token_ttl_minutes).await?;
            email_svc
                .send_verification_email(&user.email, &token)
                .await
                .map_err(ApiError::Internal)?;
        }

        Ok(())
    }

    pub async fn login_with_password(
        pool: &PgPool,
        email: &str,
        password: &str,
    ) -> Result<User, ApiError> {
        const BAD_CREDENTIALS: &str = "Neispravan email ili lozinka.";

        let email = normalize_email(email)?;
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(&email)
            .fetch_optional(pool)
            .await?
            .ok_or(ApiError::Unauthorized(BAD_CREDENTIALS))?;

        let hash = user
            .password_hash
            .as_deref()
            .ok_or(ApiError::Unauthorized(BAD_CREDENTIALS))?;
        let valid = bcrypt::verify(password, hash)
            .map_err(|_| ApiError::Unauthorized(BAD_CREDENTIALS))?;
        if !valid {
            return Err(ApiError::Unauthorized(BAD_CREDENTIALS));
        }

        Ok(user)
    }

    async fn create_email_verification_token(
        pool: &PgPool,
        user_id: Uuid,
        ttl_minutes: i64,
    ) -> Result<String, ApiError> {
        let token = generate_token();
        let expires_at = Utc::now() + Duration::minutes(ttl_minutes);
        sqlx::query(
            "INSERT INTO email_verification_tokens (user_id, token_hash, expires_at)
             VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(hash_token(&token))
        .bind(expires_at)
        .execute(pool)
        .await?;
        Ok(token)
    }

    async fn create_login_token(
        pool: &PgPool,
        user_id: Uuid,
        ttl_minutes: i64,
    ) -> Result<String, ApiError> {
        let token = generate_token();
        let expires_at = Utc::now() + Duration::minutes(ttl_minutes);
        sqlx::query(
            "INSERT INTO login_tokens (user_id, token_hash, expires_at)
             VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(hash_token(&token))
        .bind(expires_at)
        .execute(pool)
        .await?;
        Ok(token)
    }

    /// Redeem a verification token: the conditional update is the single-use
    /// guard (first caller to flip used_at wins), then the account is marked
    /// verified.
    pub async fn redeem_verification_token(
        pool: &PgPool,
        token: &str,
    ) -> Result<Uuid, ApiError> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "UPDATE email_verification_tokens SET used_at = now()
             WHERE token_hash = $1 AND used_at IS NULL AND expires_at > now()
             RETURNING user_id",
        )
        .bind(hash_token(token))
        .fetch_optional(pool)
        .await?;

        let user_id = user_id.ok_or(ApiError::InvalidToken("Link nije važeći."))?;

        sqlx::query(
            "UPDATE users SET email_verified_at = COALESCE(email_verified_at, now()),
                 updated_at = now()
             WHERE id = $1",
        )
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(user_id)
    }

    /// Redeem a login token. Only verified accounts can log in this way.
    pub async fn redeem_login_token(pool: &PgPool, token: &str) -> Result<Uuid, ApiError> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "UPDATE login_tokens t SET used_at = now()
             FROM users u
             WHERE u.id = t.user_id
               AND t.token_hash = $1 AND t.used_at IS NULL AND t.expires_at > now()
               AND u.email_verified_at IS NOT NULL
             RETURNING t.user_id",
        )
        .bind(hash_token(token))
        .fetch_optional(pool)
        .await?;

        user_id.ok_or(ApiError::InvalidToken("Link nije važeći."))
    }

    /// Create a DB session; returns the cookie value and its expiry.
    pub async fn create_session(
        pool: &PgPool,
        user_id: Uuid,
        ttl_days: i64,
    ) -> Result<(String, DateTime<Utc>), ApiError> {
        let token = generate_token();
        let expires_at = Utc::now() + Duration::days(ttl_days);
        sqlx::query(
            "INSERT INTO sessions (user_id, token_hash, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(hash_token(&token))
        .bind(expires_at)
        .execute(pool)
        .await?;
        Ok((token, expires_at))
    }

    /// Resolve a session cookie value to its user, if the session is live.
    pub async fn session_user(pool: &PgPool, token: &str) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT u.* FROM sessions s
             JOIN users u ON u.id = s.user_id
             WHERE s.token_hash = $1 AND s.expires_at > now()
             LIMIT 1",
        )
        .bind(hash_token(token))
        .fetch_optional(pool)
        .await?;
        Ok(user)
    }

    pub async fn logout(pool: &PgPool, token: &str) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(hash_token(token))
            .execute(pool)
            .await?;
        Ok(())
    }
}

fn normalize_email(email: &str) -> Result<String, ApiError> {
    let email = email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(ApiError::Validation("Neispravan email.".into()));
    }
    Ok(email)
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !email.chars().any(char::is_whitespace)
        && !domain.contains('@')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("ana@example.com"));
        assert!(is_valid_email("ana.petrovic+spa@mail.example.rs"));
        assert!(!is_valid_email("ana@example"));
        assert!(!is_valid_email("ana example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ana@"));
        assert!(!is_valid_email("ana@@example.com"));
    }

    #[test]
    fn normalization_lowercases_and_trims() {
        assert_eq!(
            normalize_email("  Ana@Example.COM ").unwrap(),
            "ana@example.com"
        );
        assert!(normalize_email("not-an-email").is_err());
    }
}
