use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};

use crate::{error::ApiError, models::user::User, services::auth::AuthService, AppState};

pub const SESSION_COOKIE_NAME: &str = "bs_session";

/// Extract a named cookie value from request headers.
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|part| {
            let part = part.trim();
            if part.starts_with(&prefix) {
                Some(part[prefix.len()..].to_string())
            } else {
                None
            }
        })
}

/// The user behind a live session cookie. Keeps the raw cookie value around
/// so logout can delete the matching session row.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user: User,
    pub session_token: String,
}

impl<S> FromRequestParts<S> for SessionUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let token = get_cookie(&parts.headers, SESSION_COOKIE_NAME)
            .ok_or(ApiError::Unauthorized("Niste ulogovani."))?;

        let user = AuthService::session_user(&state.db, &token)
            .await?
            .ok_or(ApiError::Unauthorized("Niste ulogovani."))?;

        Ok(SessionUser {
            user,
            session_token: token,
        })
    }
}

/// Session user with the ADMIN role; rejects everyone else.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl<S> FromRequestParts<S> for AdminUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = SessionUser::from_request_parts(parts, state).await?;
        if !session.user.is_admin() {
            return Err(ApiError::Forbidden("Niste admin."));
        }
        Ok(AdminUser(session.user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn cookie_extraction_handles_multiple_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; bs_session=abc123; lang=sr"),
        );
        assert_eq!(
            get_cookie(&headers, SESSION_COOKIE_NAME).as_deref(),
            Some("abc123")
        );
        assert_eq!(get_cookie(&headers, "missing"), None);
    }
}
