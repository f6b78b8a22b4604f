use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::ApiError,
    middleware::{
        auth::{SessionUser, SESSION_COOKIE_NAME},
        rate_limit::check_rate_limit,
    },
    models::user::{
        PasswordLoginRequest, ProfileResponse, RegisterRequest, RequestAccessRequest,
    },
    services::auth::AuthService,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

fn session_cookie(state: &AppState, token: &str, expires_at: DateTime<Utc>) -> String {
    let max_age = (expires_at - Utc::now()).num_seconds().max(0);
    let secure = if state.config.app_url.starts_with("https://") {
        "; Secure"
    } else {
        ""
    };
    format!(
        "{SESSION_COOKIE_NAME}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age}{secure}"
    )
}

fn redirect_with_cookie(location: &str, cookie: Option<&str>) -> Response {
    let mut builder = Response::builder()
        .status(StatusCode::SEE_OTHER)
        .header(header::LOCATION, location);
    if let Some(cookie) = cookie {
        builder = builder.header(header::SET_COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap_or_default()
}

/// Send a verification link (unverified account) or a login link (verified
/// account). Creates the account on first contact.
pub async fn request_access(
    State(state): State<AppState>,
    Json(body): Json<RequestAccessRequest>,
) -> Result<Json<Value>, ApiError> {
    let rate_key = format!("rate:access:{}", body.email.to_lowercase());
    let mut redis = state.redis.clone();
    check_rate_limit(&mut redis, &rate_key, 5, 900).await?;

    AuthService::request_access(
        &state.db,
        &state.email,
        &body.email,
        state.config.token_ttl_minutes,
    )
    .await?;

    Ok(Json(json!({ "ok": true })))
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<Value>, ApiError> {
    let rate_key = format!("rate:register:{}", body.email.to_lowercase());
    let mut redis = state.redis.clone();
    check_rate_limit(&mut redis, &rate_key, 3, 1800).await?;

    AuthService::register(
        &state.db,
        &state.email,
        &body.email,
        &body.password,
        state.config.token_ttl_minutes,
    )
    .await?;

    Ok(Json(json!({ "ok": true })))
}

pub async fn login_password(
    State(state): State<AppState>,
    Json(body): Json<PasswordLoginRequest>,
) -> Result<Response, ApiError> {
    let rate_key = format!("rate:login:{}", body.email.to_lowercase());
    let mut redis = state.redis.clone();
    check_rate_limit(&mut redis, &rate_key, 5, 900).await?;

    let user = AuthService::login_with_password(&state.db, &body.email, &body.password).await?;
    let (token, expires_at) =
        AuthService::create_session(&state.db, user.id, state.config.session_ttl_days).await?;

    let profile = ProfileResponse::from(user);
    let body = serde_json::to_string(&profile).unwrap_or_default();
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .header(
            header::SET_COOKIE,
            session_cookie(&state, &token, expires_at),
        )
        .body(Body::from(body))
        .unwrap_or_default();
    Ok(response)
}

/// Email-verification link target. Link clicks land in a browser, so every
/// outcome is a redirect back to the app rather than a JSON body.
pub async fn verify(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Response {
    let app_url = &state.config.app_url;
    let Some(token) = query.token.filter(|t| !t.is_empty()) else {
        return redirect_with_cookie(&format!("{app_url}/login?error=missing-token"), None);
    };

    match AuthService::redeem_verification_token(&state.db, &token).await {
        Ok(user_id) => {
            match AuthService::create_session(&state.db, user_id, state.config.session_ttl_days)
                .await
            {
                Ok((session_token, expires_at)) => {
                    let cookie = session_cookie(&state, &session_token, expires_at);
                    redirect_with_cookie(&format!("{app_url}/?verified=1"), Some(&cookie))
                }
                Err(e) => {
                    tracing::error!("session create failed after verification: {e}");
                    redirect_with_cookie(&format!("{app_url}/login?error=server"), None)
                }
            }
        }
        Err(ApiError::InvalidToken(_)) => {
            redirect_with_cookie(&format!("{app_url}/login?error=invalid-token"), None)
        }
        Err(e) => {
            tracing::error!("verification failed: {e}");
            redirect_with_cookie(&format!("{app_url}/login?error=server"), None)
        }
    }
}

/// Login-link target; same redirect surface as `verify`.
pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Response {
    let app_url = &state.config.app_url;
    let Some(token) = query.token.filter(|t| !t.is_empty()) else {
        return redirect_with_cookie(&format!("{app_url}/login?error=missing-token"), None);
    };

    match AuthService::redeem_login_token(&state.db, &token).await {
        Ok(user_id) => {
            match AuthService::create_session(&state.db, user_id, state.config.session_ttl_days)
                .await
            {
                Ok((session_token, expires_at)) => {
                    let cookie = session_cookie(&state, &session_token, expires_at);
                    redirect_with_cookie(&format!("{app_url}/?login=1"), Some(&cookie))
                }
                Err(e) => {
                    tracing::error!("session create failed after login: {e}");
                    redirect_with_cookie(&format!("{app_url}/login?error=server"), None)
                }
            }
        }
        Err(ApiError::InvalidToken(_)) => {
            redirect_with_cookie(&format!("{app_url}/login?error=invalid-token"), None)
        }
        Err(e) => {
            tracing::error!("login failed: {e}");
            redirect_with_cookie(&format!("{app_url}/login?error=server"), None)
        }
    }
}

pub async fn logout(
    State(state): State<AppState>,
    session: SessionUser,
) -> Result<Response, ApiError> {
    AuthService::logout(&state.db, &session.session_token).await?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .header(
            header::SET_COOKIE,
            format!("{SESSION_COOKIE_NAME}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0"),
        )
        .body(Body::from(r#"{"ok":true}"#))
        .unwrap_or_default();
    Ok(response)
}

pub async fn me(session: SessionUser) -> Json<ProfileResponse> {
    Json(ProfileResponse::from(session.user))
}
