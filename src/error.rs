use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// API-boundary error. Services return this so handlers can map every failure
/// to a status code without inspecting strings.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Caller-fixable input problem (bad date, empty field, out-of-range age).
    #[error("{0}")]
    Validation(String),

    /// Slot no longer available.
    #[error("{0}")]
    Conflict(String),

    /// No or invalid session.
    #[error("{0}")]
    Unauthorized(&'static str),

    /// Valid session, insufficient rights (non-admin, unverified email).
    #[error("{0}")]
    Forbidden(&'static str),

    /// Token lookups: missing, used and expired are deliberately
    /// indistinguishable so the response is not a token-guessing oracle.
    #[error("{0}")]
    InvalidToken(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    RateLimited(&'static str),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Internal(e.into())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidToken(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Internal(ref e) = self {
            tracing::error!("internal error: {e:#}");
            // Do not leak internals to the client.
            return (status, Json(json!({ "error": "Server error" }))).into_response();
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(
            ApiError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Conflict("x".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError::Unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::InvalidToken("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
