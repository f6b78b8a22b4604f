use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::ApiError,
    middleware::auth::SessionUser,
    models::booking::CreateReservationRequest,
    services::reservations::ReservationService,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct CancelQuery {
    pub token: Option<String>,
}

/// Book a slot. The confirmation email is sent after commit and is best
/// effort; a failed send never undoes the booking.
pub async fn create_reservation(
    State(state): State<AppState>,
    session: SessionUser,
    Json(body): Json<CreateReservationRequest>,
) -> Result<Json<Value>, ApiError> {
    if session.user.email_verified_at.is_none() {
        return Err(ApiError::Forbidden("Email nije potvrdjen."));
    }

    let input = ReservationService::validate(body)?;
    let confirmation = ReservationService::reserve(
        &state.db,
        &session.user,
        input,
        state.config.booking_window_days,
    )
    .await?;

    let cancel_url = format!(
        "{}/api/reservations/cancel?token={}",
        state.config.app_url, confirmation.cancel_token
    );
    if let Err(e) = state
        .email
        .send_reservation_confirmation(
            &confirmation.email,
            &confirmation.date_label,
            &confirmation.time_label,
            &cancel_url,
            &confirmation.baby_label,
        )
        .await
    {
        tracing::warn!(
            "confirmation email failed for reservation {}: {e}",
            confirmation.reservation_id
        );
    }

    Ok(Json(json!({ "id": confirmation.reservation_id })))
}

fn cancel_page(title: &str, detail: &str) -> String {
    format!(
        "<!doctype html><html lang=\"sr\"><head><meta charset=\"utf-8\">\
         <title>Baby Spa</title></head>\
         <body style=\"font-family: sans-serif; text-align: center; padding: 48px;\">\
         <h2>{title}</h2><p>{detail}</p></body></html>"
    )
}

/// Cancel-link target. Link clicks land in a browser, so responses are small
/// HTML pages rather than JSON.
pub async fn cancel_reservation(
    State(state): State<AppState>,
    Query(query): Query<CancelQuery>,
) -> Response {
    let Some(token) = query.token.filter(|t| !t.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Html(cancel_page("Neispravan link.", "Nedostaje token za otkazivanje.")),
        )
            .into_response();
    };

    match ReservationService::cancel(&state.db, &token).await {
        Ok(outcome) => {
            if let Err(e) = state
                .email
                .send_reservation_canceled(&outcome.email, &outcome.date_label, &outcome.time_label)
                .await
            {
                tracing::warn!("cancellation email failed: {e}");
            }
            Html(cancel_page(
                "Termin je otkazan.",
                "Hvala sto ste nas obavestili.",
            ))
            .into_response()
        }
        Err(ApiError::InvalidToken(_)) => (
            StatusCode::BAD_REQUEST,
            Html(cancel_page(
                "Link nije vazeci.",
                "Link za otkazivanje je vec iskoriscen ili je istekao.",
            )),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("cancellation failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(cancel_page("Greska.", "Pokusaj ponovo kasnije.")),
            )
                .into_response()
        }
    }
}
