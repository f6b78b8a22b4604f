pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod timeutil;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::trace::TraceLayer;

use config::Config;
use services::email::EmailService;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub redis: redis::aio::MultiplexedConnection,
    pub config: Arc<Config>,
    pub email: Arc<EmailService>,
}

pub fn build_router(state: AppState, cors: tower_http::cors::CorsLayer) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        // Auth
        .route("/api/auth/request-access", post(routes::auth::request_access))
        .route("/api/auth/register", post(routes::auth::register))
        .route("/api/auth/login-password", post(routes::auth::login_password))
        .route("/api/auth/verify", get(routes::auth::verify))
        .route("/api/auth/login", get(routes::auth::login))
        .route("/api/auth/logout", post(routes::auth::logout))
        .route("/api/me", get(routes::auth::me))
        // Slots
        .route("/api/slots", get(routes::slots::list_slots))
        // Reservations
        .route("/api/reservations", post(routes::reservations::create_reservation))
        .route("/api/reservations/cancel", get(routes::reservations::cancel_reservation))
        // Admin calendar
        .route(
            "/api/admin/work-days",
            get(routes::admin::list_work_days).post(routes::admin::upsert_work_day),
        )
        .route(
            "/api/admin/work-days/{id}/generate-slots",
            post(routes::admin::generate_slots),
        )
        .route("/api/admin/reservations", get(routes::admin::list_reservations))
        // Cron
        .route("/api/cron/reminders", post(routes::cron::run_reminders))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
