use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use redis::Client as RedisClient;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use babyspa_api::{build_router, config::Config, db, services::email::EmailService, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let redis_client = RedisClient::open(config.redis_url.as_str())?;
    let redis_conn = redis_client.get_multiplexed_async_connection().await?;
    info!("Redis connected");

    let email = Arc::new(EmailService::new(&config)?);
    if email.is_dry_run() {
        info!("SMTP not configured, emails will be logged instead of sent");
    } else {
        info!("SMTP email service configured");
    }

    let state = AppState {
        db: pool.clone(),
        redis: redis_conn,
        config: config.clone(),
        email: email.clone(),
    };

    // Allow the configured frontend origin plus localhost for development.
    let app_url = config.app_url.clone();
    let cors_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        let Ok(o) = origin.to_str() else {
            return false;
        };
        if o.starts_with("http://localhost") || o.starts_with("http://127.0.0.1") {
            return true;
        }
        o == app_url
    });
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::HeaderName::from_static("x-cron-secret"),
        ]))
        .allow_credentials(true)
        .allow_origin(cors_origin);

    babyspa_api::services::reminders::start(pool, email);

    let app = build_router(state, cors);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Baby Spa API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
