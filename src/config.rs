use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub host: String,
    pub port: u16,
    pub app_url: String,
    pub session_ttl_days: i64,
    pub token_ttl_minutes: i64,
    pub booking_window_days: i64,
    pub cron_secret: Option<String>,
    // SMTP (optional — missing config degrades email to a logged dry run)
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()?;
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            app_url: env::var("APP_URL").unwrap_or_else(|_| format!("http://localhost:{port}")),
            session_ttl_days: env::var("SESSION_TTL_DAYS")
                .unwrap_or_else(|_| "7".into())
                .parse()?,
            token_ttl_minutes: env::var("TOKEN_TTL_MINUTES")
                .unwrap_or_else(|_| "30".into())
                .parse()?,
            booking_window_days: env::var("BOOKING_WINDOW_DAYS")
                .unwrap_or_else(|_| "7".into())
                .parse()?,
            cron_secret: env::var("CRON_SECRET").ok().filter(|s| !s.is_empty()),
            smtp_host: env::var("SMTP_HOST").ok().filter(|s| !s.is_empty()),
            smtp_port: env::var("SMTP_PORT").ok().and_then(|v| v.parse().ok()),
            smtp_username: env::var("SMTP_USERNAME").ok().filter(|s| !s.is_empty()),
            smtp_password: env::var("SMTP_PASSWORD").ok().filter(|s| !s.is_empty()),
            smtp_from: env::var("SMTP_FROM").ok().filter(|s| !s.is_empty()),
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required env var: {}", key))
}
