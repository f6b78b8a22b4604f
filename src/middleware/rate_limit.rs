use crate::error::ApiError;

/// Count one attempt against `key` and reject once the window's budget is
/// spent. The Redis counter carries the whole state: INCR per attempt, a
/// TTL of `window_secs` set when the key first appears, and over-budget
/// counts map to the Serbian 429. An unreachable Redis skips the limit
/// instead of locking every caller out.
pub async fn check_rate_limit(
    redis: &mut redis::aio::MultiplexedConnection,
    key: &str,
    max_attempts: u64,
    window_secs: u64,
) -> Result<(), ApiError> {
    let count: u64 = redis::cmd("INCR")
        .arg(key)
        .query_async(redis)
        .await
        .unwrap_or(0);

    if count == 1 {
        // A fresh key starts its window; later attempts must not extend it.
        let _: Result<(), _> = redis::cmd("EXPIRE")
            .arg(key)
            .arg(window_secs)
            .query_async(redis)
            .await;
    }

    if count > max_attempts {
        return Err(ApiError::RateLimited(
            "Previše pokušaja. Pokušaj ponovo za nekoliko minuta.",
        ));
    }

    Ok(())
}
