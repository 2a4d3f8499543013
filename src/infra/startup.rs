//! Bootstrap helpers for connecting to the backing stores.

use std::fmt::Display;
use std::future::Future;

use tracing::{info, warn};

use crate::config::StartupSettings;

/// Run `connect` until it succeeds or the configured attempts are used up,
/// sleeping the fixed retry delay between attempts.
pub async fn connect_with_retry<T, E, F, Fut>(
    store: &'static str,
    settings: &StartupSettings,
    mut connect: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = settings.connect_attempts.get();
    let mut attempt = 1;
    loop {
        match connect().await {
            Ok(value) => {
                info!(target = "trellis::startup", store, attempt, "connected");
                return Ok(value);
            }
            Err(err) if attempt < attempts => {
                warn!(
                    target = "trellis::startup",
                    store,
                    attempt,
                    attempts,
                    retry_in_ms = settings.retry_delay.as_millis() as u64,
                    error = %err,
                    "connection attempt failed"
                );
                tokio::time::sleep(settings.retry_delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
