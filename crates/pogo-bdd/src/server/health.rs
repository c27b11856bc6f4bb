use std::time::Duration;

use log::debug;
use tokio::time::Instant;

use crate::http::HttpClient;

/// Polls `health_url` until it answers HTTP 200.
///
/// `exited` is consulted before every attempt; when it reports that the
/// process behind the URL is gone, polling stops early with that reason.
pub async fn wait_until_ready<F>(
    client: &HttpClient,
    health_url: &str,
    interval: Duration,
    timeout: Duration,
    mut exited: F,
) -> Result<(), String>
where
    F: FnMut() -> Option<String>,
{
    let deadline = Instant::now() + timeout;
    let mut attempts = 0u32;

    loop {
        if let Some(reason) = exited() {
            return Err(reason);
        }

        attempts += 1;
        let last_error = match client.is_ok(health_url).await {
            Ok(true) => {
                debug!("{} ready after {} attempts", health_url, attempts);
                return Ok(());
            }
            Ok(false) => "health endpoint answered with a non-200 status".to_string(),
            Err(e) => e.to_string(),
        };

        if Instant::now() + interval > deadline {
            return Err(format!("{} attempts, last error: {}", attempts, last_error));
        }
        tokio::time::sleep(interval).await;
    }
}
