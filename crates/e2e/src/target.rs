//! Reachability probe for the application under test

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Poll `url` until it answers with any HTTP response or `budget` runs out.
///
/// Any HTTP status counts as reachable; only connection-level failures keep
/// the probe waiting.
pub async fn wait_until_reachable(url: &str, budget: Duration) -> E2eResult<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()?;

    let start = Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;

        match client.get(url).send().await {
            Ok(resp) => {
                if !resp.status().is_success() {
                    warn!("{} answered {}", url, resp.status());
                }
                info!("Target is up at {}", url);
                return Ok(());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for {} to come up...", url);
                }
                // Connection refused is expected while the dev server starts
                if !e.is_connect() && !e.is_timeout() {
                    warn!("Probe error: {}", e);
                }
            }
        }

        if start.elapsed() + POLL_INTERVAL >= budget {
            break;
        }
        sleep(POLL_INTERVAL).await;
    }

    Err(E2eError::TargetUnreachable {
        url: url.to_string(),
        attempts,
    })
}
