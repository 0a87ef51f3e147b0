//! Fixed-delay reconnection for the ComfyUI event feed.
//!
//! The event feed is the sole path to completion detection, so when the
//! connection drops the listener calls [`reconnect_loop`] to retry
//! forever with a fixed delay between attempts, until either a
//! connection succeeds or the [`CancellationToken`] is triggered.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::client::{ComfyClient, ComfyConnection};

/// Tunable parameters for reconnection.
pub struct ReconnectConfig {
    /// Delay between the disconnect and each reconnection attempt.
    pub delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5),
        }
    }
}

/// Reconnect to the backend with a fixed delay between attempts.
///
/// Returns `Some(connection)` once a connection succeeds, or `None` if
/// the `cancel` token is triggered first. There is no retry bound.
pub async fn reconnect_loop(
    client: &ComfyClient,
    config: &ReconnectConfig,
    cancel: &CancellationToken,
) -> Option<ComfyConnection> {
    let mut attempt = 0u64;

    loop {
        // Wait out the fixed delay, respecting cancellation.
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Reconnect cancelled");
                return None;
            }
            _ = tokio::time::sleep(config.delay) => {}
        }

        attempt += 1;
        tracing::info!(
            attempt,
            delay_ms = config.delay.as_millis() as u64,
            "Reconnecting to ComfyUI",
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Reconnect cancelled");
                return None;
            }
            result = client.connect() => {
                match result {
                    Ok(conn) => {
                        tracing::info!(attempt, "Reconnected to ComfyUI");
                        return Some(conn);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Reconnect attempt {attempt} failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_delay_is_five_seconds() {
        let config = ReconnectConfig::default();
        assert_eq!(config.delay, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn cancellation_token_stops_reconnect() {
        let cancel = CancellationToken::new();
        // Cancel immediately: reconnect_loop should return None without
        // trying to connect.
        cancel.cancel();

        let client = ComfyClient::new("ws://localhost:9999".into());
        let config = ReconnectConfig::default();

        let result = reconnect_loop(&client, &config, &cancel).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn cancellation_during_delay_stops_reconnect() {
        let cancel = CancellationToken::new();
        let client = ComfyClient::new("ws://localhost:9999".into());
        let config = ReconnectConfig {
            delay: Duration::from_secs(60),
        };

        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel_clone.cancel();
        });

        let result = reconnect_loop(&client, &config, &cancel).await;
        assert!(result.is_none());
    }
}
