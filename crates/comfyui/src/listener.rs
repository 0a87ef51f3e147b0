//! Long-lived event listener task.
//!
//! Owns the WebSocket connection to the backend and the correlation
//! state, and runs until the process-wide [`CancellationToken`] fires.
//! When the connection drops the listener re-enters the reconnect loop;
//! correlation state is kept across reconnects so a run that finishes
//! while the feed was down can still be completed from a later event.

use std::sync::Arc;

use relay_db::store::JobStore;
use tokio_util::sync::CancellationToken;

use crate::client::ComfyClient;
use crate::completion::CompletionHandler;
use crate::correlation::CorrelationState;
use crate::processor::process_messages;
use crate::reconnect::{reconnect_loop, ReconnectConfig};

/// The backend event listener.
pub struct EventListener {
    client: ComfyClient,
    store: Arc<dyn JobStore>,
    handler: Arc<CompletionHandler>,
    reconnect: ReconnectConfig,
}

impl EventListener {
    pub fn new(
        client: ComfyClient,
        store: Arc<dyn JobStore>,
        handler: Arc<CompletionHandler>,
        reconnect: ReconnectConfig,
    ) -> Self {
        Self {
            client,
            store,
            handler,
            reconnect,
        }
    }

    /// Spawn the listener onto its own task.
    pub fn spawn(self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run(cancel).await;
            tracing::info!("ComfyUI event listener stopped");
        })
    }

    /// Connect, process messages, reconnect on drop; loop until
    /// cancelled. Completion tasks spawned by the processor are
    /// detached and finish on their own.
    async fn run(self, cancel: CancellationToken) {
        let mut state = CorrelationState::new();

        let mut connection = match self.client.connect().await {
            Ok(conn) => Some(conn),
            Err(e) => {
                tracing::warn!(error = %e, "Initial ComfyUI connection failed, will retry");
                None
            }
        };

        loop {
            let mut conn = match connection.take() {
                Some(conn) => conn,
                None => match reconnect_loop(&self.client, &self.reconnect, &cancel).await {
                    Some(conn) => conn,
                    None => return,
                },
            };

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Event listener cancelled");
                    return;
                }
                _ = process_messages(&mut conn.ws_stream, &mut state, &self.store, &self.handler) => {
                    tracing::warn!(
                        client_id = %conn.client_id,
                        "ComfyUI event feed disconnected",
                    );
                }
            }
        }
    }
}
