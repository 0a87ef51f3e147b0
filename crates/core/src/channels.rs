//! Delivery channel registry for push-mode results.
//!
//! Callers that choose push delivery open a WebSocket scoped to a single
//! job. The registry holds the sender half of a per-connection channel,
//! keyed by job ID, so the completion path can push the formatted result
//! to whichever connection is currently attached to that job.
//!
//! Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
//! shared between the request layer (register/unregister) and the
//! completion handler (send).

use std::collections::HashMap;

use tokio::sync::{mpsc, RwLock};

use crate::types::JobId;

/// Channel sender half for pushing result payloads to a connection.
pub type ChannelSender = mpsc::UnboundedSender<serde_json::Value>;

/// Tracks the live push-delivery connection for each job.
///
/// A job has at most one registered channel; registering again replaces
/// the previous sender (the stale connection's receiver simply closes).
pub struct ChannelRegistry {
    channels: RwLock<HashMap<JobId, ChannelSender>>,
}

impl ChannelRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Register a connection for a job.
    ///
    /// Returns the receiver half so the caller can forward payloads to
    /// the underlying socket.
    pub async fn register(&self, job_id: JobId) -> mpsc::UnboundedReceiver<serde_json::Value> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.channels.write().await.insert(job_id, tx);
        tracing::info!(%job_id, "Push channel registered");
        rx
    }

    /// Remove the channel for a job, if one is registered.
    pub async fn unregister(&self, job_id: JobId) {
        if self.channels.write().await.remove(&job_id).is_some() {
            tracing::info!(%job_id, "Push channel unregistered");
        }
    }

    /// Push a result payload to the channel registered for `job_id`.
    ///
    /// A channel delivers exactly one result, so the entry is removed
    /// after a successful send. Returns `false` when no live channel is
    /// registered or the receiver side has already hung up; the caller
    /// logs and drops the payload (status polling is the fallback).
    pub async fn send_result(&self, job_id: JobId, payload: serde_json::Value) -> bool {
        let mut channels = self.channels.write().await;
        match channels.get(&job_id) {
            Some(sender) if sender.send(payload).is_ok() => {
                channels.remove(&job_id);
                true
            }
            Some(_) => {
                // Receiver dropped without unregistering.
                channels.remove(&job_id);
                false
            }
            None => false,
        }
    }

    /// Return the current number of registered channels.
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }

    /// Drop every registered channel.
    ///
    /// Used during graceful shutdown; closing the sender halves lets the
    /// per-connection forwarding tasks exit.
    pub async fn shutdown_all(&self) {
        let mut channels = self.channels.write().await;
        let count = channels.len();
        channels.clear();
        tracing::info!(count, "Dropped all push channels");
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
