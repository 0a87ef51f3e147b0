//! WebSocket handler for push-mode result delivery.
//!
//! A caller that submitted a job with `delivery_mode = push` opens a
//! socket scoped to that job. The connection registers a channel with
//! the shared [`ChannelRegistry`]; when the job completes, the
//! completion handler pushes the formatted payload through that channel
//! and the handler forwards it to the socket.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use relay_core::channels::ChannelRegistry;
use relay_core::types::JobId;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /api/v1/jobs/{id}/ws
///
/// Upgrade to a WebSocket that delivers the job's result when it
/// completes. Unknown job ids are rejected before the upgrade.
pub async fn job_ws_handler(
    ws: WebSocketUpgrade,
    Path(job_id): Path<JobId>,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let job = state
        .store
        .get_by_id(job_id)
        .await?
        .ok_or(AppError::NotFound {
            entity: "Job",
            id: job_id.to_string(),
        })?;

    let channels = Arc::clone(&state.channels);
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, job.job_id, channels)))
}

/// Manage a single job-scoped connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers a delivery channel for the job.
///   2. Spawns a sender task forwarding channel payloads to the sink.
///   3. Drains inbound messages on the current task until disconnect.
///   4. Unregisters the channel on the way out.
async fn handle_socket(socket: WebSocket, job_id: JobId, channels: Arc<ChannelRegistry>) {
    tracing::info!(%job_id, "Push-delivery WebSocket connected");

    let mut rx = channels.register(job_id).await;
    let (mut sink, mut stream) = socket.split();

    // Sender task: forward pushed payloads to the socket. The channel
    // closes after one delivered result, which ends this task.
    let sender_job_id = job_id;
    let send_task = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            let text = payload.to_string();
            if sink.send(Message::Text(text.into())).await.is_err() {
                tracing::debug!(job_id = %sender_job_id, "WebSocket sink closed");
                break;
            }
            tracing::info!(job_id = %sender_job_id, "Result forwarded to caller");
        }
    });

    // Inbound loop: the caller sends nothing meaningful; drain frames
    // until the socket closes so disconnects are observed promptly.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(%job_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(%job_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    channels.unregister(job_id).await;
    send_task.abort();
    tracing::info!(%job_id, "Push-delivery WebSocket disconnected");
}
