//! WebSocket message processing loop.
//!
//! Reads raw frames from the backend event feed, parses them into typed
//! [`ComfyMessage`] variants, feeds the correlation state, and hands
//! completion triggers to the [`CompletionHandler`]. Completion work is
//! spawned onto its own task so a slow history fetch, file download or
//! webhook POST never stalls frame ingestion.

use std::sync::Arc;

use futures::StreamExt;
use relay_db::store::JobStore;
use tokio_tungstenite::tungstenite::Message;

use crate::completion::CompletionHandler;
use crate::correlation::CorrelationState;
use crate::messages::{parse_message, ComfyMessage};

/// Process WebSocket messages from a backend connection.
///
/// Loops until the WebSocket closes, encounters a fatal receive error,
/// or the stream is exhausted. A malformed frame is logged and skipped;
/// only connection-level failures end the loop (and with it drive the
/// caller's reconnect).
pub async fn process_messages(
    ws_stream: &mut tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    state: &mut CorrelationState,
    store: &Arc<dyn JobStore>,
    handler: &Arc<CompletionHandler>,
) {
    while let Some(msg_result) = ws_stream.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                handle_text_message(&text, state, store, handler).await;
            }
            Ok(Message::Binary(_)) => {
                // ComfyUI sends binary frames for preview images.
                tracing::trace!("Ignoring binary message (preview image)");
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {
                // Handled automatically by tungstenite.
            }
            Ok(Message::Close(frame)) => {
                tracing::info!(?frame, "ComfyUI WebSocket closed");
                break;
            }
            Ok(Message::Frame(_)) => {}
            Err(e) => {
                tracing::error!(error = %e, "WebSocket receive error");
                break;
            }
        }
    }
}

/// Dispatch a single text frame.
async fn handle_text_message(
    text: &str,
    state: &mut CorrelationState,
    store: &Arc<dyn JobStore>,
    handler: &Arc<CompletionHandler>,
) {
    match parse_message(text) {
        Ok(msg) => match msg {
            ComfyMessage::Status(data) => {
                let remaining = data.status.exec_info.queue_remaining;
                tracing::debug!(queue_remaining = remaining, "ComfyUI queue status");
                if let Some(prompt_id) = state.observe_queue(remaining) {
                    tracing::info!(
                        prompt_id = %prompt_id,
                        queue_remaining = remaining,
                        "Queue decreased, inferring run completion",
                    );
                    spawn_completion(handler, prompt_id, None);
                }
            }
            ComfyMessage::ProgressState(data) => {
                state.observe_prompt(&data.prompt_id);
                match store.mark_running(&data.prompt_id).await {
                    Ok(changed) => {
                        if changed {
                            tracing::debug!(prompt_id = %data.prompt_id, "Job marked running");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to mark job running");
                    }
                }
            }
            ComfyMessage::Executed(data) => {
                tracing::debug!(
                    prompt_id = %data.prompt_id,
                    node = %data.node,
                    "Node executed with output",
                );
                state.observe_prompt(&data.prompt_id);
                state.record_output(&data.prompt_id, &data.node, data.output);
            }
            ComfyMessage::ExecutionSuccess(data) => {
                tracing::info!(prompt_id = %data.prompt_id, "Run finished (explicit marker)");
                let manifest = state.take_outputs(&data.prompt_id);
                spawn_completion(handler, data.prompt_id, manifest);
            }
            ComfyMessage::Unknown { kind } => {
                tracing::trace!(kind = %kind, "Skipping unhandled message kind");
            }
        },
        Err(e) => {
            tracing::warn!(
                error = %e,
                raw_message = %text,
                "Failed to parse ComfyUI message",
            );
        }
    }
}

/// Run the completion handler on its own task.
fn spawn_completion(
    handler: &Arc<CompletionHandler>,
    prompt_id: String,
    manifest: Option<serde_json::Value>,
) {
    let handler = Arc::clone(handler);
    tokio::spawn(async move {
        match handler.handle(&prompt_id, manifest).await {
            Ok(outcome) => {
                tracing::debug!(prompt_id = %prompt_id, ?outcome, "Completion handled");
            }
            Err(e) => {
                tracing::error!(prompt_id = %prompt_id, error = %e, "Completion handling failed");
            }
        }
    });
}
