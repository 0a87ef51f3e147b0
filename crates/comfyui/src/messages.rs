//! ComfyUI WebSocket message types and parser.
//!
//! ComfyUI sends JSON messages over WebSocket with the shape
//! `{"type": "<kind>", "data": {...}}`. The event vocabulary is open
//! ended, so parsing goes through a raw envelope: known kinds become
//! typed variants, anything else degrades to [`ComfyMessage::Unknown`]
//! which the processor skips. Only malformed JSON (or a known kind with
//! a bad payload) is an error.

use serde::Deserialize;

/// The subset of ComfyUI message kinds the relay acts on, plus a
/// catch-all for everything else.
#[derive(Debug, Clone)]
pub enum ComfyMessage {
    /// Server status broadcast carrying the remaining queue depth.
    Status(StatusData),

    /// The prompt currently being processed.
    ProgressState(ProgressStateData),

    /// A node finished and produced output.
    Executed(ExecutedData),

    /// A prompt finished executing (explicit completion marker).
    ExecutionSuccess(ExecutionSuccessData),

    /// Any message kind the relay does not act on. Always safe to skip.
    Unknown { kind: String },
}

/// Raw `{"type", "data"}` envelope.
#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Queue status information.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusData {
    pub status: QueueStatus,
}

/// Current queue state.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueStatus {
    pub exec_info: ExecInfo,
}

/// Execution queue statistics.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecInfo {
    pub queue_remaining: i64,
}

/// Payload for `progress_state` messages.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressStateData {
    pub prompt_id: String,
}

/// Payload for `executed` messages (per-node output).
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutedData {
    /// The node that produced this output.
    pub node: String,
    /// Raw output value (images, filenames, etc.).
    pub output: serde_json::Value,
    pub prompt_id: String,
}

/// Payload for `execution_success` messages.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionSuccessData {
    pub prompt_id: String,
}

/// Parse a ComfyUI WebSocket text message.
///
/// Returns `Err` for malformed JSON or a known kind whose payload does
/// not match; callers log and continue. Unknown kinds parse to
/// [`ComfyMessage::Unknown`].
pub fn parse_message(text: &str) -> Result<ComfyMessage, serde_json::Error> {
    let raw: RawMessage = serde_json::from_str(text)?;
    let msg = match raw.kind.as_str() {
        "status" => ComfyMessage::Status(serde_json::from_value(raw.data)?),
        "progress_state" => ComfyMessage::ProgressState(serde_json::from_value(raw.data)?),
        "executed" => ComfyMessage::Executed(serde_json::from_value(raw.data)?),
        "execution_success" => ComfyMessage::ExecutionSuccess(serde_json::from_value(raw.data)?),
        _ => ComfyMessage::Unknown { kind: raw.kind },
    };
    Ok(msg)
}
