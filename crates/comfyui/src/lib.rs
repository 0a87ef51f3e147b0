//! Bridge to the ComfyUI generation backend.
//!
//! Provides typed event parsing, the long-lived event listener with
//! completion correlation, the completion handler with output
//! formatting, HTTP API wrappers, and the submission path.

pub mod api;
pub mod client;
pub mod completion;
pub mod correlation;
pub mod delivery;
pub mod listener;
pub mod messages;
pub mod output;
pub mod processor;
pub mod reconnect;
pub mod submit;
pub mod workflow;
