//! Per-job WebSocket push delivery.

pub mod handler;

pub use handler::job_ws_handler;
