use std::sync::Arc;

use relay_comfyui::api::ComfyService;
use relay_core::channels::ChannelRegistry;
use relay_db::JobStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: relay_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Job store used by the submission and status handlers.
    pub store: Arc<dyn JobStore>,
    /// ComfyUI HTTP API client.
    pub comfy: Arc<dyn ComfyService>,
    /// Push-delivery channel registry shared with the completion handler.
    pub channels: Arc<ChannelRegistry>,
}
