pub mod health;
pub mod jobs;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /jobs              POST   submit a generation job
/// /jobs/{id}         GET    status snapshot
/// /jobs/{id}/ws      GET    push-delivery WebSocket
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(jobs::router())
}
