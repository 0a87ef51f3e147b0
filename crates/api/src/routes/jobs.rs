//! Route definitions for the `/jobs` resource.
//!
//! ```text
//! POST   /jobs            submit_job
//! GET    /jobs/{id}       get_job
//! GET    /jobs/{id}/ws    job_ws_handler
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;
use crate::ws;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/jobs", post(jobs::submit_job))
        .route("/jobs/{id}", get(jobs::get_job))
        .route("/jobs/{id}/ws", get(ws::job_ws_handler))
}
