//! HTTP handlers for the drs-notify service
//!
//! - [`notify`]: SNS delivery endpoint
//! - [`status`]: health and status endpoints

pub mod notify;
pub mod status;

use std::sync::Arc;

use axum::Router;

pub use notify::{notification_handler, notify_router, outcome_status, NotifyState};
pub use status::{status_router, AppState};

/// Full application router: `/notifications`, `/health` and `/status`
pub fn app_router(state: Arc<NotifyState>) -> Router {
    let status = state.status.clone();
    notify_router(state).merge(status_router(status))
}
