pub mod booking;
pub mod config;
pub mod meetings;
pub mod notifications;
pub mod offers;
pub mod shared;
pub mod slots;
pub mod store;

use axum::Router;
use std::sync::Arc;

use crate::shared::state::AppState;

/// Assembles the module routers into one API surface. The transport is
/// whatever the host application chooses; this crate only defines the
/// library-level contract plus this default axum wiring.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(slots::router(Arc::clone(&state)))
        .merge(booking::router(Arc::clone(&state)))
        .merge(meetings::router(state))
}
