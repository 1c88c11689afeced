//! Feature slices of the import API
//!
//! Each feature is a vertical slice with its own `commands/` (writes),
//! `queries/` (reads) and `routes.rs`. Commands and queries are plain data
//! types marked with `mediator::Request`; each has a standalone `handle`
//! function that does the work.

pub mod imports;

use axum::Router;
use std::time::Duration;

use crate::imports::ImportService;

/// Shared state for the feature routes
#[derive(Clone)]
pub struct FeatureState {
    pub imports: ImportService,
    /// Upper bound on how long a long-poll may hold a request open
    pub long_poll_max: Duration,
}

/// Mounts every feature under its path prefix:
/// - `/imports` - submit uploads, poll jobs, fetch results
/// - `/tables` - target tables and single-record retry
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .nest("/imports", imports::imports_routes().with_state(state.clone()))
        .nest("/tables", imports::tables_routes().with_state(state))
}
