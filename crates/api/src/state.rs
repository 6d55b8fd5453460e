use std::sync::Arc;

use cutline_core::service::TimelineService;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Timeline operations over the configured store.
    pub service: Arc<TimelineService>,
    pub config: Arc<ServerConfig>,
}
