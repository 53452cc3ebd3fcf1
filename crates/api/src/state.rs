use std::sync::Arc;

use glasslead_db::store::LeadStore;
use glasslead_events::EventBus;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Lead persistence (Postgres in production, in-memory in tests).
    pub store: Arc<dyn LeadStore>,
    pub config: Arc<ServerConfig>,
    /// Carries `lead.submitted` to the notification relay.
    pub event_bus: Arc<EventBus>,
}
