//! Route definitions for lead capture.
//!
//! Mounted at `/leads` by `api_routes()`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::leads;
use crate::state::AppState;

/// ```text
/// POST   /               create_lead
/// GET    /{reference}    get_lead_by_reference
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(leads::create_lead))
        .route("/{reference}", get(leads::get_lead_by_reference))
}
