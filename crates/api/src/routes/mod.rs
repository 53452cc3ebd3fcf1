pub mod health;
pub mod leads;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /leads                  POST create, GET /{reference} lookup
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/leads", leads::router())
}
