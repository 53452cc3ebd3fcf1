#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Invalid transition: cannot apply '{event}' while {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}
