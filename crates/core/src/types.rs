/// Leads are keyed by UUID so the client can derive a reference number
/// from the id alone.
pub type LeadId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
