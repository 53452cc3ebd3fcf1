//! The lead storage seam used by the API.
//!
//! [`PgLeadStore`] delegates to [`LeadRepo`]; [`MemoryLeadStore`] keeps rows
//! in a `Vec` and enforces the same unique constraints, so handler tests run
//! without a database.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use glasslead_core::types::Timestamp;

use crate::models::lead::{Lead, NewLead};
use crate::repositories::LeadRepo;
use crate::DbPool;

/// Unique constraint on `leads.reference_number`.
pub const UQ_REFERENCE_NUMBER: &str = "uq_leads_reference_number";

/// Unique constraint on `leads.idempotency_key`.
pub const UQ_IDEMPOTENCY_KEY: &str = "uq_leads_idempotency_key";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A unique constraint rejected the insert.
    #[error("Duplicate value violates unique constraint: {constraint}")]
    Conflict { constraint: String },

    #[error("Lead store is unavailable")]
    Unavailable,
}

impl StoreError {
    /// Reclassify a Postgres unique violation (`23505`) as [`StoreError::Conflict`].
    fn from_insert(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some("23505") {
                return Self::Conflict {
                    constraint: db_err.constraint().unwrap_or("unknown").to_string(),
                };
            }
        }
        Self::Database(err)
    }

    pub fn is_conflict_on(&self, constraint: &str) -> bool {
        matches!(self, Self::Conflict { constraint: c } if c == constraint)
    }
}

#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn insert(&self, lead: NewLead) -> Result<Lead, StoreError>;

    async fn find_by_reference(&self, reference_number: &str) -> Result<Option<Lead>, StoreError>;

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Lead>, StoreError>;

    /// Most recent lead for this session and phone submitted at or after
    /// `since`.
    async fn find_recent_duplicate(
        &self,
        session_id: &str,
        phone_e164: &str,
        since: Timestamp,
    ) -> Result<Option<Lead>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgLeadStore {
    pool: DbPool,
}

impl PgLeadStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeadStore for PgLeadStore {
    async fn insert(&self, lead: NewLead) -> Result<Lead, StoreError> {
        LeadRepo::create(&self.pool, &lead)
            .await
            .map_err(StoreError::from_insert)
    }

    async fn find_by_reference(&self, reference_number: &str) -> Result<Option<Lead>, StoreError> {
        Ok(LeadRepo::find_by_reference(&self.pool, reference_number).await?)
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Lead>, StoreError> {
        Ok(LeadRepo::find_by_idempotency_key(&self.pool, key).await?)
    }

    async fn find_recent_duplicate(
        &self,
        session_id: &str,
        phone_e164: &str,
        since: Timestamp,
    ) -> Result<Option<Lead>, StoreError> {
        Ok(
            LeadRepo::find_recent_by_session_phone(&self.pool, session_id, phone_e164, since)
                .await?,
        )
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(crate::health_check(&self.pool).await?)
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryLeadStore {
    leads: Mutex<Vec<Lead>>,
}

impl MemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored leads.
    pub fn len(&self) -> usize {
        self.leads.lock().map(|leads| leads.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn find(&self, predicate: impl Fn(&Lead) -> bool) -> Result<Option<Lead>, StoreError> {
        let leads = self.leads.lock().map_err(|_| StoreError::Unavailable)?;
        Ok(leads.iter().rev().find(|lead| predicate(lead)).cloned())
    }
}

#[async_trait]
impl LeadStore for MemoryLeadStore {
    async fn insert(&self, lead: NewLead) -> Result<Lead, StoreError> {
        let mut leads = self.leads.lock().map_err(|_| StoreError::Unavailable)?;

        let conflict = leads.iter().find_map(|existing| {
            if existing.reference_number == lead.reference_number {
                Some(UQ_REFERENCE_NUMBER)
            } else if lead.idempotency_key.is_some()
                && existing.idempotency_key == lead.idempotency_key
            {
                Some(UQ_IDEMPOTENCY_KEY)
            } else {
                None
            }
        });
        if let Some(constraint) = conflict {
            return Err(StoreError::Conflict {
                constraint: constraint.to_string(),
            });
        }

        let row = lead.into_lead(Utc::now());
        leads.push(row.clone());
        Ok(row)
    }

    async fn find_by_reference(&self, reference_number: &str) -> Result<Option<Lead>, StoreError> {
        self.find(|lead| lead.reference_number == reference_number)
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Lead>, StoreError> {
        self.find(|lead| lead.idempotency_key.as_deref() == Some(key))
    }

    async fn find_recent_duplicate(
        &self,
        session_id: &str,
        phone_e164: &str,
        since: Timestamp,
    ) -> Result<Option<Lead>, StoreError> {
        self.find(|lead| {
            lead.session_id == session_id
                && lead.phone_e164 == phone_e164
                && lead.submitted_at >= since
        })
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.leads
            .lock()
            .map(|_| ())
            .map_err(|_| StoreError::Unavailable)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Duration;
    use uuid::Uuid;

    use glasslead_core::booking::ServiceType;
    use glasslead_core::payload::LeadPayload;

    use super::*;

    fn new_lead(session: &str, key: Option<&str>) -> NewLead {
        let payload = LeadPayload {
            service_type: Some(ServiceType::WindshieldRepair),
            phone_e164: "+17209187465".into(),
            session_id: session.into(),
            ..LeadPayload::default()
        };
        NewLead::from_payload(&payload, Uuid::new_v4(), key.map(str::to_string)).unwrap()
    }

    #[tokio::test]
    async fn insert_and_find_by_reference() {
        let store = MemoryLeadStore::new();
        let created = store.insert(new_lead("s1", None)).await.unwrap();
        assert_eq!(created.status, "new");

        let found = store
            .find_by_reference(&created.reference_number)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);
        assert!(store.find_by_reference("REF-NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_idempotency_key_conflicts() {
        let store = MemoryLeadStore::new();
        store.insert(new_lead("s1", Some("key-1"))).await.unwrap();

        let err = store.insert(new_lead("s1", Some("key-1"))).await.unwrap_err();
        assert!(err.is_conflict_on(UQ_IDEMPOTENCY_KEY));

        // Absent keys never collide with each other.
        store.insert(new_lead("s1", None)).await.unwrap();
        store.insert(new_lead("s1", None)).await.unwrap();
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn duplicate_reference_conflicts() {
        let store = MemoryLeadStore::new();
        let first = new_lead("s1", None);
        let mut second = new_lead("s2", None);
        second.reference_number = first.reference_number.clone();

        store.insert(first).await.unwrap();
        assert_matches!(
            store.insert(second).await,
            Err(StoreError::Conflict { constraint }) if constraint == UQ_REFERENCE_NUMBER
        );
    }

    #[tokio::test]
    async fn recent_duplicate_respects_window_and_session() {
        let store = MemoryLeadStore::new();
        store.insert(new_lead("s1", None)).await.unwrap();

        let window_start = Utc::now() - Duration::seconds(60);
        assert!(store
            .find_recent_duplicate("s1", "+17209187465", window_start)
            .await
            .unwrap()
            .is_some());
        assert!(store
            .find_recent_duplicate("s2", "+17209187465", window_start)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find_recent_duplicate("s1", "+17209187465", Utc::now() + Duration::seconds(1))
            .await
            .unwrap()
            .is_none());
    }
}
