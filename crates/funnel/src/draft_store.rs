//! Draft persistence with a freshness window.
//!
//! Every draft mutation is written through as `{data, currentStep,
//! timestamp}` under [`DRAFT_KEY`]. A snapshot older than the TTL, or one
//! that fails to parse, is discarded on load and reported as absent. The
//! first-touch attribution snapshot and the pending idempotency key live
//! alongside it for the life of the draft; both go when the draft goes.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use glasslead_core::attribution::AttributionTouch;
use glasslead_core::booking::{BookingDraft, FormStep};
use glasslead_core::types::Timestamp;

use crate::config::FunnelConfig;
use crate::storage::{KeyValueStorage, StorageError};

/// Storage key for the draft snapshot.
pub const DRAFT_KEY: &str = "glasslead_booking_draft";

/// Storage key for the first-touch attribution snapshot.
pub const FIRST_TOUCH_KEY: &str = "glasslead_first_touch";

/// Storage key for the idempotency key of an unconfirmed submission.
pub const PENDING_SUBMISSION_KEY: &str = "glasslead_pending_submission";

/// Everything whose lifetime is the draft's.
const DRAFT_SCOPED_KEYS: [&str; 3] = [DRAFT_KEY, FIRST_TOUCH_KEY, PENDING_SUBMISSION_KEY];

/// Default freshness window for a saved draft.
pub const DEFAULT_DRAFT_TTL_MINUTES: i64 = 30;

/// The persisted shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSnapshot {
    pub data: BookingDraft,
    /// 1-based step number.
    pub current_step: u8,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// A loaded, fresh draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumedDraft {
    pub draft: BookingDraft,
    pub step: FormStep,
}

/// Write-through draft persistence.
#[derive(Clone)]
pub struct DraftStore {
    storage: Arc<dyn KeyValueStorage>,
    ttl: Duration,
}

impl DraftStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self::with_ttl(storage, Duration::minutes(DEFAULT_DRAFT_TTL_MINUTES))
    }

    pub fn with_ttl(storage: Arc<dyn KeyValueStorage>, ttl: Duration) -> Self {
        Self { storage, ttl }
    }

    /// Use the freshness window from `config`.
    pub fn from_config(storage: Arc<dyn KeyValueStorage>, config: &FunnelConfig) -> Self {
        Self::with_ttl(storage, config.draft_ttl)
    }

    /// Save the draft and step, overwriting any prior snapshot.
    pub fn save(&self, draft: &BookingDraft, step: FormStep) -> Result<(), StorageError> {
        self.save_at(draft, step, Utc::now())
    }

    pub fn save_at(
        &self,
        draft: &BookingDraft,
        step: FormStep,
        now: Timestamp,
    ) -> Result<(), StorageError> {
        let snapshot = DraftSnapshot {
            data: draft.clone(),
            current_step: step.to_number(),
            timestamp: now.timestamp_millis(),
        };
        // Serializing plain data structs cannot fail.
        let json = serde_json::to_string(&snapshot).unwrap_or_default();
        self.storage.set(DRAFT_KEY, &json)
    }

    /// Load a fresh draft, if one exists.
    pub fn load(&self) -> Option<ResumedDraft> {
        self.load_at(Utc::now())
    }

    /// Load relative to `now`. Expired, corrupt, or unreadable snapshots
    /// are logged, discarded, and reported as absent.
    pub fn load_at(&self, now: Timestamp) -> Option<ResumedDraft> {
        let raw = match self.storage.get(DRAFT_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read saved booking draft");
                return None;
            }
        };

        let snapshot: DraftSnapshot = match serde_json::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unparsable booking draft");
                self.discard();
                return None;
            }
        };

        let age = now.timestamp_millis() - snapshot.timestamp;
        if age >= self.ttl.num_milliseconds() {
            tracing::debug!(age_ms = age, "Discarding expired booking draft");
            self.discard();
            return None;
        }

        let step = match FormStep::from_number(snapshot.current_step) {
            Ok(step) => step,
            Err(e) => {
                tracing::warn!(error = %e, "Saved booking draft has an invalid step, resuming at step 1");
                FormStep::Vehicle
            }
        };

        Some(ResumedDraft {
            draft: snapshot.data,
            step,
        })
    }

    /// Remove the draft and everything scoped to it once the lead has been
    /// accepted.
    pub fn clear(&self) -> Result<(), StorageError> {
        for key in DRAFT_SCOPED_KEYS {
            self.storage.remove(key)?;
        }
        Ok(())
    }

    /// The first touch recorded for this draft.
    pub fn first_touch(&self) -> Option<AttributionTouch> {
        let raw = self.storage.get(FIRST_TOUCH_KEY).ok().flatten()?;
        match serde_json::from_str(&raw) {
            Ok(touch) => Some(touch),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unparsable first-touch attribution");
                None
            }
        }
    }

    /// Record `touch` as the first touch unless one already exists.
    /// Returns the first touch in effect.
    pub fn record_first_touch(&self, touch: &AttributionTouch) -> AttributionTouch {
        if let Some(existing) = self.first_touch() {
            return existing;
        }
        let json = serde_json::to_string(touch).unwrap_or_default();
        if let Err(e) = self.storage.set(FIRST_TOUCH_KEY, &json) {
            tracing::warn!(error = %e, "Failed to persist first-touch attribution");
        }
        touch.clone()
    }

    /// Idempotency key of a submission that was sent but never confirmed.
    pub fn pending_submission(&self) -> Option<String> {
        self.storage
            .get(PENDING_SUBMISSION_KEY)
            .ok()
            .flatten()
            .filter(|key| !key.trim().is_empty())
    }

    /// Remember (or forget, with `None`) the key of an in-flight submission.
    pub fn set_pending_submission(&self, key: Option<&str>) {
        let result = match key {
            Some(key) => self.storage.set(PENDING_SUBMISSION_KEY, key),
            None => self.storage.remove(PENDING_SUBMISSION_KEY),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to persist pending submission key");
        }
    }

    /// Drop a stale or corrupt draft on load. Best effort: each entry is
    /// attempted even if an earlier removal fails.
    fn discard(&self) {
        for key in DRAFT_SCOPED_KEYS {
            if let Err(e) = self.storage.remove(key) {
                tracing::warn!(error = %e, key, "Failed to remove stale booking draft entry");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use glasslead_core::booking::ServiceType;

    fn store() -> (Arc<MemoryStorage>, DraftStore) {
        let storage = Arc::new(MemoryStorage::new());
        (storage.clone(), DraftStore::new(storage))
    }

    fn sample_draft() -> BookingDraft {
        let mut draft = BookingDraft::default();
        draft.set_service_type(ServiceType::WindshieldReplacement);
        draft.vehicle.make = "Subaru".into();
        draft.contact.phone = "(720) 918-7465".into();
        draft
    }

    #[test]
    fn round_trip_within_window() {
        let (_, store) = store();
        let saved_at = Utc::now();
        store.save_at(&sample_draft(), FormStep::Contact, saved_at).unwrap();

        let resumed = store
            .load_at(saved_at + Duration::minutes(29))
            .expect("fresh draft should load");
        assert_eq!(resumed.draft, sample_draft());
        assert_eq!(resumed.step, FormStep::Contact);
    }

    #[test]
    fn expires_at_thirty_minutes_and_is_removed() {
        let (storage, store) = store();
        let saved_at = Utc::now();
        store.save_at(&sample_draft(), FormStep::Review, saved_at).unwrap();

        assert!(store.load_at(saved_at + Duration::minutes(30)).is_none());
        assert_eq!(storage.get(DRAFT_KEY).unwrap(), None);
    }

    #[test]
    fn save_overwrites_previous_snapshot() {
        let (_, store) = store();
        let now = Utc::now();
        store.save_at(&BookingDraft::default(), FormStep::Vehicle, now).unwrap();
        store.save_at(&sample_draft(), FormStep::Review, now).unwrap();
        let resumed = store.load_at(now).unwrap();
        assert_eq!(resumed.step, FormStep::Review);
        assert_eq!(resumed.draft.vehicle.make, "Subaru");
    }

    #[test]
    fn corrupt_snapshot_is_treated_as_missing() {
        let (storage, store) = store();
        storage.set(DRAFT_KEY, "{not json").unwrap();
        assert!(store.load().is_none());
        assert_eq!(storage.get(DRAFT_KEY).unwrap(), None);
    }

    #[test]
    fn snapshot_uses_camel_case_shape() {
        let (storage, store) = store();
        store.save(&sample_draft(), FormStep::Contact).unwrap();
        let raw = storage.get(DRAFT_KEY).unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["currentStep"], 2);
        assert!(json["timestamp"].is_i64());
        assert_eq!(json["data"]["vehicle"]["make"], "Subaru");
    }

    #[test]
    fn expiry_also_drops_first_touch_and_pending_key() {
        let (_, store) = store();
        let saved_at = Utc::now();
        store.record_first_touch(&AttributionTouch::default());
        store.set_pending_submission(Some("key-1"));
        store.save_at(&sample_draft(), FormStep::Review, saved_at).unwrap();

        assert!(store.load_at(saved_at + Duration::minutes(45)).is_none());
        assert!(store.first_touch().is_none());
        assert!(store.pending_submission().is_none());
    }

    #[test]
    fn configured_ttl_controls_expiry() {
        let storage = Arc::new(MemoryStorage::new());
        let config = FunnelConfig {
            draft_ttl: Duration::minutes(5),
            ..FunnelConfig::default()
        };
        let store = DraftStore::from_config(storage, &config);
        let saved_at = Utc::now();
        store.save_at(&sample_draft(), FormStep::Contact, saved_at).unwrap();

        assert!(store.load_at(saved_at + Duration::minutes(4)).is_some());
        assert!(store.load_at(saved_at + Duration::minutes(5)).is_none());
    }

    #[test]
    fn discard_keeps_going_when_one_entry_cannot_be_removed() {
        /// Refuses to remove the draft entry itself.
        struct StickyDraft(MemoryStorage);

        impl KeyValueStorage for StickyDraft {
            fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
                self.0.get(key)
            }
            fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
                self.0.set(key, value)
            }
            fn remove(&self, key: &str) -> Result<(), StorageError> {
                if key == DRAFT_KEY {
                    return Err(StorageError::Poisoned);
                }
                self.0.remove(key)
            }
        }

        let store = DraftStore::new(Arc::new(StickyDraft(MemoryStorage::new())));
        store.record_first_touch(&AttributionTouch::default());
        store.set_pending_submission(Some("key-1"));
        let saved_at = Utc::now();
        store.save_at(&sample_draft(), FormStep::Review, saved_at).unwrap();

        assert!(store.load_at(saved_at + Duration::minutes(31)).is_none());
        assert!(store.first_touch().is_none());
        assert!(store.pending_submission().is_none());
    }

    #[test]
    fn pending_submission_set_and_forget() {
        let (_, store) = store();
        assert!(store.pending_submission().is_none());
        store.set_pending_submission(Some("key-1"));
        assert_eq!(store.pending_submission().as_deref(), Some("key-1"));
        store.set_pending_submission(None);
        assert!(store.pending_submission().is_none());
    }

    #[test]
    fn out_of_range_step_resumes_at_first_step() {
        let (storage, store) = store();
        let snapshot = serde_json::json!({
            "data": {},
            "currentStep": 9,
            "timestamp": Utc::now().timestamp_millis()
        });
        storage.set(DRAFT_KEY, &snapshot.to_string()).unwrap();
        assert_eq!(store.load().unwrap().step, FormStep::Vehicle);
    }

    #[test]
    fn first_touch_is_recorded_once_and_cleared_with_draft() {
        let (_, store) = store();
        let google = AttributionTouch {
            utm_source: "google".into(),
            ..AttributionTouch::default()
        };
        let email = AttributionTouch {
            utm_source: "email".into(),
            ..AttributionTouch::default()
        };

        assert_eq!(store.record_first_touch(&google), google);
        assert_eq!(store.record_first_touch(&email), google);

        store.save(&sample_draft(), FormStep::Vehicle).unwrap();
        store.clear().unwrap();
        assert!(store.first_touch().is_none());
        assert!(store.load().is_none());
    }
}
