//! Lead entity model and insert DTO.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;

use glasslead_core::attribution::AttributionTouch;
use glasslead_core::error::CoreError;
use glasslead_core::lead::{LeadStatus, PREFERRED_DATE_FORMAT};
use glasslead_core::payload::LeadPayload;
use glasslead_core::submission::reference_number_for;
use glasslead_core::types::{LeadId, Timestamp};

/// A row from the `leads` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Lead {
    pub id: LeadId,
    pub reference_number: String,
    pub status: String,
    pub service_type: String,
    pub mobile_service: bool,
    pub first_name: String,
    pub last_name: String,
    pub phone_e164: String,
    pub email: String,
    pub vehicle_year: i32,
    pub vehicle_make: String,
    pub vehicle_model: String,
    pub address: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub preferred_date: Option<NaiveDate>,
    pub time_preference: String,
    pub notes: Option<String>,
    pub sms_consent: bool,
    pub privacy_acknowledgment: bool,
    pub terms_accepted: bool,
    pub client_id: String,
    pub session_id: String,
    pub first_touch: serde_json::Value,
    pub last_touch: serde_json::Value,
    pub idempotency_key: Option<String>,
    pub submitted_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting a validated lead.
#[derive(Debug, Clone)]
pub struct NewLead {
    pub id: LeadId,
    pub reference_number: String,
    pub status: LeadStatus,
    pub service_type: String,
    pub mobile_service: bool,
    pub first_name: String,
    pub last_name: String,
    pub phone_e164: String,
    pub email: String,
    pub vehicle_year: i32,
    pub vehicle_make: String,
    pub vehicle_model: String,
    pub address: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub preferred_date: Option<NaiveDate>,
    pub time_preference: String,
    pub notes: Option<String>,
    pub sms_consent: bool,
    pub privacy_acknowledgment: bool,
    pub terms_accepted: bool,
    pub client_id: String,
    pub session_id: String,
    pub first_touch: serde_json::Value,
    pub last_touch: serde_json::Value,
    pub idempotency_key: Option<String>,
}

impl NewLead {
    /// Build an insert from a payload that has already passed
    /// `validate_lead_payload`. The reference number is derived from `id`.
    pub fn from_payload(
        payload: &LeadPayload,
        id: LeadId,
        idempotency_key: Option<String>,
    ) -> Result<Self, CoreError> {
        let service_type = payload
            .service_type
            .ok_or_else(|| CoreError::Validation("Service type is required".to_string()))?;

        let preferred_date = payload
            .preferred_date
            .as_deref()
            .map(|d| NaiveDate::parse_from_str(d, PREFERRED_DATE_FORMAT))
            .transpose()
            .map_err(|e| CoreError::Validation(format!("Invalid preferred date: {e}")))?;

        let touch_json = |touch: &AttributionTouch| {
            serde_json::to_value(touch)
                .map_err(|e| CoreError::Internal(format!("Failed to encode attribution: {e}")))
        };

        Ok(Self {
            id,
            reference_number: reference_number_for(&id.to_string()),
            status: LeadStatus::New,
            service_type: service_type.as_str().to_string(),
            mobile_service: payload.mobile_service,
            first_name: payload.first_name.clone(),
            last_name: payload.last_name.clone(),
            phone_e164: payload.phone_e164.clone(),
            email: payload.email.clone(),
            vehicle_year: payload.vehicle_year,
            vehicle_make: payload.vehicle_make.clone(),
            vehicle_model: payload.vehicle_model.clone(),
            address: payload.address.clone(),
            city: payload.city.clone(),
            state: payload.state.clone(),
            zip: payload.zip.clone(),
            preferred_date,
            time_preference: payload.time_preference.as_str().to_string(),
            notes: payload.notes.clone(),
            sms_consent: payload.sms_consent,
            privacy_acknowledgment: payload.privacy_acknowledgment,
            terms_accepted: payload.terms_accepted,
            client_id: payload.client_id.clone(),
            session_id: payload.session_id.clone(),
            first_touch: touch_json(&payload.first_touch)?,
            last_touch: touch_json(&payload.last_touch)?,
            idempotency_key,
        })
    }

    /// Materialize the row as the database would return it.
    pub fn into_lead(self, now: Timestamp) -> Lead {
        Lead {
            id: self.id,
            reference_number: self.reference_number,
            status: self.status.as_str().to_string(),
            service_type: self.service_type,
            mobile_service: self.mobile_service,
            first_name: self.first_name,
            last_name: self.last_name,
            phone_e164: self.phone_e164,
            email: self.email,
            vehicle_year: self.vehicle_year,
            vehicle_make: self.vehicle_make,
            vehicle_model: self.vehicle_model,
            address: self.address,
            city: self.city,
            state: self.state,
            zip: self.zip,
            preferred_date: self.preferred_date,
            time_preference: self.time_preference,
            notes: self.notes,
            sms_consent: self.sms_consent,
            privacy_acknowledgment: self.privacy_acknowledgment,
            terms_accepted: self.terms_accepted,
            client_id: self.client_id,
            session_id: self.session_id,
            first_touch: self.first_touch,
            last_touch: self.last_touch,
            idempotency_key: self.idempotency_key,
            submitted_at: now,
            created_at: now,
            updated_at: now,
        }
    }
}
