//! Submission wire format and the draft -> payload normalizer.

use serde::{Deserialize, Serialize};

use crate::attribution::AttributionTouch;
use crate::booking::{non_blank, BookingDraft, ServiceType, TimeWindow};
use crate::phone;

/// JSON body of `POST /api/v1/leads`.
///
/// Every field defaults on deserialization so the server can report
/// missing values as field errors rather than rejecting the body outright.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeadPayload {
    pub service_type: Option<ServiceType>,
    pub mobile_service: bool,
    pub first_name: String,
    pub last_name: String,
    pub phone_e164: String,
    pub email: String,
    pub vehicle_year: i32,
    pub vehicle_make: String,
    pub vehicle_model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_date: Option<String>,
    pub time_preference: TimeWindow,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub sms_consent: bool,
    pub privacy_acknowledgment: bool,
    pub terms_accepted: bool,
    pub client_id: String,
    pub session_id: String,
    pub first_touch: AttributionTouch,
    pub last_touch: AttributionTouch,
}

/// Browser-scoped identifiers attached to every submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionIdentity {
    /// Long-lived, per browser.
    pub client_id: String,
    /// Per tab/session.
    pub session_id: String,
}

/// Coerce the typed vehicle year; unparsable input becomes `0`, which the
/// server rejects as out of range.
pub fn vehicle_year(raw: &str) -> i32 {
    raw.trim().parse().unwrap_or(0)
}

/// Convert a draft to the wire payload.
///
/// Empty optional fields are omitted. When no first touch was recorded the
/// last touch stands in for both.
pub fn normalize_submission(
    draft: &BookingDraft,
    identity: &SubmissionIdentity,
    first_touch: Option<&AttributionTouch>,
    last_touch: &AttributionTouch,
) -> LeadPayload {
    let first_touch = first_touch.unwrap_or(last_touch).clone();
    let mobile_service =
        draft.mobile_service || draft.service_type == Some(ServiceType::MobileService);

    LeadPayload {
        service_type: draft.service_type,
        mobile_service,
        first_name: draft.contact.first_name.trim().to_string(),
        last_name: draft.contact.last_name.trim().to_string(),
        phone_e164: phone::to_e164(&draft.contact.phone),
        email: draft.contact.email.trim().to_string(),
        vehicle_year: vehicle_year(&draft.vehicle.year),
        vehicle_make: draft.vehicle.make.trim().to_string(),
        vehicle_model: draft.vehicle.model.trim().to_string(),
        address: non_blank(&draft.location.street_address).map(str::to_string),
        city: draft.location.city.trim().to_string(),
        state: draft.location.state.trim().to_ascii_uppercase(),
        zip: draft.location.zip_code.trim().to_string(),
        preferred_date: non_blank(&draft.scheduling.preferred_date).map(str::to_string),
        time_preference: draft.scheduling.time_window,
        notes: non_blank(&draft.notes.damage_description).map(str::to_string),
        sms_consent: draft.consent.sms_consent,
        privacy_acknowledgment: draft.consent.privacy_acknowledgment,
        terms_accepted: draft.consent.privacy_acknowledgment,
        client_id: identity.client_id.clone(),
        session_id: identity.session_id.clone(),
        first_touch,
        last_touch: last_touch.clone(),
    }
}
