//! Server-side lead rules.
//!
//! The server never trusts the client's step validation; it re-checks every
//! constraint on the normalized [`LeadPayload`] and reports violations keyed
//! by payload field name, which the client maps back onto its form.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{Datelike, Days, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::booking::MAX_DAMAGE_DESCRIPTION_CHARS;
use crate::error::CoreError;
use crate::payload::LeadPayload;
use crate::validation::{Field, EMAIL_RE, MIN_NAME_CHARS, STATE_RE, ZIP_RE};

static E164_US_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+1\d{10}$").expect("valid regex"));

/// Oldest model year accepted.
pub const MIN_VEHICLE_YEAR: i32 = 1950;

/// Longest accepted value for free-text name/address fields.
pub const MAX_TEXT_CHARS: usize = 100;

/// Wire format of `preferredDate`.
pub const PREFERRED_DATE_FORMAT: &str = "%Y-%m-%d";

/// `preferredDate` is the customer's local date. Every US zone trails UTC
/// by less than a day, so a date one day before the UTC date can still be
/// "today" for the customer.
pub const PREFERRED_DATE_GRACE_DAYS: u64 = 1;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a lead. This subsystem only ever writes `New`;
/// later states are set by the operations surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Scheduled,
    Completed,
    Lost,
}

impl LeadStatus {
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "new" => Ok(Self::New),
            "contacted" => Ok(Self::Contacted),
            "scheduled" => Ok(Self::Scheduled),
            "completed" => Ok(Self::Completed),
            "lost" => Ok(Self::Lost),
            _ => Err(CoreError::Validation(format!(
                "Invalid lead status '{s}'. Must be one of: new, contacted, scheduled, completed, lost"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Lost => "lost",
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Payload key -> message for every violation.
pub type WireErrors = BTreeMap<String, String>;

fn reject(errors: &mut WireErrors, field: Field, message: impl Into<String>) {
    errors.insert(field.wire_name().to_string(), message.into());
}

fn require_text(errors: &mut WireErrors, field: Field, value: &str, label: &str) {
    let len = value.trim().chars().count();
    if len == 0 {
        reject(errors, field, format!("{label} is required"));
    } else if len > MAX_TEXT_CHARS {
        reject(
            errors,
            field,
            format!("{label} must be {MAX_TEXT_CHARS} characters or fewer"),
        );
    }
}

/// Validate a payload against every lead constraint.
///
/// `today` is the server's UTC date. It bounds the vehicle year (next model
/// year allowed) and rejects preferred dates that are in the past in every
/// US time zone.
pub fn validate_lead_payload(payload: &LeadPayload, today: NaiveDate) -> WireErrors {
    let mut errors = WireErrors::new();

    if payload.service_type.is_none() {
        reject(&mut errors, Field::ServiceType, "Service type is required");
    }

    let max_year = today.year() + 1;
    if !(MIN_VEHICLE_YEAR..=max_year).contains(&payload.vehicle_year) {
        reject(
            &mut errors,
            Field::VehicleYear,
            format!("Vehicle year must be between {MIN_VEHICLE_YEAR} and {max_year}"),
        );
    }
    require_text(&mut errors, Field::VehicleMake, &payload.vehicle_make, "Vehicle make");
    require_text(&mut errors, Field::VehicleModel, &payload.vehicle_model, "Vehicle model");

    for (field, value, label) in [
        (Field::FirstName, &payload.first_name, "First name"),
        (Field::LastName, &payload.last_name, "Last name"),
    ] {
        if value.trim().chars().count() < MIN_NAME_CHARS {
            reject(
                &mut errors,
                field,
                format!("{label} must be at least {MIN_NAME_CHARS} characters"),
            );
        } else {
            require_text(&mut errors, field, value, label);
        }
    }

    if !E164_US_RE.is_match(&payload.phone_e164) {
        reject(
            &mut errors,
            Field::Phone,
            "Phone must be a US number in E.164 format (+1XXXXXXXXXX)",
        );
    }
    if !EMAIL_RE.is_match(payload.email.trim()) {
        reject(&mut errors, Field::Email, "Email address is invalid");
    }

    if let Some(address) = &payload.address {
        if address.chars().count() > MAX_TEXT_CHARS * 2 {
            reject(&mut errors, Field::StreetAddress, "Address is too long");
        }
    }
    require_text(&mut errors, Field::City, &payload.city, "City");
    if !STATE_RE.is_match(&payload.state) {
        reject(&mut errors, Field::State, "State must be a two-letter code");
    }
    if !ZIP_RE.is_match(&payload.zip) {
        reject(&mut errors, Field::ZipCode, "ZIP code is invalid");
    }

    if let Some(date) = &payload.preferred_date {
        let earliest = today
            .checked_sub_days(Days::new(PREFERRED_DATE_GRACE_DAYS))
            .unwrap_or(today);
        match NaiveDate::parse_from_str(date, PREFERRED_DATE_FORMAT) {
            Ok(d) if d < earliest => {
                reject(&mut errors, Field::PreferredDate, "Preferred date is in the past")
            }
            Ok(_) => {}
            Err(_) => reject(
                &mut errors,
                Field::PreferredDate,
                "Preferred date must be YYYY-MM-DD",
            ),
        }
    }

    if let Some(notes) = &payload.notes {
        if notes.chars().count() > MAX_DAMAGE_DESCRIPTION_CHARS {
            reject(
                &mut errors,
                Field::DamageDescription,
                format!("Notes must be {MAX_DAMAGE_DESCRIPTION_CHARS} characters or fewer"),
            );
        }
    }

    if !payload.sms_consent {
        reject(&mut errors, Field::SmsConsent, "SMS consent is required");
    }
    if !payload.privacy_acknowledgment {
        reject(
            &mut errors,
            Field::PrivacyAcknowledgment,
            "Privacy acknowledgment is required",
        );
    }
    if payload.terms_accepted != payload.privacy_acknowledgment {
        errors.insert(
            "termsAccepted".to_string(),
            "Terms acceptance must match privacy acknowledgment".to_string(),
        );
    }

    if payload.client_id.trim().is_empty() {
        errors.insert("clientId".to_string(), "Client id is required".to_string());
    }
    if payload.session_id.trim().is_empty() {
        errors.insert("sessionId".to_string(), "Session id is required".to_string());
    }

    errors
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::AttributionTouch;
    use crate::payload::{normalize_submission, SubmissionIdentity};
    use crate::validation::tests::complete_draft;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    fn valid_payload() -> LeadPayload {
        normalize_submission(
            &complete_draft(),
            &SubmissionIdentity {
                client_id: "c".into(),
                session_id: "s".into(),
            },
            None,
            &AttributionTouch::default(),
        )
    }

    #[test]
    fn normalized_complete_draft_is_valid() {
        assert!(validate_lead_payload(&valid_payload(), today()).is_empty());
    }

    #[test]
    fn empty_payload_reports_wire_field_names() {
        let errors = validate_lead_payload(&LeadPayload::default(), today());
        for key in [
            "serviceType",
            "vehicleYear",
            "vehicleMake",
            "vehicleModel",
            "firstName",
            "lastName",
            "phoneE164",
            "email",
            "city",
            "state",
            "zip",
            "smsConsent",
            "privacyAcknowledgment",
            "clientId",
            "sessionId",
        ] {
            assert!(errors.contains_key(key), "missing {key}");
        }
    }

    #[test]
    fn malformed_e164_is_rejected() {
        let mut payload = valid_payload();
        payload.phone_e164 = "+9187465".into();
        let errors = validate_lead_payload(&payload, today());
        assert!(errors.contains_key("phoneE164"));
    }

    #[test]
    fn vehicle_year_bounds() {
        let mut payload = valid_payload();
        payload.vehicle_year = 2027;
        assert!(validate_lead_payload(&payload, today()).is_empty());
        payload.vehicle_year = 2028;
        assert!(validate_lead_payload(&payload, today()).contains_key("vehicleYear"));
        payload.vehicle_year = 0;
        assert!(validate_lead_payload(&payload, today()).contains_key("vehicleYear"));
    }

    #[test]
    fn preferred_date_format_and_past() {
        let mut payload = valid_payload();
        payload.preferred_date = Some("2026-10-20".into());
        assert!(validate_lead_payload(&payload, today()).is_empty());
        payload.preferred_date = Some("10/20/2026".into());
        assert!(validate_lead_payload(&payload, today()).contains_key("preferredDate"));
        payload.preferred_date = Some("2026-10-01".into());
        assert!(validate_lead_payload(&payload, today()).contains_key("preferredDate"));
    }

    #[test]
    fn customer_today_is_accepted_after_utc_midnight() {
        // 19:00 in Denver on the 17th is already the 18th in UTC.
        let utc_today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let mut payload = valid_payload();

        payload.preferred_date = Some("2026-10-17".into());
        assert!(validate_lead_payload(&payload, utc_today).is_empty());

        payload.preferred_date = Some("2026-10-16".into());
        assert!(validate_lead_payload(&payload, utc_today).contains_key("preferredDate"));
    }

    #[test]
    fn terms_must_mirror_privacy() {
        let mut payload = valid_payload();
        payload.terms_accepted = false;
        assert!(validate_lead_payload(&payload, today()).contains_key("termsAccepted"));
    }

    #[test]
    fn lowercase_state_is_rejected() {
        let mut payload = valid_payload();
        payload.state = "co".into();
        assert!(validate_lead_payload(&payload, today()).contains_key("state"));
    }

    #[test]
    fn status_roundtrip() {
        for status in [
            LeadStatus::New,
            LeadStatus::Contacted,
            LeadStatus::Scheduled,
            LeadStatus::Completed,
            LeadStatus::Lost,
        ] {
            assert_eq!(LeadStatus::from_str_db(status.as_str()).unwrap(), status);
        }
        assert!(LeadStatus::from_str_db("archived").is_err());
    }
}
