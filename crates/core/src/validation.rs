//! Per-step field validation for the booking form.
//!
//! Each step validator is pure and reports every violated field at once;
//! an empty [`FieldErrors`] map means the step passes.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::booking::{non_blank, BookingDraft, FormStep, MAX_DAMAGE_DESCRIPTION_CHARS};
use crate::phone;

pub(crate) static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"));

pub(crate) static ZIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}(-\d{4})?$").expect("valid regex"));

pub(crate) static STATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}$").expect("valid regex"));

/// Minimum length of first and last names.
pub const MIN_NAME_CHARS: usize = 2;

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// A user-editable form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    ServiceType,
    VehicleYear,
    VehicleMake,
    VehicleModel,
    FirstName,
    LastName,
    Phone,
    Email,
    StreetAddress,
    City,
    State,
    ZipCode,
    PreferredDate,
    TimeWindow,
    DamageDescription,
    SmsConsent,
    PrivacyAcknowledgment,
}

/// Field name -> message for every violation found.
pub type FieldErrors = BTreeMap<Field, String>;

impl Field {
    /// The form's name for this field.
    pub fn form_name(self) -> &'static str {
        match self {
            Self::ServiceType => "serviceType",
            Self::VehicleYear => "vehicleYear",
            Self::VehicleMake => "vehicleMake",
            Self::VehicleModel => "vehicleModel",
            Self::FirstName => "firstName",
            Self::LastName => "lastName",
            Self::Phone => "phone",
            Self::Email => "email",
            Self::StreetAddress => "streetAddress",
            Self::City => "city",
            Self::State => "state",
            Self::ZipCode => "zipCode",
            Self::PreferredDate => "preferredDate",
            Self::TimeWindow => "timeWindow",
            Self::DamageDescription => "damageDescription",
            Self::SmsConsent => "smsConsent",
            Self::PrivacyAcknowledgment => "privacyAcknowledgment",
        }
    }

    /// The submission payload key carrying this field.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Phone => "phoneE164",
            Self::StreetAddress => "address",
            Self::ZipCode => "zip",
            Self::TimeWindow => "timePreference",
            Self::DamageDescription => "notes",
            other => other.form_name(),
        }
    }

    /// Resolve either a form name or a payload key.
    ///
    /// `termsAccepted` mirrors the privacy acknowledgment checkbox.
    pub fn from_name(name: &str) -> Option<Self> {
        const ALL: [Field; 17] = [
            Field::ServiceType,
            Field::VehicleYear,
            Field::VehicleMake,
            Field::VehicleModel,
            Field::FirstName,
            Field::LastName,
            Field::Phone,
            Field::Email,
            Field::StreetAddress,
            Field::City,
            Field::State,
            Field::ZipCode,
            Field::PreferredDate,
            Field::TimeWindow,
            Field::DamageDescription,
            Field::SmsConsent,
            Field::PrivacyAcknowledgment,
        ];
        if name == "termsAccepted" {
            return Some(Self::PrivacyAcknowledgment);
        }
        ALL.into_iter()
            .find(|f| f.form_name() == name || f.wire_name() == name)
    }

    /// The step that renders this field.
    pub fn step(self) -> FormStep {
        match self {
            Self::ServiceType | Self::VehicleYear | Self::VehicleMake | Self::VehicleModel => {
                FormStep::Vehicle
            }
            Self::FirstName
            | Self::LastName
            | Self::Phone
            | Self::Email
            | Self::StreetAddress
            | Self::City
            | Self::State
            | Self::ZipCode
            | Self::PreferredDate
            | Self::TimeWindow => FormStep::Contact,
            Self::DamageDescription | Self::SmsConsent | Self::PrivacyAcknowledgment => {
                FormStep::Review
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Validators
// ---------------------------------------------------------------------------

/// Validate the fields rendered on `step`.
pub fn validate_step(step: FormStep, draft: &BookingDraft) -> FieldErrors {
    match step {
        FormStep::Vehicle => validate_vehicle_step(draft),
        FormStep::Contact => validate_contact_step(draft),
        FormStep::Review => validate_review_step(draft),
    }
}

/// Step 1: service type and all three vehicle fields.
pub fn validate_vehicle_step(draft: &BookingDraft) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if draft.service_type.is_none() {
        errors.insert(Field::ServiceType, "Please select a service type".into());
    }
    if draft.vehicle.year.trim().is_empty() {
        errors.insert(Field::VehicleYear, "Vehicle year is required".into());
    }
    if draft.vehicle.make.trim().is_empty() {
        errors.insert(Field::VehicleMake, "Vehicle make is required".into());
    }
    if draft.vehicle.model.trim().is_empty() {
        errors.insert(Field::VehicleModel, "Vehicle model is required".into());
    }

    errors
}

/// Step 2: contact details and location. Street address and preferred date
/// are optional.
pub fn validate_contact_step(draft: &BookingDraft) -> FieldErrors {
    let mut errors = FieldErrors::new();
    let contact = &draft.contact;
    let location = &draft.location;

    if contact.first_name.trim().chars().count() < MIN_NAME_CHARS {
        errors.insert(
            Field::FirstName,
            format!("First name must be at least {MIN_NAME_CHARS} characters"),
        );
    }
    if contact.last_name.trim().chars().count() < MIN_NAME_CHARS {
        errors.insert(
            Field::LastName,
            format!("Last name must be at least {MIN_NAME_CHARS} characters"),
        );
    }
    if !phone::is_valid_us_phone(&contact.phone) {
        errors.insert(Field::Phone, "Please enter a valid 10-digit phone number".into());
    }
    if !EMAIL_RE.is_match(contact.email.trim()) {
        errors.insert(Field::Email, "Please enter a valid email address".into());
    }
    if location.city.trim().is_empty() {
        errors.insert(Field::City, "City is required".into());
    }
    let state = location.state.trim();
    if state.is_empty() {
        errors.insert(Field::State, "State is required".into());
    } else if !STATE_RE.is_match(&state.to_ascii_uppercase()) {
        errors.insert(Field::State, "Please use the two-letter state code".into());
    }
    if !ZIP_RE.is_match(location.zip_code.trim()) {
        errors.insert(Field::ZipCode, "Please enter a valid ZIP code".into());
    }

    errors
}

/// Step 3: both consents, and the damage description length cap.
pub fn validate_review_step(draft: &BookingDraft) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if !draft.consent.sms_consent {
        errors.insert(
            Field::SmsConsent,
            "You must agree to receive text messages about your request".into(),
        );
    }
    if !draft.consent.privacy_acknowledgment {
        errors.insert(
            Field::PrivacyAcknowledgment,
            "You must acknowledge the privacy policy".into(),
        );
    }
    if let Some(description) = non_blank(&draft.notes.damage_description) {
        if description.chars().count() > MAX_DAMAGE_DESCRIPTION_CHARS {
            errors.insert(
                Field::DamageDescription,
                format!("Description must be {MAX_DAMAGE_DESCRIPTION_CHARS} characters or fewer"),
            );
        }
    }

    errors
}

/// Convenience: whether `step` passes.
pub fn can_advance(step: FormStep, draft: &BookingDraft) -> bool {
    validate_step(step, draft).is_empty()
}

/// Split server-reported errors into known form fields and leftovers.
///
/// Keys may be either form names or payload keys. Unknown keys are
/// returned so the caller can surface them as a general message.
pub fn field_errors_from_names(
    reported: &BTreeMap<String, String>,
) -> (FieldErrors, Vec<(String, String)>) {
    let mut known = FieldErrors::new();
    let mut unknown = Vec::new();
    for (name, message) in reported {
        match Field::from_name(name) {
            Some(field) => {
                known.insert(field, message.clone());
            }
            None => unknown.push((name.clone(), message.clone())),
        }
    }
    (known, unknown)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::booking::ServiceType;

    /// A draft that passes every step.
    pub(crate) fn complete_draft() -> BookingDraft {
        let mut draft = BookingDraft::default();
        draft.set_service_type(ServiceType::WindshieldRepair);
        draft.vehicle.year = "2020".into();
        draft.vehicle.make = "Honda".into();
        draft.vehicle.model = "Civic".into();
        draft.contact.first_name = "Jamie".into();
        draft.contact.last_name = "Rivera".into();
        draft.contact.phone = "(720) 918-7465".into();
        draft.contact.email = "jamie@example.com".into();
        draft.location.city = "Denver".into();
        draft.location.zip_code = "80202".into();
        draft.consent.sms_consent = true;
        draft.consent.privacy_acknowledgment = true;
        draft
    }

    #[test]
    fn complete_draft_passes_every_step() {
        let draft = complete_draft();
        for step in [FormStep::Vehicle, FormStep::Contact, FormStep::Review] {
            assert!(validate_step(step, &draft).is_empty(), "{step:?} should pass");
        }
    }

    #[test]
    fn empty_draft_reports_all_vehicle_fields() {
        let errors = validate_vehicle_step(&BookingDraft::default());
        let fields: Vec<_> = errors.keys().copied().collect();
        assert_eq!(
            fields,
            vec![
                Field::ServiceType,
                Field::VehicleYear,
                Field::VehicleMake,
                Field::VehicleModel
            ]
        );
    }

    #[test]
    fn contact_step_reports_every_violation_at_once() {
        let draft = BookingDraft::default();
        let errors = validate_contact_step(&draft);
        for field in [
            Field::FirstName,
            Field::LastName,
            Field::Phone,
            Field::Email,
            Field::City,
            Field::ZipCode,
        ] {
            assert!(errors.contains_key(&field), "missing {field:?}");
        }
        // State defaults to CO, optional fields never error.
        assert!(!errors.contains_key(&Field::State));
        assert!(!errors.contains_key(&Field::StreetAddress));
        assert!(!errors.contains_key(&Field::PreferredDate));
    }

    #[test]
    fn state_must_be_a_two_letter_code() {
        let mut draft = complete_draft();
        draft.location.state = "Colorado".into();
        let errors = validate_contact_step(&draft);
        assert_eq!(
            errors.get(&Field::State).map(String::as_str),
            Some("Please use the two-letter state code")
        );

        draft.location.state = " co ".into();
        assert!(validate_contact_step(&draft).is_empty());
    }

    #[test]
    fn single_character_names_are_rejected() {
        let mut draft = complete_draft();
        draft.contact.first_name = " J ".into();
        let errors = validate_contact_step(&draft);
        assert_eq!(errors.len(), 1);
        assert!(errors.contains_key(&Field::FirstName));
    }

    #[test]
    fn zip_accepts_five_or_nine_digits() {
        let mut draft = complete_draft();
        for zip in ["80202", "80202-1234"] {
            draft.location.zip_code = zip.into();
            assert!(validate_contact_step(&draft).is_empty(), "{zip}");
        }
        for zip in ["8020", "802021", "80202-12", "abcde"] {
            draft.location.zip_code = zip.into();
            assert!(validate_contact_step(&draft).contains_key(&Field::ZipCode), "{zip}");
        }
    }

    #[test]
    fn email_shape() {
        let mut draft = complete_draft();
        for email in ["a@b", "a b@c.com", "@c.com", "plain"] {
            draft.contact.email = email.into();
            assert!(validate_contact_step(&draft).contains_key(&Field::Email), "{email}");
        }
    }

    #[test]
    fn phone_with_country_digit_passes() {
        let mut draft = complete_draft();
        draft.contact.phone = "1 (720) 918-7465".into();
        assert!(validate_contact_step(&draft).is_empty());
        draft.contact.phone = "918-7465".into();
        assert!(validate_contact_step(&draft).contains_key(&Field::Phone));
    }

    #[test]
    fn review_step_requires_both_consents() {
        let mut draft = complete_draft();
        draft.consent.sms_consent = false;
        draft.consent.privacy_acknowledgment = false;
        let errors = validate_review_step(&draft);
        assert!(errors.contains_key(&Field::SmsConsent));
        assert!(errors.contains_key(&Field::PrivacyAcknowledgment));
    }

    #[test]
    fn damage_description_length_cap() {
        let mut draft = complete_draft();
        draft.notes.damage_description = Some("x".repeat(500));
        assert!(validate_review_step(&draft).is_empty());
        draft.notes.damage_description = Some("x".repeat(501));
        assert!(validate_review_step(&draft).contains_key(&Field::DamageDescription));
    }

    #[test]
    fn field_names_resolve_from_form_and_wire() {
        assert_eq!(Field::from_name("zip"), Some(Field::ZipCode));
        assert_eq!(Field::from_name("zipCode"), Some(Field::ZipCode));
        assert_eq!(Field::from_name("phoneE164"), Some(Field::Phone));
        assert_eq!(Field::from_name("termsAccepted"), Some(Field::PrivacyAcknowledgment));
        assert_eq!(Field::from_name("clientId"), None);
    }

    #[test]
    fn field_steps() {
        assert_eq!(Field::ZipCode.step(), FormStep::Contact);
        assert_eq!(Field::VehicleYear.step(), FormStep::Vehicle);
        assert_eq!(Field::SmsConsent.step(), FormStep::Review);
    }

    #[test]
    fn server_errors_split_into_known_and_unknown() {
        let mut reported = BTreeMap::new();
        reported.insert("zip".to_string(), "invalid".to_string());
        reported.insert("sessionId".to_string(), "missing".to_string());
        let (known, unknown) = field_errors_from_names(&reported);
        assert_eq!(known.get(&Field::ZipCode).map(String::as_str), Some("invalid"));
        assert_eq!(unknown, vec![("sessionId".to_string(), "missing".to_string())]);
    }
}
