//! Booking draft model.
//!
//! [`BookingDraft`] is the client-owned aggregate the funnel edits field by
//! field. It serializes with camelCase keys so a persisted snapshot matches
//! the shape the browser form uses.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// State pre-selected on a fresh draft.
pub const DEFAULT_STATE: &str = "CO";

/// Maximum length of the free-text damage description, in characters.
pub const MAX_DAMAGE_DESCRIPTION_CHARS: usize = 500;

// ---------------------------------------------------------------------------
// Service type
// ---------------------------------------------------------------------------

/// The kind of glass service being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    #[serde(alias = "repair")]
    WindshieldRepair,
    #[serde(alias = "replacement")]
    WindshieldReplacement,
    MobileService,
}

/// `service` URL parameter slugs and the service type each maps to.
const SERVICE_SLUGS: &[(&str, ServiceType)] = &[
    ("windshield-repair", ServiceType::WindshieldRepair),
    ("repair", ServiceType::WindshieldRepair),
    ("chip-repair", ServiceType::WindshieldRepair),
    ("crack-repair", ServiceType::WindshieldRepair),
    ("rock-chip-repair", ServiceType::WindshieldRepair),
    ("windshield-replacement", ServiceType::WindshieldReplacement),
    ("replacement", ServiceType::WindshieldReplacement),
    ("auto-glass-replacement", ServiceType::WindshieldReplacement),
    ("side-window-replacement", ServiceType::WindshieldReplacement),
    ("rear-window-replacement", ServiceType::WindshieldReplacement),
    ("mobile-service", ServiceType::MobileService),
    ("mobile", ServiceType::MobileService),
    ("mobile-windshield-repair", ServiceType::MobileService),
];

impl ServiceType {
    /// Parse a stored service type string.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "windshield_repair" | "repair" => Ok(Self::WindshieldRepair),
            "windshield_replacement" | "replacement" => Ok(Self::WindshieldReplacement),
            "mobile_service" => Ok(Self::MobileService),
            _ => Err(CoreError::Validation(format!(
                "Invalid service type '{s}'. Must be one of: \
                 windshield_repair, windshield_replacement, mobile_service"
            ))),
        }
    }

    /// Convert to the wire/database string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WindshieldRepair => "windshield_repair",
            Self::WindshieldReplacement => "windshield_replacement",
            Self::MobileService => "mobile_service",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::WindshieldRepair => "Windshield Repair",
            Self::WindshieldReplacement => "Windshield Replacement",
            Self::MobileService => "Mobile Service",
        }
    }

    /// Map a `service` URL slug through the fixed lookup table.
    ///
    /// Matching is case-insensitive; unrecognized slugs yield `None`.
    pub fn from_url_slug(slug: &str) -> Option<Self> {
        let slug = slug.trim().to_ascii_lowercase();
        SERVICE_SLUGS
            .iter()
            .find(|(s, _)| *s == slug)
            .map(|(_, service)| *service)
    }
}

// ---------------------------------------------------------------------------
// Time window
// ---------------------------------------------------------------------------

/// Preferred appointment window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    #[default]
    Flexible,
    Morning,
    Afternoon,
    Evening,
}

impl TimeWindow {
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "flexible" => Ok(Self::Flexible),
            "morning" => Ok(Self::Morning),
            "afternoon" => Ok(Self::Afternoon),
            "evening" => Ok(Self::Evening),
            _ => Err(CoreError::Validation(format!(
                "Invalid time window '{s}'. Must be one of: flexible, morning, afternoon, evening"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flexible => "flexible",
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
        }
    }
}

// ---------------------------------------------------------------------------
// Form steps
// ---------------------------------------------------------------------------

/// The three visible steps of the booking form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStep {
    /// Service type and vehicle.
    Vehicle,
    /// Contact details, location and scheduling.
    Contact,
    /// Damage notes and consent.
    Review,
}

/// Total number of form steps.
pub const TOTAL_STEPS: u8 = 3;

/// Minimum step number (1-based).
pub const MIN_STEP: u8 = 1;

/// Maximum step number (1-based).
pub const MAX_STEP: u8 = 3;

impl FormStep {
    /// Convert a 1-based step number to a `FormStep`.
    pub fn from_number(n: u8) -> Result<Self, CoreError> {
        match n {
            1 => Ok(Self::Vehicle),
            2 => Ok(Self::Contact),
            3 => Ok(Self::Review),
            _ => Err(CoreError::Validation(format!(
                "Invalid step number {n}. Must be between {MIN_STEP} and {MAX_STEP}"
            ))),
        }
    }

    /// Convert to a 1-based step number.
    pub fn to_number(self) -> u8 {
        match self {
            Self::Vehicle => 1,
            Self::Contact => 2,
            Self::Review => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Vehicle => "Vehicle & Service",
            Self::Contact => "Contact & Location",
            Self::Review => "Details & Consent",
        }
    }

    /// The following step, capped at the last one.
    pub fn next(self) -> Self {
        match self {
            Self::Vehicle => Self::Contact,
            Self::Contact | Self::Review => Self::Review,
        }
    }

    /// The preceding step, floored at the first one.
    pub fn previous(self) -> Self {
        match self {
            Self::Vehicle | Self::Contact => Self::Vehicle,
            Self::Review => Self::Contact,
        }
    }
}

// ---------------------------------------------------------------------------
// Draft
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VehicleInfo {
    /// Kept as typed text; coerced to an integer at submission.
    pub year: String,
    pub make: String,
    pub model: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactInfo {
    pub first_name: String,
    pub last_name: String,
    /// Display-formatted, e.g. `(720) 918-7465`.
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocationInfo {
    pub street_address: Option<String>,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

impl Default for LocationInfo {
    fn default() -> Self {
        Self {
            street_address: None,
            city: String::new(),
            state: DEFAULT_STATE.to_string(),
            zip_code: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulingInfo {
    /// `YYYY-MM-DD` as entered in the date picker.
    pub preferred_date: Option<String>,
    pub time_window: TimeWindow,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotesInfo {
    pub damage_description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsentInfo {
    pub sms_consent: bool,
    pub privacy_acknowledgment: bool,
}

/// Marketing parameters carried on the draft itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DraftAttribution {
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub referral_code: Option<String>,
}

/// The in-progress booking form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingDraft {
    pub service_type: Option<ServiceType>,
    pub mobile_service: bool,
    pub vehicle: VehicleInfo,
    pub contact: ContactInfo,
    pub location: LocationInfo,
    pub scheduling: SchedulingInfo,
    pub notes: NotesInfo,
    pub consent: ConsentInfo,
    pub attribution: DraftAttribution,
}

impl BookingDraft {
    /// Select a service type. Choosing mobile service also raises the
    /// mobile flag; other choices leave it as the user set it.
    pub fn set_service_type(&mut self, service: ServiceType) {
        self.service_type = Some(service);
        if service == ServiceType::MobileService {
            self.mobile_service = true;
        }
    }
}

/// Treat a blank optional string as absent.
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
