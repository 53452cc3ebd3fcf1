//! Submission response envelope and reference numbers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Prefix of derived reference numbers.
pub const REFERENCE_PREFIX: &str = "REF-";

/// Number of id characters kept in a reference number.
pub const REFERENCE_ID_CHARS: usize = 8;

/// Derive a reference number from a lead id: `REF-` followed by the first
/// eight characters of the id, uppercased.
pub fn reference_number_for(id: &str) -> String {
    let head: String = id.chars().take(REFERENCE_ID_CHARS).collect();
    format!("{REFERENCE_PREFIX}{}", head.to_uppercase())
}

/// JSON body returned by the lead endpoint.
///
/// `{ok: true, id, referenceNumber}` on success,
/// `{ok: false, error, validationErrors?}` on failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<BTreeMap<String, String>>,
}

impl LeadResponse {
    pub fn success(id: impl Into<String>, reference_number: impl Into<String>) -> Self {
        Self {
            ok: true,
            id: Some(id.into()),
            reference_number: Some(reference_number.into()),
            ..Self::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn with_validation_errors(mut self, errors: BTreeMap<String, String>) -> Self {
        self.validation_errors = Some(errors);
        self
    }
}

/// Client-side interpretation of a [`LeadResponse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionResult {
    Success {
        id: String,
        reference_number: String,
    },
    Failure {
        error: String,
        validation_errors: BTreeMap<String, String>,
    },
}

/// Message used when a failure carries no text of its own.
const DEFAULT_FAILURE: &str = "Submission failed";

impl From<LeadResponse> for SubmissionResult {
    /// An `ok` response without an id is treated as a failure; a missing
    /// reference number is derived from the id.
    fn from(response: LeadResponse) -> Self {
        match (response.ok, response.id) {
            (true, Some(id)) => {
                let reference_number = response
                    .reference_number
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| reference_number_for(&id));
                Self::Success {
                    id,
                    reference_number,
                }
            }
            (true, None) => Self::Failure {
                error: "Server response did not include a lead id".to_string(),
                validation_errors: BTreeMap::new(),
            },
            (false, _) => Self::Failure {
                error: response
                    .error
                    .unwrap_or_else(|| DEFAULT_FAILURE.to_string()),
                validation_errors: response.validation_errors.unwrap_or_default(),
            },
        }
    }
}
