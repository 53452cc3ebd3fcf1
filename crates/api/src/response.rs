//! Response bodies specific to the HTTP surface.
//!
//! Lead creation answers with [`glasslead_core::submission::LeadResponse`],
//! which the funnel client deserializes directly; the types here cover the
//! remaining endpoints.

use serde::Serialize;

use glasslead_core::types::{LeadId, Timestamp};
use glasslead_db::models::lead::Lead;

/// `GET /api/v1/leads/{reference}` body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadLookupResponse {
    pub ok: bool,
    pub id: LeadId,
    pub reference_number: String,
    pub status: String,
    pub submitted_at: Timestamp,
}

impl From<Lead> for LeadLookupResponse {
    fn from(lead: Lead) -> Self {
        Self {
            ok: true,
            id: lead.id,
            reference_number: lead.reference_number,
            status: lead.status,
            submitted_at: lead.submitted_at,
        }
    }
}
