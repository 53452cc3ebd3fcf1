//! Handlers for lead capture.
//!
//! `POST /leads` re-validates the normalized payload, replays earlier
//! results for a repeated `Idempotency-Key`, rejects rapid duplicates from
//! the same session, persists the lead, and publishes `lead.submitted`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{Duration, Utc};
use uuid::Uuid;

use glasslead_core::error::CoreError;
use glasslead_core::lead::validate_lead_payload;
use glasslead_core::payload::LeadPayload;
use glasslead_core::submission::LeadResponse;
use glasslead_db::models::lead::{Lead, NewLead};
use glasslead_db::store::{UQ_IDEMPOTENCY_KEY, UQ_REFERENCE_NUMBER};
use glasslead_events::bus::{FunnelEvent, LEAD_SUBMITTED};

use crate::error::{AppError, AppResult};
use crate::response::LeadLookupResponse;
use crate::state::AppState;

/// Request header naming the submit action (lowercase header name).
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Longest accepted idempotency key.
const MAX_IDEMPOTENCY_KEY_CHARS: usize = 128;

/// Upper bound on the duplicate-rejection window (one day).
const MAX_DUPLICATE_WINDOW_SECS: u64 = 86_400;

/// Fresh ids tried when a derived reference number collides.
const MAX_REFERENCE_ATTEMPTS: usize = 3;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read the optional `Idempotency-Key` header.
fn idempotency_key(headers: &HeaderMap) -> AppResult<Option<String>> {
    let Some(value) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
        return Ok(None);
    };
    let key = value
        .to_str()
        .map_err(|_| AppError::BadRequest("Idempotency-Key must be visible ASCII".into()))?
        .trim();

    if key.is_empty() {
        return Ok(None);
    }
    if key.chars().count() > MAX_IDEMPOTENCY_KEY_CHARS {
        return Err(AppError::BadRequest(format!(
            "Idempotency-Key must be at most {MAX_IDEMPOTENCY_KEY_CHARS} characters"
        )));
    }
    Ok(Some(key.to_string()))
}

/// Reject a second lead from the same session and phone inside the
/// configured window.
async fn ensure_not_duplicate(state: &AppState, payload: &LeadPayload) -> AppResult<()> {
    let window_secs = state.config.duplicate_window_secs;
    if window_secs == 0 {
        return Ok(());
    }

    let since = Utc::now() - Duration::seconds(window_secs.min(MAX_DUPLICATE_WINDOW_SECS) as i64);
    let recent = state
        .store
        .find_recent_duplicate(&payload.session_id, &payload.phone_e164, since)
        .await?;

    if let Some(existing) = recent {
        tracing::warn!(
            lead_id = %existing.id,
            session_id = %payload.session_id,
            "Rejected duplicate lead submission"
        );
        return Err(AppError::Core(CoreError::RateLimited(
            "Too many requests: we just received a booking for this phone number".to_string(),
        )));
    }
    Ok(())
}

/// Insert the lead, retrying with a new id if the derived reference
/// number collides. Returns the row and whether this call created it.
async fn persist_lead(
    state: &AppState,
    payload: &LeadPayload,
    idempotency_key: Option<String>,
) -> AppResult<(Lead, bool)> {
    for attempt in 1..=MAX_REFERENCE_ATTEMPTS {
        let new_lead = NewLead::from_payload(payload, Uuid::new_v4(), idempotency_key.clone())?;

        match state.store.insert(new_lead).await {
            Ok(lead) => return Ok((lead, true)),
            Err(e) if e.is_conflict_on(UQ_REFERENCE_NUMBER) => {
                tracing::warn!(attempt, "Reference number collision, retrying with a new id");
            }
            Err(e) if e.is_conflict_on(UQ_IDEMPOTENCY_KEY) => {
                // A concurrent request with the same key got there first.
                if let Some(key) = &idempotency_key {
                    if let Some(existing) = state.store.find_by_idempotency_key(key).await? {
                        return Ok((existing, false));
                    }
                }
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::InternalError(
        "Could not allocate a unique reference number".to_string(),
    ))
}

fn publish_submitted(state: &AppState, lead: &Lead) {
    state.event_bus.publish(
        FunnelEvent::new(LEAD_SUBMITTED)
            .with_source("lead", lead.id.to_string())
            .with_payload(serde_json::json!({
                "id": lead.id,
                "referenceNumber": lead.reference_number,
                "serviceType": lead.service_type,
                "zip": lead.zip,
            })),
    );
}

// ---------------------------------------------------------------------------
// POST /leads
// ---------------------------------------------------------------------------

/// Capture a lead.
///
/// A repeated `Idempotency-Key` answers with the lead it created before,
/// without re-validating or persisting anything.
pub async fn create_lead(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<LeadPayload>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(payload) = body.map_err(|e| match e.status() {
        StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge,
        _ => AppError::BadRequest(e.body_text()),
    })?;
    let idempotency_key = idempotency_key(&headers)?;

    if let Some(key) = &idempotency_key {
        if let Some(existing) = state.store.find_by_idempotency_key(key).await? {
            tracing::info!(
                lead_id = %existing.id,
                reference_number = %existing.reference_number,
                "Replaying idempotent lead submission"
            );
            return Ok((
                StatusCode::OK,
                Json(LeadResponse::success(
                    existing.id.to_string(),
                    existing.reference_number,
                )),
            ));
        }
    }

    let errors = validate_lead_payload(&payload, Utc::now().date_naive());
    if !errors.is_empty() {
        tracing::info!(
            fields = ?errors.keys().collect::<Vec<_>>(),
            session_id = %payload.session_id,
            "Lead rejected by validation"
        );
        return Err(AppError::LeadValidation(errors));
    }

    ensure_not_duplicate(&state, &payload).await?;

    let (lead, created) = persist_lead(&state, &payload, idempotency_key).await?;
    if !created {
        return Ok((
            StatusCode::OK,
            Json(LeadResponse::success(lead.id.to_string(), lead.reference_number)),
        ));
    }

    publish_submitted(&state, &lead);

    tracing::info!(
        lead_id = %lead.id,
        reference_number = %lead.reference_number,
        service_type = %lead.service_type,
        utm_source = %payload.last_touch.utm_source,
        "Lead submitted"
    );

    Ok((
        StatusCode::CREATED,
        Json(LeadResponse::success(lead.id.to_string(), lead.reference_number)),
    ))
}

// ---------------------------------------------------------------------------
// GET /leads/{reference}
// ---------------------------------------------------------------------------

/// Look up a lead by reference number (case-insensitive).
pub async fn get_lead_by_reference(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> AppResult<Json<LeadLookupResponse>> {
    let reference = reference.trim().to_ascii_uppercase();
    let lead = state
        .store
        .find_by_reference(&reference)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Lead",
                id: reference.clone(),
            })
        })?;

    Ok(Json(LeadLookupResponse::from(lead)))
}
