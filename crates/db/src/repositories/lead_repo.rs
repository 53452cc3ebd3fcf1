//! Repository for the `leads` table.

use sqlx::PgPool;

use glasslead_core::types::Timestamp;

use crate::models::lead::{Lead, NewLead};

/// Column list for `leads` queries.
const COLUMNS: &str = "id, reference_number, status, service_type, mobile_service, \
     first_name, last_name, phone_e164, email, \
     vehicle_year, vehicle_make, vehicle_model, \
     address, city, state, zip, preferred_date, time_preference, notes, \
     sms_consent, privacy_acknowledgment, terms_accepted, \
     client_id, session_id, first_touch, last_touch, idempotency_key, \
     submitted_at, created_at, updated_at";

/// Provides insert and lookup operations for leads.
pub struct LeadRepo;

impl LeadRepo {
    /// Insert a new lead, returning the created row.
    pub async fn create(pool: &PgPool, input: &NewLead) -> Result<Lead, sqlx::Error> {
        let query = format!(
            "INSERT INTO leads (id, reference_number, status, service_type, mobile_service, \
                 first_name, last_name, phone_e164, email, \
                 vehicle_year, vehicle_make, vehicle_model, \
                 address, city, state, zip, preferred_date, time_preference, notes, \
                 sms_consent, privacy_acknowledgment, terms_accepted, \
                 client_id, session_id, first_touch, last_touch, idempotency_key) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, \
                 $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Lead>(&query)
            .bind(input.id)
            .bind(&input.reference_number)
            .bind(input.status.as_str())
            .bind(&input.service_type)
            .bind(input.mobile_service)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.phone_e164)
            .bind(&input.email)
            .bind(input.vehicle_year)
            .bind(&input.vehicle_make)
            .bind(&input.vehicle_model)
            .bind(&input.address)
            .bind(&input.city)
            .bind(&input.state)
            .bind(&input.zip)
            .bind(input.preferred_date)
            .bind(&input.time_preference)
            .bind(&input.notes)
            .bind(input.sms_consent)
            .bind(input.privacy_acknowledgment)
            .bind(input.terms_accepted)
            .bind(&input.client_id)
            .bind(&input.session_id)
            .bind(&input.first_touch)
            .bind(&input.last_touch)
            .bind(&input.idempotency_key)
            .fetch_one(pool)
            .await
    }

    /// Find a lead by its customer-facing reference number.
    pub async fn find_by_reference(
        pool: &PgPool,
        reference_number: &str,
    ) -> Result<Option<Lead>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM leads WHERE reference_number = $1");
        sqlx::query_as::<_, Lead>(&query)
            .bind(reference_number)
            .fetch_optional(pool)
            .await
    }

    /// Find the lead created by a given submit action.
    pub async fn find_by_idempotency_key(
        pool: &PgPool,
        key: &str,
    ) -> Result<Option<Lead>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM leads WHERE idempotency_key = $1");
        sqlx::query_as::<_, Lead>(&query)
            .bind(key)
            .fetch_optional(pool)
            .await
    }

    /// Most recent lead from the same session and phone submitted at or
    /// after `since`.
    pub async fn find_recent_by_session_phone(
        pool: &PgPool,
        session_id: &str,
        phone_e164: &str,
        since: Timestamp,
    ) -> Result<Option<Lead>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM leads \
             WHERE session_id = $1 AND phone_e164 = $2 AND submitted_at >= $3 \
             ORDER BY submitted_at DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, Lead>(&query)
            .bind(session_id)
            .bind(phone_e164)
            .bind(since)
            .fetch_optional(pool)
            .await
    }
}
