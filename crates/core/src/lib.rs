//! Glasslead domain core.
//!
//! Pure booking-funnel logic shared by the client controller and the API:
//! the draft model, per-step validation, attribution and URL prefill, the
//! submission normalizer, server-side lead rules, and the booking state
//! machine. No I/O lives here.

pub mod attribution;
pub mod booking;
pub mod error;
pub mod flow;
pub mod lead;
pub mod payload;
pub mod phone;
pub mod submission;
pub mod types;
pub mod validation;
