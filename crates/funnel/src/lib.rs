//! Client side of the booking funnel.
//!
//! [`controller::BookingController`] drives one page's worth of funnel:
//! it merges the saved draft with URL prefill, runs the step machine from
//! `glasslead_core::flow`, writes every change through the
//! [`draft_store::DraftStore`], and posts the normalized lead through a
//! [`submit::LeadSubmitter`]. Storage and identity sit behind traits so
//! hosts can back them with whatever persistence they have.

pub mod config;
pub mod controller;
pub mod draft_store;
pub mod identity;
pub mod storage;
pub mod submit;
pub mod url_params;
