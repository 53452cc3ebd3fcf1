//! The booking funnel as seen by a page: draft, state machine, persistence
//! and submission wired together.
//!
//! A [`BookingController`] is created once per page mount. Every draft edit
//! and step change is written through to the [`DraftStore`]; a successful
//! submission clears it.

use std::sync::Arc;

use uuid::Uuid;

use glasslead_core::attribution::{merge_initial_draft, resolve_touch, AttributionTouch};
use glasslead_core::booking::{BookingDraft, FormStep};
use glasslead_core::error::CoreError;
use glasslead_core::flow::{transition, BookingEvent, BookingState, Confirmation, Transition};
use glasslead_core::payload::{normalize_submission, SubmissionIdentity};
use glasslead_core::phone;
use glasslead_core::submission::SubmissionResult;
use glasslead_core::validation::{can_advance, field_errors_from_names, FieldErrors};

use crate::draft_store::DraftStore;
use crate::identity::{IdentityKind, IdentityProvider};
use crate::submit::{LeadSubmitter, SubmissionErrorKind};
use crate::url_params::params_from_url;

#[derive(Debug, thiserror::Error)]
pub enum FunnelError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Draft edits are only accepted while a form step is visible.
    #[error("The booking cannot be edited while {0}")]
    NotEditable(&'static str),
}

/// What a step navigation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavOutcome {
    pub step: FormStep,
    pub moved: bool,
    pub scroll_to_top: bool,
}

/// A failed submission as shown above the step-3 form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitFailure {
    pub kind: SubmissionErrorKind,
    /// Actionable, user-facing text.
    pub message: String,
    /// Raw error text, for logs.
    pub detail: String,
    /// Earliest step rendering a field the server rejected.
    pub step: Option<FormStep>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Client-side validation failed; nothing was sent.
    Invalid,
    Submitted(Confirmation),
    Failed(SubmitFailure),
}

pub struct BookingController {
    draft: BookingDraft,
    state: BookingState,
    errors: FieldErrors,
    submit_error: Option<SubmitFailure>,
    first_touch: AttributionTouch,
    /// Reused across retries of an unchanged draft.
    idempotency_key: Option<String>,
    drafts: DraftStore,
    identity: Arc<dyn IdentityProvider>,
    submitter: Arc<dyn LeadSubmitter>,
}

impl BookingController {
    /// Build the initial draft from the saved snapshot and the page URL.
    ///
    /// URL prefill wins over the snapshot. The saved step is resumed only as
    /// far as the merged draft still passes the preceding steps.
    pub fn mount(
        drafts: DraftStore,
        identity: Arc<dyn IdentityProvider>,
        submitter: Arc<dyn LeadSubmitter>,
        page_url: &str,
        referrer: Option<&str>,
    ) -> Self {
        let params = params_from_url(page_url);
        let resumed = drafts.load();
        let saved_step = resumed.as_ref().map_or(FormStep::Vehicle, |r| r.step);
        let draft = merge_initial_draft(resumed.map(|r| r.draft), &params);
        let step = reachable_step(saved_step, &draft);

        let first_touch = drafts.record_first_touch(&resolve_touch(&params, referrer));
        let idempotency_key = drafts.pending_submission();

        tracing::debug!(
            step = step.to_number(),
            resumed_submission = idempotency_key.is_some(),
            "Booking funnel mounted"
        );

        let controller = Self {
            draft,
            state: BookingState::Editing { step },
            errors: FieldErrors::new(),
            submit_error: None,
            first_touch,
            idempotency_key,
            drafts,
            identity,
            submitter,
        };
        controller.persist();
        controller
    }

    pub fn draft(&self) -> &BookingDraft {
        &self.draft
    }

    pub fn state(&self) -> &BookingState {
        &self.state
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn submit_error(&self) -> Option<&SubmitFailure> {
        self.submit_error.as_ref()
    }

    pub fn first_touch(&self) -> &AttributionTouch {
        &self.first_touch
    }

    /// Apply an edit to the draft and persist it.
    ///
    /// Editing starts a new submit action, so any pending idempotency key
    /// is dropped.
    pub fn update(&mut self, edit: impl FnOnce(&mut BookingDraft)) -> Result<(), FunnelError> {
        if self.state.step().is_none() {
            return Err(FunnelError::NotEditable(self.state.name()));
        }
        edit(&mut self.draft);
        self.draft.contact.phone = phone::format_display(&self.draft.contact.phone);
        if self.idempotency_key.take().is_some() {
            self.drafts.set_pending_submission(None);
        }
        self.persist();
        Ok(())
    }

    pub fn go_next(&mut self) -> Result<NavOutcome, FunnelError> {
        self.navigate(BookingEvent::Next)
    }

    pub fn go_previous(&mut self) -> Result<NavOutcome, FunnelError> {
        self.navigate(BookingEvent::Previous)
    }

    /// Validate step 3 and, if it passes, send the lead.
    ///
    /// Exactly one request is made per call. While the request is in flight
    /// the controller is `Submitting` and refuses further submits.
    pub async fn submit(
        &mut self,
        page_url: &str,
        referrer: Option<&str>,
    ) -> Result<SubmitOutcome, FunnelError> {
        let t = transition(&self.state, BookingEvent::Submit, &self.draft)?;
        if t.state != BookingState::Submitting {
            tracing::debug!(errors = t.errors.len(), "Submit blocked by validation");
            self.apply(t);
            return Ok(SubmitOutcome::Invalid);
        }
        self.state = BookingState::Submitting;
        self.errors.clear();
        self.submit_error = None;

        let identity = SubmissionIdentity {
            client_id: self.identity.get_or_create(IdentityKind::Client),
            session_id: self.identity.get_or_create(IdentityKind::Session),
        };
        let last_touch = resolve_touch(&params_from_url(page_url), referrer);
        let payload = normalize_submission(
            &self.draft,
            &identity,
            Some(&self.first_touch),
            &last_touch,
        );

        let key = self
            .idempotency_key
            .get_or_insert_with(|| Uuid::new_v4().to_string())
            .clone();
        self.drafts.set_pending_submission(Some(&key));

        tracing::info!(
            session_id = %identity.session_id,
            idempotency_key = %key,
            "Submitting booking"
        );

        let result = self.submitter.submit(&payload, &key).await;
        match result {
            Ok(response) => match SubmissionResult::from(response) {
                SubmissionResult::Success {
                    id,
                    reference_number,
                } => self.succeed(Confirmation {
                    lead_id: id,
                    reference_number,
                }),
                SubmissionResult::Failure {
                    error,
                    validation_errors,
                } => {
                    let (fields, unknown) = field_errors_from_names(&validation_errors);
                    let kind = if fields.is_empty() {
                        SubmissionErrorKind::classify(&error)
                    } else {
                        SubmissionErrorKind::Validation
                    };
                    let detail = unknown.iter().fold(error, |mut detail, (name, message)| {
                        detail.push_str(&format!("; {name}: {message}"));
                        detail
                    });
                    self.fail(kind, detail, fields)
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Lead submission request failed");
                self.fail(e.kind(), e.to_string(), FieldErrors::new())
            }
        }
    }

    /// Return to step 3 after a submission that never resolved (the future
    /// was dropped). The idempotency key is kept so a retry cannot create a
    /// second lead.
    pub fn recover_interrupted_submission(&mut self) -> Result<(), FunnelError> {
        let t = transition(&self.state, BookingEvent::SubmissionFailed, &self.draft)?;
        self.apply(t);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn navigate(&mut self, event: BookingEvent) -> Result<NavOutcome, FunnelError> {
        let t = transition(&self.state, event, &self.draft)?;
        let moved = t.state != self.state;
        let scroll_to_top = t.scroll_to_top;
        self.submit_error = None;
        self.apply(t);

        let step = self
            .state
            .step()
            .ok_or(FunnelError::NotEditable(self.state.name()))?;
        Ok(NavOutcome {
            step,
            moved,
            scroll_to_top,
        })
    }

    fn apply(&mut self, t: Transition) {
        self.state = t.state;
        self.errors = t.errors;
        self.persist();
    }

    fn succeed(&mut self, confirmation: Confirmation) -> Result<SubmitOutcome, FunnelError> {
        let t = transition(
            &self.state,
            BookingEvent::SubmissionSucceeded(confirmation.clone()),
            &self.draft,
        )?;
        self.state = t.state;
        self.idempotency_key = None;
        if let Err(e) = self.drafts.clear() {
            tracing::warn!(error = %e, "Failed to clear booking draft after submission");
        }

        tracing::info!(
            lead_id = %confirmation.lead_id,
            reference_number = %confirmation.reference_number,
            "Booking submitted"
        );
        Ok(SubmitOutcome::Submitted(confirmation))
    }

    fn fail(
        &mut self,
        kind: SubmissionErrorKind,
        detail: String,
        fields: FieldErrors,
    ) -> Result<SubmitOutcome, FunnelError> {
        let t = transition(&self.state, BookingEvent::SubmissionFailed, &self.draft)?;
        self.apply(t);

        let step = fields.keys().map(|f| f.step()).min();
        let message = match step {
            Some(step) if step != FormStep::Review => format!(
                "{} Go back to step {} ({}) to fix it.",
                kind.user_message(),
                step.to_number(),
                step.label()
            ),
            _ => kind.user_message().to_string(),
        };
        self.errors = fields;

        let failure = SubmitFailure {
            kind,
            message,
            detail,
            step,
        };
        tracing::info!(
            kind = ?kind,
            step = ?failure.step,
            detail = %failure.detail,
            "Booking submission failed"
        );
        self.submit_error = Some(failure.clone());
        Ok(SubmitOutcome::Failed(failure))
    }

    /// Write-through. Only editable states are persisted.
    fn persist(&self) {
        let Some(step) = self.state.step() else {
            return;
        };
        if let Err(e) = self.drafts.save(&self.draft, step) {
            tracing::warn!(error = %e, "Failed to save booking draft");
        }
    }
}

/// The furthest step up to `saved` whose predecessors all validate.
fn reachable_step(saved: FormStep, draft: &BookingDraft) -> FormStep {
    let mut step = FormStep::Vehicle;
    while step < saved && can_advance(step, draft) {
        step = step.next();
    }
    step
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
