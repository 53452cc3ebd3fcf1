//! Booking state machine.
//!
//! ```text
//! Editing(Vehicle) --Next(valid)--> Editing(Contact) --Next(valid)--> Editing(Review)
//! Editing(step)    --Previous-----> Editing(step - 1, floored)
//! Editing(Review)  --Submit(valid)-> Submitting
//! Submitting       --Succeeded----> Submitted   (terminal)
//! Submitting       --Failed-------> Editing(Review)
//! ```
//!
//! [`transition`] is pure: it reads the draft only to run the step validator
//! and never touches storage or the network.

use serde::{Deserialize, Serialize};

use crate::booking::{BookingDraft, FormStep};
use crate::error::CoreError;
use crate::validation::{validate_step, FieldErrors};

/// Details shown on the confirmation view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub lead_id: String,
    pub reference_number: String,
}

/// Where the booking flow currently is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BookingState {
    Editing { step: FormStep },
    Submitting,
    Submitted { confirmation: Confirmation },
}

impl Default for BookingState {
    fn default() -> Self {
        Self::Editing {
            step: FormStep::Vehicle,
        }
    }
}

impl BookingState {
    /// The visible form step, if the form is editable.
    pub fn step(&self) -> Option<FormStep> {
        match self {
            Self::Editing { step } => Some(*step),
            Self::Submitting | Self::Submitted { .. } => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Editing { .. } => "editing",
            Self::Submitting => "submitting",
            Self::Submitted { .. } => "submitted",
        }
    }
}

/// User or network driven inputs to the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingEvent {
    Next,
    Previous,
    Submit,
    SubmissionSucceeded(Confirmation),
    SubmissionFailed,
}

impl BookingEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Next => "next",
            Self::Previous => "previous",
            Self::Submit => "submit",
            Self::SubmissionSucceeded(_) => "submission_succeeded",
            Self::SubmissionFailed => "submission_failed",
        }
    }
}

/// Result of applying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: BookingState,
    /// Errors to display; empty when the event passed validation or did
    /// not validate at all.
    pub errors: FieldErrors,
    /// Scroll the view to the top (new step, or first error visible).
    pub scroll_to_top: bool,
}

impl Transition {
    fn to(state: BookingState, scroll_to_top: bool) -> Self {
        Self {
            state,
            errors: FieldErrors::new(),
            scroll_to_top,
        }
    }
}

/// Apply `event` to `state`.
///
/// Validation failures are not errors: they produce a transition that stays
/// on the current step with a non-empty error map. `Err` is reserved for
/// events that make no sense in the current state, such as submitting from
/// step 1 or navigating after submission.
pub fn transition(
    state: &BookingState,
    event: BookingEvent,
    draft: &BookingDraft,
) -> Result<Transition, CoreError> {
    let invalid = || CoreError::InvalidTransition {
        state: state.name(),
        event: event.name(),
    };

    match (state, &event) {
        (BookingState::Editing { step }, BookingEvent::Next) => {
            let errors = validate_step(*step, draft);
            let step = if errors.is_empty() { step.next() } else { *step };
            Ok(Transition {
                state: BookingState::Editing { step },
                errors,
                scroll_to_top: true,
            })
        }
        (BookingState::Editing { step }, BookingEvent::Previous) => Ok(Transition::to(
            BookingState::Editing {
                step: step.previous(),
            },
            false,
        )),
        (
            BookingState::Editing {
                step: FormStep::Review,
            },
            BookingEvent::Submit,
        ) => {
            let errors = validate_step(FormStep::Review, draft);
            if errors.is_empty() {
                Ok(Transition::to(BookingState::Submitting, false))
            } else {
                Ok(Transition {
                    state: state.clone(),
                    errors,
                    scroll_to_top: true,
                })
            }
        }
        (BookingState::Submitting, BookingEvent::SubmissionSucceeded(confirmation)) => {
            Ok(Transition::to(
                BookingState::Submitted {
                    confirmation: confirmation.clone(),
                },
                true,
            ))
        }
        (BookingState::Submitting, BookingEvent::SubmissionFailed) => Ok(Transition::to(
            BookingState::Editing {
                step: FormStep::Review,
            },
            true,
        )),
        _ => Err(invalid()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
