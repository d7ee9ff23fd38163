use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditOutcome, AuditSink};
use crate::dialogue::states::{
    DialogueAction, DialogueContext, DialogueEvent, DialogueState, TransitionOutcome,
};
use crate::domain::reservation::DraftField;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DialogueTransitionError {
    #[error("missing required fields before transition from {state:?}: {missing_fields:?}")]
    MissingRequiredFields { state: DialogueState, missing_fields: Vec<DraftField> },
    #[error("draft field {field:?} failed validation in state {state:?}")]
    InvalidDraft { state: DialogueState, field: DraftField },
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: DialogueState, event: DialogueEvent },
}

/// The dialogue transition table. Pure: the caller owns the session and
/// applies the outcome.
pub fn transition(
    current: DialogueState,
    event: DialogueEvent,
    context: &DialogueContext,
) -> Result<TransitionOutcome, DialogueTransitionError> {
    use DialogueAction::{
        CloseSession, DiscardDraft, PersistReservation, PromptForField, RequestConfirmation,
        RequestReplacement,
    };
    use DialogueEvent::{
        DraftConfirmed, DraftDeclined, DraftUpdated, FarewellReceived, SlotUnavailable,
    };
    use DialogueState::{
        AwaitingConfirmation, Closed, CollectingDate, CollectingPartySize, CollectingTime, Idle,
    };

    let (to, actions) = match (current, event) {
        (Closed, _) => {
            return Err(DialogueTransitionError::InvalidTransition { state: current, event });
        }
        (_, FarewellReceived) => (Closed, vec![CloseSession]),
        (
            Idle | CollectingDate | CollectingTime | CollectingPartySize | AwaitingConfirmation,
            DraftUpdated,
        ) => match (context.rejected_field, context.missing_fields.first()) {
            (Some(field), _) => (DialogueState::collecting(field), vec![RequestReplacement(field)]),
            (None, Some(field)) => (DialogueState::collecting(*field), vec![PromptForField(*field)]),
            (None, None) => (AwaitingConfirmation, vec![RequestConfirmation]),
        },
        (AwaitingConfirmation, DraftConfirmed) => {
            if !context.missing_fields.is_empty() {
                return Err(DialogueTransitionError::MissingRequiredFields {
                    state: current,
                    missing_fields: context.missing_fields.clone(),
                });
            }
            if let Some(field) = context.rejected_field {
                return Err(DialogueTransitionError::InvalidDraft { state: current, field });
            }
            (Idle, vec![PersistReservation])
        }
        (AwaitingConfirmation, DraftDeclined) => {
            (CollectingDate, vec![DiscardDraft, PromptForField(DraftField::Date)])
        }
        (Idle, SlotUnavailable) => (CollectingTime, vec![RequestReplacement(DraftField::Time)]),
        _ => {
            return Err(DialogueTransitionError::InvalidTransition { state: current, event });
        }
    };

    Ok(TransitionOutcome { from: current, to, event, actions })
}

pub fn apply_with_audit<S>(
    current: DialogueState,
    event: DialogueEvent,
    context: &DialogueContext,
    sink: &S,
    audit: &AuditContext,
) -> Result<TransitionOutcome, DialogueTransitionError>
where
    S: AuditSink + ?Sized,
{
    let result = transition(current, event, context);
    match &result {
        Ok(outcome) => {
            sink.emit(
                audit
                    .event(
                        "dialogue.transition_applied",
                        AuditCategory::Dialogue,
                        AuditOutcome::Success,
                    )
                    .with_metadata("from", format!("{:?}", outcome.from))
                    .with_metadata("to", format!("{:?}", outcome.to))
                    .with_metadata("event", format!("{:?}", outcome.event)),
            );
        }
        Err(error) => {
            sink.emit(
                audit
                    .event(
                        "dialogue.transition_rejected",
                        AuditCategory::Dialogue,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("error", error.to_string()),
            );
        }
    }
    result
}
