use serde::{Deserialize, Serialize};

use crate::domain::reservation::DraftField;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DialogueState {
    Idle,
    CollectingDate,
    CollectingTime,
    CollectingPartySize,
    AwaitingConfirmation,
    Closed,
}

impl DialogueState {
    pub fn collecting(field: DraftField) -> Self {
        match field {
            DraftField::Date => Self::CollectingDate,
            DraftField::Time => Self::CollectingTime,
            DraftField::PartySize => Self::CollectingPartySize,
        }
    }

    /// The field being asked for, if any.
    pub fn focus(&self) -> Option<DraftField> {
        match self {
            Self::CollectingDate => Some(DraftField::Date),
            Self::CollectingTime => Some(DraftField::Time),
            Self::CollectingPartySize => Some(DraftField::PartySize),
            Self::Idle | Self::AwaitingConfirmation | Self::Closed => None,
        }
    }

    pub fn is_collecting(&self) -> bool {
        self.focus().is_some()
    }

    pub fn pending_question(&self) -> Option<PendingQuestion> {
        match self {
            Self::AwaitingConfirmation => Some(PendingQuestion::Confirmation),
            other => other.focus().map(PendingQuestion::Field),
        }
    }
}

/// What the assistant is waiting to hear, repeated after side questions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingQuestion {
    Field(DraftField),
    Confirmation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogueEvent {
    DraftUpdated,
    DraftConfirmed,
    DraftDeclined,
    SlotUnavailable,
    FarewellReceived,
}

/// Facts about the draft the transition table needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DialogueContext {
    pub missing_fields: Vec<DraftField>,
    /// Field that failed validation and has been cleared.
    pub rejected_field: Option<DraftField>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogueAction {
    PromptForField(DraftField),
    RequestReplacement(DraftField),
    RequestConfirmation,
    PersistReservation,
    DiscardDraft,
    CloseSession,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: DialogueState,
    pub to: DialogueState,
    pub event: DialogueEvent,
    pub actions: Vec<DialogueAction>,
}
