use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::dialogue::states::PendingQuestion;
use crate::domain::reservation::{DraftField, Reservation, ReservationDraft};
use crate::knowledge::FaqTopic;
use crate::validation::ValidationFailure;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl PartOfDay {
    pub fn at(time: NaiveTime) -> Self {
        match time.hour() {
            0..=11 => Self::Morning,
            12..=19 => Self::Afternoon,
            _ => Self::Evening,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
        }
    }
}

/// Social opener acknowledged ahead of a booking reply when one utterance
/// carries both, e.g. "Hi, 8pm for 4 please".
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Courtesy {
    Greeting { part_of_day: PartOfDay },
    Thanks,
    Name { name: String, returning: bool },
}

/// What the assistant decided to say this turn. The response composer turns
/// it into text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Greet {
        name: Option<String>,
        returning: bool,
        part_of_day: PartOfDay,
        pending: Option<PendingQuestion>,
    },
    AcknowledgeName {
        name: String,
        returning: bool,
        pending: Option<PendingQuestion>,
    },
    AnswerFaq {
        topic: FaqTopic,
        answer: String,
        pending: Option<PendingQuestion>,
    },
    AskForField {
        field: DraftField,
        draft: ReservationDraft,
    },
    RejectField {
        failure: ValidationFailure,
        draft: ReservationDraft,
    },
    ConfirmDraft {
        draft: ReservationDraft,
        name: Option<String>,
    },
    BookingConfirmed {
        reservation: Reservation,
    },
    SlotUnavailable {
        date: NaiveDate,
        time: NaiveTime,
    },
    /// Storage failed; the draft is kept so the customer can confirm again.
    SaveFailed {
        draft: ReservationDraft,
        name: Option<String>,
    },
    RestartCollection,
    Thanks {
        pending: Option<PendingQuestion>,
    },
    Farewell {
        name: Option<String>,
    },
    Clarify {
        pending: Option<PendingQuestion>,
    },
    Prefaced {
        courtesy: Courtesy,
        reply: Box<Reply>,
    },
}

impl Reply {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Greet { .. } => "greet",
            Self::AcknowledgeName { .. } => "acknowledge_name",
            Self::AnswerFaq { .. } => "answer_faq",
            Self::AskForField { .. } => "ask_for_field",
            Self::RejectField { .. } => "reject_field",
            Self::ConfirmDraft { .. } => "confirm_draft",
            Self::BookingConfirmed { .. } => "booking_confirmed",
            Self::SlotUnavailable { .. } => "slot_unavailable",
            Self::SaveFailed { .. } => "save_failed",
            Self::RestartCollection => "restart_collection",
            Self::Thanks { .. } => "thanks",
            Self::Farewell { .. } => "farewell",
            Self::Clarify { .. } => "clarify",
            Self::Prefaced { reply, .. } => reply.kind(),
        }
    }

    /// Flags a greeting or introduction as addressed to a returning customer.
    pub fn mark_returning(&mut self) {
        match self {
            Self::Greet { returning, .. }
            | Self::AcknowledgeName { returning, .. }
            | Self::Prefaced { courtesy: Courtesy::Name { returning, .. }, .. } => {
                *returning = true;
            }
            _ => {}
        }
    }

    pub fn is_returning(&self) -> bool {
        matches!(
            self,
            Self::Greet { returning: true, .. }
                | Self::AcknowledgeName { returning: true, .. }
                | Self::Prefaced { courtesy: Courtesy::Name { returning: true, .. }, .. }
        )
    }
}
