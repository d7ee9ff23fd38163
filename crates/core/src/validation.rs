use chrono::{Datelike, Duration, NaiveDate, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::domain::reservation::{DraftField, ReservationDraft};
use crate::knowledge::{weekday_name, DayHours, OpeningHours};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRules {
    pub min_party_size: u32,
    pub max_party_size: u32,
    /// Zero disables the booking horizon.
    pub max_days_ahead: u32,
    /// Zero disables the slot grid.
    pub slot_interval_minutes: u32,
}

impl Default for ReservationRules {
    fn default() -> Self {
        Self { min_party_size: 1, max_party_size: 10, max_days_ahead: 30, slot_interval_minutes: 30 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationFailure {
    PastDate,
    BeyondHorizon { max_days: u32 },
    ClosedDay { weekday: Weekday },
    OutsideHours { weekday: Weekday, hours: DayHours },
    OffSlot { interval_minutes: u32 },
    PartySizeOutOfRange { min: u32, max: u32 },
}

impl ValidationFailure {
    /// The field the customer has to supply again.
    pub fn field(&self) -> DraftField {
        match self {
            Self::PastDate | Self::BeyondHorizon { .. } | Self::ClosedDay { .. } => DraftField::Date,
            Self::OutsideHours { .. } | Self::OffSlot { .. } => DraftField::Time,
            Self::PartySizeOutOfRange { .. } => DraftField::PartySize,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::PastDate => "past_date",
            Self::BeyondHorizon { .. } => "beyond_horizon",
            Self::ClosedDay { .. } => "closed_day",
            Self::OutsideHours { .. } => "outside_hours",
            Self::OffSlot { .. } => "off_slot",
            Self::PartySizeOutOfRange { .. } => "party_size_out_of_range",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::PastDate => "That date has already passed.".to_string(),
            Self::BeyondHorizon { max_days } => {
                format!("We only take reservations up to {max_days} days in advance.")
            }
            Self::ClosedDay { weekday } => {
                format!("We're closed on {}s.", weekday_name(*weekday))
            }
            Self::OutsideHours { weekday, hours } => {
                format!("On {}s we're open {hours}.", weekday_name(*weekday))
            }
            Self::OffSlot { interval_minutes } => {
                format!("We seat guests every {interval_minutes} minutes, on the hour or half hour.")
            }
            Self::PartySizeOutOfRange { min, max } => {
                format!("We can seat parties of {min} to {max} people.")
            }
        }
    }
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Invalid(ValidationFailure),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ReservationValidator {
    rules: ReservationRules,
}

impl ReservationValidator {
    pub fn new(rules: ReservationRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ReservationRules {
        &self.rules
    }

    /// Checks run in a fixed order and the first failure is reported. A check
    /// whose inputs are still missing from the draft is skipped, so partial
    /// drafts can be validated as fields arrive.
    pub fn validate(
        &self,
        draft: &ReservationDraft,
        opening_hours: &OpeningHours,
        reference: NaiveDate,
    ) -> ValidationOutcome {
        match self.first_failure(draft, opening_hours, reference) {
            Some(failure) => ValidationOutcome::Invalid(failure),
            None => ValidationOutcome::Valid,
        }
    }

    fn first_failure(
        &self,
        draft: &ReservationDraft,
        opening_hours: &OpeningHours,
        reference: NaiveDate,
    ) -> Option<ValidationFailure> {
        let rules = &self.rules;

        if let Some(date) = draft.date {
            if date < reference {
                return Some(ValidationFailure::PastDate);
            }
            if rules.max_days_ahead > 0
                && date > reference + Duration::days(i64::from(rules.max_days_ahead))
            {
                return Some(ValidationFailure::BeyondHorizon { max_days: rules.max_days_ahead });
            }
            let weekday = date.weekday();
            let hours = opening_hours.hours_for(weekday);
            if !hours.is_open() {
                return Some(ValidationFailure::ClosedDay { weekday });
            }
            if let Some(time) = draft.time {
                if !hours.contains(time) {
                    return Some(ValidationFailure::OutsideHours { weekday, hours });
                }
            }
        }

        if let Some(time) = draft.time {
            let interval = rules.slot_interval_minutes;
            let minutes = time.hour() * 60 + time.minute();
            if interval > 0 && (minutes % interval != 0 || time.second() != 0) {
                return Some(ValidationFailure::OffSlot { interval_minutes: interval });
            }
        }

        if let Some(party_size) = draft.party_size {
            if party_size < rules.min_party_size || party_size > rules.max_party_size {
                return Some(ValidationFailure::PartySizeOutOfRange {
                    min: rules.min_party_size,
                    max: rules.max_party_size,
                });
            }
        }

        None
    }
}
