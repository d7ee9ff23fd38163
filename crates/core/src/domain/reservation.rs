use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

pub const DEFAULT_GUEST_NAME: &str = "Guest";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationId(pub String);

impl ReservationId {
    pub fn generate() -> Self {
        Self(format!("RES-{}", Uuid::new_v4().simple()))
    }
}

impl std::fmt::Display for ReservationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fields collected during a booking, in the order they are requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftField {
    Date,
    Time,
    PartySize,
}

impl DraftField {
    pub const COLLECTION_ORDER: [DraftField; 3] =
        [DraftField::Date, DraftField::Time, DraftField::PartySize];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Time => "time",
            Self::PartySize => "party size",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationDraft {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub party_size: Option<u32>,
    pub name: Option<String>,
}

impl ReservationDraft {
    pub fn has(&self, field: DraftField) -> bool {
        match field {
            DraftField::Date => self.date.is_some(),
            DraftField::Time => self.time.is_some(),
            DraftField::PartySize => self.party_size.is_some(),
        }
    }

    pub fn missing_fields(&self) -> Vec<DraftField> {
        DraftField::COLLECTION_ORDER.into_iter().filter(|field| !self.has(*field)).collect()
    }

    pub fn first_missing(&self) -> Option<DraftField> {
        DraftField::COLLECTION_ORDER.into_iter().find(|field| !self.has(*field))
    }

    /// Date, time, and party size are all known.
    pub fn is_complete(&self) -> bool {
        self.first_missing().is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.time.is_none() && self.party_size.is_none()
    }

    pub fn clear(&mut self, field: DraftField) {
        match field {
            DraftField::Date => self.date = None,
            DraftField::Time => self.time = None,
            DraftField::PartySize => self.party_size = None,
        }
    }

    /// Fields that hold a value here but held none (or a different one) in
    /// `before`.
    pub fn changed_since(&self, before: &ReservationDraft) -> Vec<DraftField> {
        let mut changed = Vec::new();
        if self.date.is_some() && self.date != before.date {
            changed.push(DraftField::Date);
        }
        if self.time.is_some() && self.time != before.time {
            changed.push(DraftField::Time);
        }
        if self.party_size.is_some() && self.party_size != before.party_size {
            changed.push(DraftField::PartySize);
        }
        changed
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub party_size: u32,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// Promotes a complete draft. The name falls back to `fallback_name`, then
    /// to [`DEFAULT_GUEST_NAME`].
    pub fn from_draft(
        draft: &ReservationDraft,
        fallback_name: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let (Some(date), Some(time), Some(party_size)) = (draft.date, draft.time, draft.party_size)
        else {
            return Err(DomainError::IncompleteDraft { missing: draft.missing_fields() });
        };

        let name = draft
            .name
            .as_deref()
            .or(fallback_name)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_GUEST_NAME)
            .to_string();

        Ok(Self { id: ReservationId::generate(), date, time, party_size, name, created_at })
    }
}
