use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::dialogue::{DialogueState, PendingQuestion};
use crate::domain::reservation::ReservationDraft;
use crate::intent::Intent;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Customer,
    Assistant,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

/// One conversation. Owned by a single turn at a time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub known_name: Option<String>,
    pub draft: Option<ReservationDraft>,
    pub state: DialogueState,
    pub last_intent: Option<Intent>,
    pub last_activity: NaiveDateTime,
    history: Vec<Turn>,
}

impl Session {
    pub fn new(id: impl Into<String>, now: NaiveDateTime) -> Self {
        Self {
            id: id.into(),
            known_name: None,
            draft: None,
            state: DialogueState::Idle,
            last_intent: None,
            last_activity: now,
            history: Vec::new(),
        }
    }

    pub fn record(&mut self, speaker: Speaker, text: impl Into<String>) {
        self.history.push(Turn { speaker, text: text.into() });
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// The last `window` turns, oldest first.
    pub fn recent_history(&self, window: usize) -> &[Turn] {
        let start = self.history.len().saturating_sub(window);
        &self.history[start..]
    }

    pub fn touch(&mut self, now: NaiveDateTime) {
        self.last_activity = now;
    }

    pub fn is_idle(&self, now: NaiveDateTime, timeout: Duration) -> bool {
        now - self.last_activity > timeout
    }

    pub fn pending_question(&self) -> Option<PendingQuestion> {
        self.state.pending_question()
    }

    pub fn is_closed(&self) -> bool {
        self.state == DialogueState::Closed
    }
}
