use thiserror::Error;

use crate::dialogue::DialogueTransitionError;
use crate::domain::reservation::DraftField;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("reservation draft is incomplete, missing {missing:?}")]
    IncompleteDraft { missing: Vec<DraftField> },
    #[error(transparent)]
    DialogueTransition(#[from] DialogueTransitionError),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Stable class name used in structured logs and CLI payloads.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(_) => "domain",
            Self::Persistence(_) => "persistence",
            Self::Integration(_) => "integration",
            Self::Configuration(_) => "configuration",
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::dialogue::{DialogueEvent, DialogueState, DialogueTransitionError};
    use crate::domain::reservation::DraftField;
    use crate::errors::{ApplicationError, DomainError};

    #[test]
    fn transition_errors_lift_into_application_errors() {
        let error = ApplicationError::from(DomainError::from(
            DialogueTransitionError::InvalidTransition {
                state: DialogueState::Idle,
                event: DialogueEvent::DraftConfirmed,
            },
        ));

        assert_eq!(error.error_class(), "domain");
        assert!(error.to_string().contains("Idle"));
    }

    #[test]
    fn incomplete_draft_names_missing_fields() {
        let error = DomainError::IncompleteDraft { missing: vec![DraftField::Time] };
        assert!(error.to_string().contains("Time"));
    }

    #[test]
    fn persistence_error_has_its_own_class() {
        assert_eq!(
            ApplicationError::Persistence("database lock timeout".to_owned()).error_class(),
            "persistence"
        );
    }
}
