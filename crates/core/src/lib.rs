pub mod audit;
pub mod clock;
pub mod config;
pub mod dialogue;
pub mod domain;
pub mod errors;
pub mod extraction;
pub mod intent;
pub mod knowledge;
pub mod session;
pub mod temporal;
pub mod text;
pub mod validation;

pub use audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
pub use clock::{local_to_utc, Clock, FixedClock, SystemClock};
pub use dialogue::{
    Courtesy, DialogueMachine, DialogueState, PendingQuestion, Reply, TurnAudit, TurnPlan,
};
pub use domain::customer::{customer_key, CustomerHistory};
pub use domain::reservation::{
    DraftField, Reservation, ReservationDraft, ReservationId, DEFAULT_GUEST_NAME,
};
pub use errors::{ApplicationError, DomainError};
pub use extraction::{ExtractedFields, FieldExtractor, ScanContext};
pub use intent::{ClassificationContext, Intent, IntentClassifier, IntentResult};
pub use knowledge::{FaqTopic, OpeningHours, RestaurantKnowledge};
pub use session::{Session, Speaker, Turn};
pub use temporal::{SameWeekdayPolicy, TemporalResolver, TemporalSettings};
pub use text::Utterance;
pub use validation::{ReservationRules, ReservationValidator, ValidationFailure};
