pub mod engine;
pub mod machine;
pub mod reply;
pub mod states;

pub use engine::{apply_with_audit, transition, DialogueTransitionError};
pub use machine::{DialogueMachine, TurnAudit, TurnPlan};
pub use reply::{Courtesy, PartOfDay, Reply};
pub use states::{
    DialogueAction, DialogueContext, DialogueEvent, DialogueState, PendingQuestion,
    TransitionOutcome,
};
