//! Conversation runtime for the reservation assistant.
//!
//! A turn flows through the deterministic dialogue machine in
//! `goodtable-core`, hits the reservation repository when a booking is
//! confirmed, and is phrased by the [`composer`]. The optional AI backend in
//! [`llm`] only rewords the composed content. It never decides fields,
//! validation, or state.

pub mod audit;
pub mod composer;
pub mod llm;
pub mod runtime;

pub use audit::TracingAuditSink;
pub use composer::{ComposeError, ComposeRequest, ResponseComposer};
pub use llm::{build_llm_client, CompletionError, CompletionRequest, LlmClient};
pub use runtime::ConversationEngine;
