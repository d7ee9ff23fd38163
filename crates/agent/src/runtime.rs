use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use goodtable_core::audit::{AuditCategory, AuditContext, AuditOutcome, AuditSink};
use goodtable_core::clock::Clock;
use goodtable_core::config::AppConfig;
use goodtable_core::dialogue::{DialogueMachine, DialogueState, Reply, TurnAudit};
use goodtable_core::domain::reservation::Reservation;
use goodtable_core::errors::ApplicationError;
use goodtable_core::extraction::FieldExtractor;
use goodtable_core::session::{Session, Speaker};
use goodtable_core::temporal::TemporalResolver;
use goodtable_core::validation::ReservationValidator;
use goodtable_db::{RepositoryError, ReservationRepository};

use crate::composer::{ComposeRequest, ResponseComposer};
use crate::llm::LlmClient;

const ACTOR: &str = "conversation-engine";
const DEFAULT_HISTORY_WINDOW: usize = 10;
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

struct SessionSlot {
    session: Session,
    /// The known customer has booked with us before.
    returning: bool,
}

impl SessionSlot {
    fn new(session_id: &str, now: chrono::NaiveDateTime) -> Self {
        Self { session: Session::new(session_id, now), returning: false }
    }
}

/// Owns every live session and runs one customer turn at a time per session.
/// Different sessions proceed independently.
pub struct ConversationEngine {
    machine: DialogueMachine,
    composer: ResponseComposer,
    repository: Arc<dyn ReservationRepository>,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn AuditSink>,
    sessions: Mutex<HashMap<String, Arc<Mutex<SessionSlot>>>>,
    history_window: usize,
    idle_timeout: Duration,
}

impl ConversationEngine {
    pub fn new(
        machine: DialogueMachine,
        composer: ResponseComposer,
        repository: Arc<dyn ReservationRepository>,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            machine,
            composer,
            repository,
            clock,
            audit,
            sessions: Mutex::new(HashMap::new()),
            history_window: DEFAULT_HISTORY_WINDOW,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// Wires the dialogue machine and composer from configuration.
    pub fn from_config(
        config: &AppConfig,
        repository: Arc<dyn ReservationRepository>,
        llm: Option<Arc<dyn LlmClient>>,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, ApplicationError> {
        let knowledge = Arc::new(config.knowledge());
        let machine = DialogueMachine::new(
            knowledge.clone(),
            FieldExtractor::new(TemporalResolver::new(config.temporal_settings())),
            ReservationValidator::new(config.reservation_rules()),
        );
        let composer =
            ResponseComposer::new(knowledge, llm, Duration::from_secs(config.llm.timeout_secs))
                .map_err(|error| ApplicationError::Configuration(error.to_string()))?;

        Ok(Self::new(machine, composer, repository, clock, audit)
            .with_history_window(config.dialogue.history_window)
            .with_idle_timeout(Duration::from_secs(config.dialogue.idle_timeout_secs)))
    }

    pub fn with_history_window(mut self, history_window: usize) -> Self {
        self.history_window = history_window;
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn has_llm(&self) -> bool {
        self.composer.has_llm()
    }

    /// Handles one utterance and returns exactly one reply. Sessions are
    /// created on first contact and discarded after a farewell.
    pub async fn handle_turn(&self, session_id: &str, utterance: &str) -> String {
        let now = self.clock.now();
        let slot_handle = self.session_slot(session_id, now).await;
        let mut slot = slot_handle.lock().await;

        if slot.session.is_closed() {
            // Lost a race with the farewell that closed this session.
            *slot = SessionSlot::new(session_id, now);
            self.sessions
                .lock()
                .await
                .insert(session_id.to_string(), slot_handle.clone());
        }
        slot.session.touch(now);

        let correlation_id = Uuid::new_v4().to_string();
        let context = AuditContext::new(Some(session_id.to_string()), correlation_id.as_str(), ACTOR);
        let audit = TurnAudit { sink: self.audit.as_ref(), context: &context };
        self.audit.emit(
            context
                .event("conversation.turn_received", AuditCategory::Ingress, AuditOutcome::Success)
                .with_metadata("state", format!("{:?}", slot.session.state)),
        );

        let plan = self.machine.step(&mut slot.session, utterance, now, &audit);
        let mut reply = plan.reply;

        if let Some(name) = plan.introduced_name.as_deref() {
            slot.returning = self.is_returning(name, &context).await;
        }
        if slot.returning {
            reply.mark_returning();
        }

        let mut returning = slot.returning;
        if let Some(reservation) = plan.persist {
            returning = self.is_returning(&reservation.name, &context).await;
            reply = self.persist(&mut slot.session, reservation, now.date(), &audit).await;
        }

        let history = slot.session.recent_history(self.history_window).to_vec();
        let customer_name = slot.session.known_name.clone();
        let text = self
            .composer
            .compose(
                ComposeRequest {
                    reply: &reply,
                    utterance,
                    history: &history,
                    customer_name: customer_name.as_deref(),
                    returning,
                },
                &audit,
            )
            .await;

        slot.session.record(Speaker::Customer, utterance);
        slot.session.record(Speaker::Assistant, text.as_str());

        info!(
            event_name = "conversation.turn_completed",
            session_id,
            correlation_id = %correlation_id,
            intent = plan.intent.intent.as_str(),
            reply_kind = reply.kind(),
            state = ?slot.session.state,
            "turn handled"
        );

        if slot.session.is_closed() {
            self.sessions.lock().await.remove(session_id);
            self.audit.emit(context.event(
                "conversation.session_closed",
                AuditCategory::System,
                AuditOutcome::Success,
            ));
        }

        text
    }

    /// Drops a session without a farewell. Returns whether it existed.
    pub async fn end_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.lock().await.remove(session_id).is_some();
        if removed {
            info!(event_name = "conversation.session_ended", session_id, "session ended");
        }
        removed
    }

    /// Drops sessions idle longer than the configured timeout. Sessions in
    /// the middle of a turn are left alone.
    pub async fn evict_idle_sessions(&self) -> usize {
        let now = self.clock.now();
        let timeout = chrono::Duration::from_std(self.idle_timeout)
            .unwrap_or_else(|_| chrono::Duration::days(365 * 100));

        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, slot| match slot.try_lock() {
            Ok(slot) => !slot.session.is_idle(now, timeout),
            Err(_) => true,
        });
        let evicted = before - sessions.len();

        if evicted > 0 {
            info!(
                event_name = "conversation.sessions_evicted",
                evicted,
                remaining = sessions.len(),
                "idle sessions evicted"
            );
        }
        evicted
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Current dialogue state of a live session.
    pub async fn session_state(&self, session_id: &str) -> Option<DialogueState> {
        let slot = self.sessions.lock().await.get(session_id).cloned()?;
        let slot = slot.lock().await;
        Some(slot.session.state)
    }

    async fn session_slot(
        &self,
        session_id: &str,
        now: chrono::NaiveDateTime,
    ) -> Arc<Mutex<SessionSlot>> {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                info!(event_name = "conversation.session_started", session_id, "session started");
                Arc::new(Mutex::new(SessionSlot::new(session_id, now)))
            })
            .clone()
    }

    /// Lookup failures only cost the personal touch, never the turn.
    async fn is_returning(&self, name: &str, context: &AuditContext) -> bool {
        match self.repository.find_by_name(name).await {
            Ok(history) => history.is_some_and(|history| history.is_returning()),
            Err(error) => {
                warn!(
                    event_name = "customer.lookup_failed",
                    correlation_id = %context.correlation_id,
                    error = %error,
                    "customer lookup failed"
                );
                false
            }
        }
    }

    async fn persist(
        &self,
        session: &mut Session,
        reservation: Reservation,
        reference: chrono::NaiveDate,
        audit: &TurnAudit<'_>,
    ) -> Reply {
        match self.repository.save(reservation.clone()).await {
            Ok(id) => {
                self.audit.emit(
                    audit
                        .context
                        .event("reservation.saved", AuditCategory::Persistence, AuditOutcome::Success)
                        .with_metadata("reservation_id", id.0.as_str())
                        .with_metadata("date", reservation.date.to_string())
                        .with_metadata("time", reservation.time.format("%H:%M").to_string())
                        .with_metadata("party_size", reservation.party_size.to_string()),
                );
                info!(
                    event_name = "reservation.saved",
                    correlation_id = %audit.context.correlation_id,
                    reservation_id = %id,
                    "reservation saved"
                );
                self.machine.reservation_saved(session, &reservation)
            }
            Err(RepositoryError::SlotFull { date, time }) => {
                self.audit.emit(
                    audit
                        .context
                        .event(
                            "reservation.slot_full",
                            AuditCategory::Persistence,
                            AuditOutcome::Rejected,
                        )
                        .with_metadata("date", date.to_string())
                        .with_metadata("time", time.format("%H:%M").to_string()),
                );
                self.machine.slot_unavailable(session, &reservation, audit)
            }
            Err(other) => {
                error!(
                    event_name = "reservation.save_failed",
                    correlation_id = %audit.context.correlation_id,
                    error = %other,
                    "reservation could not be saved"
                );
                self.audit.emit(
                    audit
                        .context
                        .event(
                            "reservation.save_failed",
                            AuditCategory::Persistence,
                            AuditOutcome::Failed,
                        )
                        .with_metadata("error", other.to_string()),
                );
                self.machine.reservation_failed(session, &reservation, reference, audit)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{NaiveDate, NaiveDateTime};

    use goodtable_core::audit::InMemoryAuditSink;
    use goodtable_core::clock::FixedClock;
    use goodtable_core::config::AppConfig;
    use goodtable_core::dialogue::DialogueState;
    use goodtable_db::InMemoryReservationRepository;

    use super::ConversationEngine;

    fn monday_noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, 5)
            .and_then(|date| date.and_hms_opt(12, 0, 0))
            .expect("valid timestamp")
    }

    fn engine(now: NaiveDateTime) -> ConversationEngine {
        ConversationEngine::from_config(
            &AppConfig::default(),
            Arc::new(InMemoryReservationRepository::default()),
            None,
            Arc::new(FixedClock(now)),
            Arc::new(InMemoryAuditSink::default()),
        )
        .expect("engine")
    }

    #[tokio::test]
    async fn sessions_are_created_on_first_turn_and_closed_by_farewell() {
        let engine = engine(monday_noon());

        engine.handle_turn("s-1", "hello").await;
        assert_eq!(engine.session_count().await, 1);
        assert_eq!(engine.session_state("s-1").await, Some(DialogueState::Idle));

        let reply = engine.handle_turn("s-1", "goodbye").await;
        assert!(reply.contains("See you soon"));
        assert_eq!(engine.session_count().await, 0);
    }

    #[tokio::test]
    async fn sessions_do_not_share_drafts() {
        let engine = engine(monday_noon());

        engine.handle_turn("a", "I'd like to book a table for Saturday").await;
        engine.handle_turn("b", "hello").await;

        assert_eq!(engine.session_state("a").await, Some(DialogueState::CollectingTime));
        assert_eq!(engine.session_state("b").await, Some(DialogueState::Idle));
    }

    #[tokio::test]
    async fn end_session_reports_whether_it_existed() {
        let engine = engine(monday_noon());
        engine.handle_turn("s-1", "hello").await;

        assert!(engine.end_session("s-1").await);
        assert!(!engine.end_session("s-1").await);
    }

    #[tokio::test]
    async fn idle_sessions_are_evicted_after_the_timeout() {
        let engine = engine(monday_noon()).with_idle_timeout(Duration::ZERO);
        engine.handle_turn("s-1", "hello").await;

        // Last activity equals the fixed clock, so a zero timeout is not yet exceeded.
        assert_eq!(engine.evict_idle_sessions().await, 0);

        let later = ConversationEngine {
            clock: Arc::new(FixedClock(monday_noon() + chrono::Duration::minutes(1))),
            ..engine
        };
        assert_eq!(later.evict_idle_sessions().await, 1);
        assert_eq!(later.session_count().await, 0);
    }
}
