//! Per-turn orchestration: classify, extract, validate, transition, and decide
//! the reply.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::audit::{AuditCategory, AuditContext, AuditOutcome, AuditSink};
use crate::clock::local_to_utc;
use crate::dialogue::engine::apply_with_audit;
use crate::dialogue::reply::{Courtesy, PartOfDay, Reply};
use crate::dialogue::states::{DialogueAction, DialogueContext, DialogueEvent, DialogueState};
use crate::domain::reservation::{Reservation, ReservationDraft, DEFAULT_GUEST_NAME};
use crate::extraction::{FieldExtractor, ScanContext};
use crate::intent::{ClassificationContext, Intent, IntentClassifier, IntentResult};
use crate::knowledge::RestaurantKnowledge;
use crate::session::Session;
use crate::text::Utterance;
use crate::validation::{ReservationValidator, ValidationFailure, ValidationOutcome};

/// Result of one customer turn before persistence and phrasing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnPlan {
    pub intent: IntentResult,
    pub reply: Reply,
    /// A confirmed reservation the caller must hand to the repository, then
    /// report back through `reservation_saved` or `slot_unavailable`.
    pub persist: Option<Reservation>,
    /// A name the customer introduced this turn, for returning-customer
    /// lookup.
    pub introduced_name: Option<String>,
}

/// Audit plumbing for a single turn.
pub struct TurnAudit<'a> {
    pub sink: &'a dyn AuditSink,
    pub context: &'a AuditContext,
}

#[derive(Clone)]
pub struct DialogueMachine {
    classifier: IntentClassifier,
    extractor: FieldExtractor,
    validator: ReservationValidator,
    knowledge: Arc<RestaurantKnowledge>,
}

impl DialogueMachine {
    pub fn new(
        knowledge: Arc<RestaurantKnowledge>,
        extractor: FieldExtractor,
        validator: ReservationValidator,
    ) -> Self {
        Self { classifier: IntentClassifier, extractor, validator, knowledge }
    }

    pub fn knowledge(&self) -> &RestaurantKnowledge {
        &self.knowledge
    }

    pub fn step(
        &self,
        session: &mut Session,
        utterance: &str,
        now: NaiveDateTime,
        audit: &TurnAudit<'_>,
    ) -> TurnPlan {
        let utterance = Utterance::new(utterance);
        let reference = now.date();
        let context = ClassificationContext {
            collecting: session.state.is_collecting(),
            awaiting_confirmation: session.state == DialogueState::AwaitingConfirmation,
        };
        let intent = self.classifier.classify(&utterance, &context);
        session.last_intent = Some(intent.intent);

        let introduced_name = intent
            .name
            .clone()
            .filter(|name| session.known_name.as_deref() != Some(name.as_str()));
        if let Some(name) = &intent.name {
            session.known_name = Some(name.clone());
        }

        let mut persist = None;
        let reply = match intent.intent {
            Intent::Farewell => self.farewell(session, audit),
            Intent::Greeting | Intent::Thanks | Intent::NameIntroduction
                if self.carries_booking_fields(session, &utterance, reference) =>
            {
                let courtesy = match intent.intent {
                    Intent::Greeting => {
                        Some(Courtesy::Greeting { part_of_day: PartOfDay::at(now.time()) })
                    }
                    Intent::Thanks => Some(Courtesy::Thanks),
                    _ => session
                        .known_name
                        .clone()
                        .map(|name| Courtesy::Name { name, returning: false }),
                };
                let reply = self.collect(session, &utterance, &intent, reference, audit);
                match courtesy {
                    Some(courtesy) => Reply::Prefaced { courtesy, reply: Box::new(reply) },
                    None => reply,
                }
            }
            Intent::Greeting => Reply::Greet {
                name: session.known_name.clone(),
                returning: false,
                part_of_day: PartOfDay::at(now.time()),
                pending: session.pending_question(),
            },
            Intent::NameIntroduction => match session.known_name.clone() {
                Some(name) => Reply::AcknowledgeName {
                    name,
                    returning: false,
                    pending: session.pending_question(),
                },
                None => Reply::Clarify { pending: session.pending_question() },
            },
            Intent::Faq(topic) => Reply::AnswerFaq {
                topic,
                answer: self.knowledge.faq_answer(topic, reference.weekday()),
                pending: session.pending_question(),
            },
            Intent::Thanks => Reply::Thanks { pending: session.pending_question() },
            Intent::Unknown => Reply::Clarify { pending: session.pending_question() },
            Intent::ReservationRequest | Intent::ReservationContinuation => {
                self.collect(session, &utterance, &intent, reference, audit)
            }
            Intent::Affirm => {
                let before = session.draft.clone().unwrap_or_default();
                if self.corrects_draft(&utterance, &before, reference) {
                    self.collect(session, &utterance, &intent, reference, audit)
                } else {
                    let (reply, reservation) = self.confirm(session, now, audit);
                    persist = reservation;
                    reply
                }
            }
            Intent::Decline => self.decline(session, &utterance, &intent, reference, audit),
        };

        TurnPlan { intent, reply, persist, introduced_name }
    }

    /// The repository accepted the reservation.
    pub fn reservation_saved(&self, session: &mut Session, reservation: &Reservation) -> Reply {
        if session.known_name.is_none() && reservation.name != DEFAULT_GUEST_NAME {
            session.known_name = Some(reservation.name.clone());
        }
        Reply::BookingConfirmed { reservation: reservation.clone() }
    }

    /// The slot filled up before the reservation could be stored: keep the
    /// rest of the booking and ask for another time.
    pub fn slot_unavailable(
        &self,
        session: &mut Session,
        reservation: &Reservation,
        audit: &TurnAudit<'_>,
    ) -> Reply {
        let draft = ReservationDraft {
            date: Some(reservation.date),
            time: None,
            party_size: Some(reservation.party_size),
            name: (reservation.name != DEFAULT_GUEST_NAME).then(|| reservation.name.clone()),
        };
        let context =
            DialogueContext { missing_fields: draft.missing_fields(), rejected_field: None };

        match apply_with_audit(
            session.state,
            DialogueEvent::SlotUnavailable,
            &context,
            audit.sink,
            audit.context,
        ) {
            Ok(outcome) => {
                session.state = outcome.to;
                session.draft = Some(draft);
                Reply::SlotUnavailable { date: reservation.date, time: reservation.time }
            }
            Err(error) => contract_violation(session, &error.to_string()),
        }
    }

    /// Storage failed for a reason other than capacity. The confirmed draft
    /// goes back to the session so a later "yes" retries the save.
    pub fn reservation_failed(
        &self,
        session: &mut Session,
        reservation: &Reservation,
        reference: NaiveDate,
        audit: &TurnAudit<'_>,
    ) -> Reply {
        let draft = ReservationDraft {
            date: Some(reservation.date),
            time: Some(reservation.time),
            party_size: Some(reservation.party_size),
            name: (reservation.name != DEFAULT_GUEST_NAME).then(|| reservation.name.clone()),
        };

        match self.apply_draft(session, draft, reference, audit) {
            Reply::ConfirmDraft { draft, name } => Reply::SaveFailed { draft, name },
            other => other,
        }
    }

    fn collect(
        &self,
        session: &mut Session,
        utterance: &Utterance,
        intent: &IntentResult,
        reference: NaiveDate,
        audit: &TurnAudit<'_>,
    ) -> Reply {
        let awaiting = session.state == DialogueState::AwaitingConfirmation;
        let before = session.draft.clone().unwrap_or_default();
        let scan = ScanContext::new(reference)
            .with_focus(session.state.focus())
            .with_name_span(intent.name.clone());

        let draft = if awaiting {
            self.extractor.correct(utterance, &before, &scan)
        } else {
            self.extractor.extract(utterance, &before, &scan)
        };

        if awaiting && draft.changed_since(&before).is_empty() {
            session.draft = Some(draft.clone());
            return Reply::ConfirmDraft { name: self.booking_name(session, &draft), draft };
        }

        self.apply_draft(session, draft, reference, audit)
    }

    /// Validates `draft`, clears a rejected field, stores the draft, and moves
    /// to the state for whatever is still needed.
    fn apply_draft(
        &self,
        session: &mut Session,
        mut draft: ReservationDraft,
        reference: NaiveDate,
        audit: &TurnAudit<'_>,
    ) -> Reply {
        let rejected = match self.validator.validate(
            &draft,
            &self.knowledge.opening_hours,
            reference,
        ) {
            ValidationOutcome::Valid => None,
            ValidationOutcome::Invalid(failure) => {
                draft.clear(failure.field());
                audit.sink.emit(
                    audit
                        .context
                        .event("validation.failed", AuditCategory::Validation, AuditOutcome::Rejected)
                        .with_metadata("reason", failure.code())
                        .with_metadata("field", failure.field().label()),
                );
                Some(failure)
            }
        };

        let context = DialogueContext {
            missing_fields: draft.missing_fields(),
            rejected_field: rejected.as_ref().map(ValidationFailure::field),
        };
        session.draft = Some(draft.clone());

        let outcome = match apply_with_audit(
            session.state,
            DialogueEvent::DraftUpdated,
            &context,
            audit.sink,
            audit.context,
        ) {
            Ok(outcome) => outcome,
            Err(error) => return contract_violation(session, &error.to_string()),
        };
        session.state = outcome.to;

        match (outcome.actions.first(), rejected) {
            (Some(DialogueAction::RequestReplacement(_)), Some(failure)) => {
                Reply::RejectField { failure, draft }
            }
            (Some(DialogueAction::PromptForField(field)), _) => {
                Reply::AskForField { field: *field, draft }
            }
            _ => Reply::ConfirmDraft { name: self.booking_name(session, &draft), draft },
        }
    }

    fn confirm(
        &self,
        session: &mut Session,
        now: NaiveDateTime,
        audit: &TurnAudit<'_>,
    ) -> (Reply, Option<Reservation>) {
        let reference = now.date();
        let Some(draft) = session.draft.clone() else {
            return (contract_violation(session, "confirmation requested without a draft"), None);
        };

        // The draft was valid when shown, but the date may have passed since.
        if let ValidationOutcome::Invalid(_) =
            self.validator.validate(&draft, &self.knowledge.opening_hours, reference)
        {
            return (self.apply_draft(session, draft, reference, audit), None);
        }

        let context = DialogueContext { missing_fields: draft.missing_fields(), rejected_field: None };
        let outcome = match apply_with_audit(
            session.state,
            DialogueEvent::DraftConfirmed,
            &context,
            audit.sink,
            audit.context,
        ) {
            Ok(outcome) => outcome,
            Err(error) => return (contract_violation(session, &error.to_string()), None),
        };

        match Reservation::from_draft(&draft, session.known_name.as_deref(), local_to_utc(now)) {
            Ok(reservation) => {
                session.state = outcome.to;
                session.draft = None;
                (Reply::BookingConfirmed { reservation: reservation.clone() }, Some(reservation))
            }
            Err(error) => (contract_violation(session, &error.to_string()), None),
        }
    }

    fn decline(
        &self,
        session: &mut Session,
        utterance: &Utterance,
        intent: &IntentResult,
        reference: NaiveDate,
        audit: &TurnAudit<'_>,
    ) -> Reply {
        let before = session.draft.clone().unwrap_or_default();
        if self.corrects_draft(utterance, &before, reference) {
            return self.collect(session, utterance, intent, reference, audit);
        }

        match apply_with_audit(
            session.state,
            DialogueEvent::DraftDeclined,
            &DialogueContext::default(),
            audit.sink,
            audit.context,
        ) {
            Ok(outcome) => {
                session.state = outcome.to;
                session.draft = Some(ReservationDraft { name: before.name, ..Default::default() });
                Reply::RestartCollection
            }
            Err(error) => contract_violation(session, &error.to_string()),
        }
    }

    fn farewell(&self, session: &mut Session, audit: &TurnAudit<'_>) -> Reply {
        if let Ok(outcome) = apply_with_audit(
            session.state,
            DialogueEvent::FarewellReceived,
            &DialogueContext::default(),
            audit.sink,
            audit.context,
        ) {
            session.state = outcome.to;
        }
        session.draft = None;
        Reply::Farewell { name: session.known_name.clone() }
    }

    /// The utterance names a date, time, or party size that differs from
    /// `draft`.
    fn corrects_draft(
        &self,
        utterance: &Utterance,
        draft: &ReservationDraft,
        reference: NaiveDate,
    ) -> bool {
        let found = self.extractor.scan(utterance, &ScanContext::new(reference));
        (found.date.is_some() && found.date != draft.date)
            || (found.time.is_some() && found.time != draft.time)
            || (found.party_size.is_some() && found.party_size != draft.party_size)
    }

    /// Greetings, thanks, and introductions still feed the booking when they
    /// carry a date, time, or party size.
    fn carries_booking_fields(
        &self,
        session: &Session,
        utterance: &Utterance,
        reference: NaiveDate,
    ) -> bool {
        let scan = ScanContext::new(reference).with_focus(session.state.focus());
        !self.extractor.scan(utterance, &scan).is_empty()
    }

    fn booking_name(&self, session: &Session, draft: &ReservationDraft) -> Option<String> {
        draft.name.clone().or_else(|| session.known_name.clone())
    }
}

/// Malformed session state. Loud in debug builds; in release the customer is
/// asked to rephrase and the session keeps going.
fn contract_violation(session: &Session, detail: &str) -> Reply {
    debug_assert!(false, "malformed dialogue state in session {}: {detail}", session.id);
    Reply::Clarify { pending: session.pending_question() }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

    use super::{DialogueMachine, TurnAudit, TurnPlan};
    use crate::audit::{AuditContext, InMemoryAuditSink};
    use crate::clock::local_to_utc;
    use crate::dialogue::reply::{Courtesy, PartOfDay, Reply};
    use crate::dialogue::states::{DialogueState, PendingQuestion};
    use crate::domain::reservation::{DraftField, ReservationDraft};
    use crate::extraction::FieldExtractor;
    use crate::intent::Intent;
    use crate::knowledge::{FaqTopic, RestaurantKnowledge};
    use crate::session::Session;
    use crate::validation::{ReservationValidator, ValidationFailure};

    struct Harness {
        machine: DialogueMachine,
        session: Session,
        sink: InMemoryAuditSink,
        context: AuditContext,
        now: NaiveDateTime,
    }

    impl Harness {
        // Monday 2025-05-05, 12:00
        fn new() -> Self {
            let now = NaiveDate::from_ymd_opt(2025, 5, 5)
                .and_then(|date| date.and_hms_opt(12, 0, 0))
                .expect("valid timestamp");
            Self {
                machine: DialogueMachine::new(
                    Arc::new(RestaurantKnowledge::default()),
                    FieldExtractor::default(),
                    ReservationValidator::default(),
                ),
                session: Session::new("session-1", now),
                sink: InMemoryAuditSink::default(),
                context: AuditContext::new(Some("session-1".to_owned()), "turn", "test"),
                now,
            }
        }

        fn say(&mut self, text: &str) -> TurnPlan {
            let audit = TurnAudit { sink: &self.sink, context: &self.context };
            self.machine.step(&mut self.session, text, self.now, &audit)
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
    }

    #[test]
    fn reservation_collects_fields_and_confirms() {
        let mut harness = Harness::new();

        let plan = harness.say("Hi, my name is Maria");
        assert_eq!(plan.intent.intent, Intent::NameIntroduction);
        assert_eq!(plan.introduced_name.as_deref(), Some("Maria"));
        assert_eq!(harness.session.state, DialogueState::Idle);

        let plan = harness.say("I'd like to book a table for Saturday");
        assert!(matches!(plan.reply, Reply::AskForField { field: DraftField::Time, .. }));
        assert_eq!(harness.session.state, DialogueState::CollectingTime);

        let plan = harness.say("Around 8pm for 4 people");
        assert!(plan.intent.biased);
        assert!(
            matches!(plan.reply, Reply::ConfirmDraft { ref name, .. } if name.as_deref() == Some("Maria"))
        );
        assert_eq!(harness.session.state, DialogueState::AwaitingConfirmation);

        let plan = harness.say("yes");
        let reservation = plan.persist.expect("reservation handed over for storage");
        assert_eq!(reservation.date, date(2025, 5, 10));
        assert_eq!(reservation.time, time(20, 0));
        assert_eq!(reservation.party_size, 4);
        assert_eq!(reservation.name, "Maria");
        assert_eq!(harness.session.state, DialogueState::Idle);
        assert_eq!(harness.session.draft, None);
    }

    #[test]
    fn faq_mid_collection_keeps_the_draft() {
        let mut harness = Harness::new();
        harness.say("I want to book a table for Saturday");
        let draft_before = harness.session.draft.clone();

        let plan = harness.say("What's on the menu?");
        assert!(matches!(
            plan.reply,
            Reply::AnswerFaq {
                topic: FaqTopic::Menu,
                pending: Some(PendingQuestion::Field(DraftField::Time)),
                ..
            }
        ));
        assert_eq!(harness.session.draft, draft_before);
        assert_eq!(harness.session.state, DialogueState::CollectingTime);

        harness.say("at 8pm");
        assert_eq!(harness.session.state, DialogueState::CollectingPartySize);
    }

    #[test]
    fn invalid_field_is_cleared_and_asked_again() {
        let mut harness = Harness::new();
        let plan = harness.say("Book a table for Tuesday");

        assert!(matches!(
            plan.reply,
            Reply::RejectField { failure: ValidationFailure::ClosedDay { .. }, .. }
        ));
        assert_eq!(harness.session.state, DialogueState::CollectingDate);
        assert_eq!(harness.session.draft.as_ref().and_then(|draft| draft.date), None);
        assert_eq!(harness.sink.event_types().first().map(String::as_str), Some("validation.failed"));
    }

    #[test]
    fn never_awaits_confirmation_with_an_invalid_draft() {
        let mut harness = Harness::new();
        harness.say("book Saturday at 8pm for 40 people");

        assert_eq!(harness.session.state, DialogueState::CollectingPartySize);
        let draft = harness.session.draft.clone().expect("draft kept");
        assert_eq!(draft.party_size, None);
        assert_eq!(draft.time, Some(time(20, 0)));
    }

    #[test]
    fn correction_at_confirmation_updates_the_draft() {
        let mut harness = Harness::new();
        harness.say("book Saturday at 8pm for 4 people");
        assert_eq!(harness.session.state, DialogueState::AwaitingConfirmation);

        let plan = harness.say("no, make it 6 people");
        assert!(matches!(plan.reply, Reply::ConfirmDraft { .. }));
        assert_eq!(harness.session.state, DialogueState::AwaitingConfirmation);
        assert_eq!(harness.session.draft.as_ref().and_then(|draft| draft.party_size), Some(6));
    }

    #[test]
    fn plain_decline_restarts_collection() {
        let mut harness = Harness::new();
        harness.say("book Saturday at 8pm for 4 people");

        let plan = harness.say("no");
        assert_eq!(plan.reply, Reply::RestartCollection);
        assert_eq!(harness.session.state, DialogueState::CollectingDate);
        assert!(harness.session.draft.as_ref().is_some_and(ReservationDraft::is_empty));
    }

    #[test]
    fn slot_unavailable_returns_to_time_collection() {
        let mut harness = Harness::new();
        harness.say("book Saturday at 8pm for 4 people");
        let reservation = harness.say("yes").persist.expect("reservation");

        let audit = TurnAudit { sink: &harness.sink, context: &harness.context };
        let reply = harness.machine.slot_unavailable(&mut harness.session, &reservation, &audit);

        assert_eq!(reply, Reply::SlotUnavailable { date: date(2025, 5, 10), time: time(20, 0) });
        assert_eq!(harness.session.state, DialogueState::CollectingTime);
        let draft = harness.session.draft.clone().expect("draft restored");
        assert_eq!(draft.party_size, Some(4));
        assert_eq!(draft.time, None);
    }

    #[test]
    fn failed_save_restores_the_confirmation() {
        let mut harness = Harness::new();
        harness.say("I'm Maria");
        harness.say("book Saturday at 8pm for 4 people");
        let reservation = harness.say("yes").persist.expect("reservation");
        assert_eq!(harness.session.state, DialogueState::Idle);

        let audit = TurnAudit { sink: &harness.sink, context: &harness.context };
        let reply = harness.machine.reservation_failed(
            &mut harness.session,
            &reservation,
            harness.now.date(),
            &audit,
        );

        assert!(matches!(reply, Reply::SaveFailed { ref name, .. } if name.as_deref() == Some("Maria")));
        assert_eq!(harness.session.state, DialogueState::AwaitingConfirmation);
        assert!(harness.say("yes").persist.is_some());
    }

    #[test]
    fn farewell_closes_the_session() {
        let mut harness = Harness::new();
        harness.say("I'm Maria");
        harness.say("book for Saturday");

        let plan = harness.say("bye");
        assert_eq!(plan.reply, Reply::Farewell { name: Some("Maria".to_string()) });
        assert!(harness.session.is_closed());
        assert_eq!(harness.session.draft, None);
    }

    #[test]
    fn greeting_uses_the_time_of_day() {
        let mut harness = Harness::new();
        let plan = harness.say("hello");
        assert!(matches!(
            plan.reply,
            Reply::Greet { part_of_day: super::PartOfDay::Afternoon, name: None, .. }
        ));
    }

    #[test]
    fn thanks_with_booking_details_keeps_the_fields() {
        let mut harness = Harness::new();
        harness.say("I'd like to book a table for Saturday");

        let plan = harness.say("Around 8pm for 4 people, thanks");
        assert_eq!(plan.intent.intent, Intent::Thanks);
        let Reply::Prefaced { courtesy, reply } = plan.reply else {
            panic!("expected a prefaced reply, got {:?}", plan.reply);
        };
        assert_eq!(courtesy, Courtesy::Thanks);
        assert!(matches!(*reply, Reply::ConfirmDraft { .. }));
        assert_eq!(harness.session.state, DialogueState::AwaitingConfirmation);
        let draft = harness.session.draft.clone().expect("draft kept");
        assert_eq!(draft.time, Some(time(20, 0)));
        assert_eq!(draft.party_size, Some(4));
    }

    #[test]
    fn greeting_with_a_time_fills_the_draft() {
        let mut harness = Harness::new();
        harness.say("I'd like to book a table for Saturday");

        let plan = harness.say("Hi again, 8pm please");
        assert_eq!(plan.intent.intent, Intent::Greeting);
        assert!(matches!(
            plan.reply,
            Reply::Prefaced {
                courtesy: Courtesy::Greeting { part_of_day: PartOfDay::Afternoon },
                ..
            }
        ));
        assert_eq!(plan.reply.kind(), "ask_for_field");
        assert_eq!(harness.session.state, DialogueState::CollectingPartySize);
        assert_eq!(harness.session.draft.as_ref().and_then(|draft| draft.time), Some(time(20, 0)));
    }

    #[test]
    fn name_introduction_with_booking_details_opens_a_draft() {
        let mut harness = Harness::new();

        let plan = harness.say("I'm Maria, Saturday at 8pm for 4 people");
        assert_eq!(plan.intent.intent, Intent::NameIntroduction);
        assert_eq!(plan.introduced_name.as_deref(), Some("Maria"));
        let Reply::Prefaced { courtesy, reply } = plan.reply else {
            panic!("expected a prefaced reply, got {:?}", plan.reply);
        };
        assert_eq!(courtesy, Courtesy::Name { name: "Maria".to_string(), returning: false });
        assert!(matches!(*reply, Reply::ConfirmDraft { ref name, .. } if name.as_deref() == Some("Maria")));
        assert_eq!(harness.session.state, DialogueState::AwaitingConfirmation);
        let draft = harness.session.draft.clone().expect("draft opened");
        assert_eq!(draft.date, Some(date(2025, 5, 10)));
        assert_eq!(draft.time, Some(time(20, 0)));
        assert_eq!(draft.party_size, Some(4));
    }

    #[test]
    fn plain_thanks_does_not_open_a_draft() {
        let mut harness = Harness::new();
        let plan = harness.say("thanks");
        assert_eq!(plan.reply, Reply::Thanks { pending: None });
        assert_eq!(harness.session.state, DialogueState::Idle);
        assert_eq!(harness.session.draft, None);
    }

    #[test]
    fn affirm_with_a_correction_reconfirms_instead_of_saving() {
        let mut harness = Harness::new();
        harness.say("book Saturday at 8pm for 4 people");

        let plan = harness.say("yes, but make it 6 people");
        assert_eq!(plan.intent.intent, Intent::Affirm);
        assert_eq!(plan.persist, None);
        assert!(matches!(plan.reply, Reply::ConfirmDraft { ref draft, .. } if draft.party_size == Some(6)));
        assert_eq!(harness.session.state, DialogueState::AwaitingConfirmation);

        let reservation = harness.say("yes").persist.expect("reservation");
        assert_eq!(reservation.party_size, 6);
    }

    #[test]
    fn affirm_repeating_the_draft_still_saves() {
        let mut harness = Harness::new();
        harness.say("book Saturday at 8pm for 4 people");

        let reservation = harness.say("yes, 8pm for 4 is right").persist.expect("reservation");
        assert_eq!(reservation.party_size, 4);
    }

    #[test]
    fn reservation_is_stamped_with_the_turn_clock() {
        let mut harness = Harness::new();
        harness.say("book Saturday at 8pm for 4 people");

        let reservation = harness.say("yes").persist.expect("reservation");
        assert_eq!(reservation.created_at, local_to_utc(harness.now));
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "malformed dialogue state")]
    fn confirmation_without_draft_is_a_contract_violation() {
        let mut harness = Harness::new();
        harness.session.state = DialogueState::AwaitingConfirmation;
        harness.say("yes");
    }
}
