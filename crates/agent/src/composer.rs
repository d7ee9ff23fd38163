//! Turns a [`Reply`] into text.
//!
//! Each reply kind has a deterministic `tera` template. When an AI backend is
//! configured, the rendered template becomes the content the model must
//! convey, and the model only rephrases it. Any backend failure, timeout, or
//! empty answer falls back to the template text.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use tera::{Context, Tera};
use thiserror::Error;
use tracing::{debug, warn};

use goodtable_core::audit::{AuditCategory, AuditOutcome};
use goodtable_core::dialogue::{Courtesy, PendingQuestion, Reply, TurnAudit};
use goodtable_core::domain::reservation::{DraftField, ReservationDraft, DEFAULT_GUEST_NAME};
use goodtable_core::knowledge::RestaurantKnowledge;
use goodtable_core::session::Turn;

use crate::llm::{CompletionError, CompletionRequest, LlmClient};

const SAFE_FALLBACK: &str = "Sorry, could you say that again?";

const TEMPLATES: &[(&str, &str)] = &[
    (
        "greet",
        "{{ greeting }}{% if name %}, {{ name }}{% endif %}! \
         {% if returning %}Welcome back to {{ restaurant }}.{% else %}Welcome to {{ restaurant }}.{% endif %} \
         {% if pending %}{{ pending }}{% else %}How can I help you today?{% endif %}",
    ),
    (
        "acknowledge_name",
        "{% if returning %}Great to see you again, {{ name }}!{% else %}Nice to meet you, {{ name }}!{% endif %} \
         {% if pending %}{{ pending }}{% else %}How can I help you?{% endif %}",
    ),
    (
        "courtesy",
        "{% if kind == \"greeting\" %}{{ greeting }}!\
         {% elif kind == \"thanks\" %}You're welcome!\
         {% elif returning %}Great to see you again, {{ name }}!\
         {% else %}Nice to meet you, {{ name }}!{% endif %}",
    ),
    ("answer_faq", "{{ answer }}{% if pending %} {{ pending }}{% endif %}"),
    (
        "ask_for_field",
        "{% if summary %}Got it: {{ summary }}.{% else %}Perfect! Let's make your reservation.{% endif %} {{ question }}",
    ),
    ("reject_field", "{{ reason }} {{ question }}"),
    (
        "confirm_draft",
        "Perfect. Please confirm your reservation:\n\
         - Date: {{ date }}\n\
         - Time: {{ time }}\n\
         - People: {{ party_size }}\n\
         - Name: {{ name }}\n\
         Is this information correct? (yes/no)",
    ),
    (
        "booking_confirmed",
        "Reservation confirmed, {{ name }}! \
         {% if returning %}Thank you for trusting us again. {% endif %}\
         We look forward to seeing you on {{ date }} at {{ time }}, a table for {{ party_size }}. \
         Your reservation number is {{ id }}. Can I help you with anything else?",
    ),
    (
        "slot_unavailable",
        "I'm sorry, we have no availability on {{ date }} at {{ time }}. \
         What other time would suit you?",
    ),
    (
        "save_failed",
        "I'm sorry, I couldn't save your reservation for {{ date }} at {{ time }} for {{ party_size }} \
         just now. Shall I try again? (yes/no)",
    ),
    ("restart_collection", "Alright, let's start over. What date would you like to reserve?"),
    (
        "thanks",
        "You're welcome!{% if pending %} {{ pending }}{% else %} Is there anything else I can help you with?{% endif %}",
    ),
    (
        "farewell",
        "{% if name %}Goodbye, {{ name }}! {% endif %}Thank you for contacting {{ restaurant }}. See you soon!",
    ),
    (
        "clarify",
        "{% if name %}{{ name }}, {% endif %}I'm not sure I understood. \
         {% if pending %}{{ pending }}{% else %}I can help you with a reservation or tell you about our menu, hours, and location.{% endif %}",
    ),
    (
        "system_prompt",
        "You are the virtual assistant of {{ restaurant }}.\n\n\
         {{ facts }}\n\n\
         Your role is to help customers with information and reservations. \
         Be friendly, helpful, and concise.\
         {% if customer %}\nYou're speaking with {{ customer }}{% if returning %}, a returning customer{% endif %}.{% endif %}\n\n\
         Reply to the customer's last message. Your reply must convey exactly the following, \
         without changing any date, time, number, name, or reservation number:\n\
         {{ content }}",
    ),
];

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("template error: {0}")]
    Template(String),
}

/// Everything about the turn the composer needs besides the reply itself.
#[derive(Clone, Copy, Debug)]
pub struct ComposeRequest<'a> {
    pub reply: &'a Reply,
    pub utterance: &'a str,
    /// Prior turns, oldest first, already trimmed to the history window.
    pub history: &'a [Turn],
    pub customer_name: Option<&'a str>,
    pub returning: bool,
}

pub struct ResponseComposer {
    templates: Tera,
    knowledge: Arc<RestaurantKnowledge>,
    llm: Option<Arc<dyn LlmClient>>,
    timeout: Duration,
}

impl ResponseComposer {
    pub fn new(
        knowledge: Arc<RestaurantKnowledge>,
        llm: Option<Arc<dyn LlmClient>>,
        timeout: Duration,
    ) -> Result<Self, ComposeError> {
        let mut templates = Tera::default();
        templates
            .add_raw_templates(TEMPLATES.iter().copied())
            .map_err(|error| ComposeError::Template(error.to_string()))?;
        Ok(Self { templates, knowledge, llm, timeout })
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    pub async fn compose(&self, request: ComposeRequest<'_>, audit: &TurnAudit<'_>) -> String {
        let fallback = self.fallback(&request);
        let Some(llm) = &self.llm else {
            return fallback;
        };

        match self.ask_llm(llm.as_ref(), &request, &fallback).await {
            Ok(text) => {
                debug!(
                    event_name = "composer.llm_reply",
                    correlation_id = %audit.context.correlation_id,
                    model = llm.model_name(),
                    reply_kind = request.reply.kind(),
                    "reply phrased by llm"
                );
                text
            }
            Err(error) => {
                warn!(
                    event_name = "composer.degraded_fallback",
                    correlation_id = %audit.context.correlation_id,
                    model = llm.model_name(),
                    reply_kind = request.reply.kind(),
                    error = %error,
                    "llm phrasing failed, using template reply"
                );
                audit.sink.emit(
                    audit
                        .context
                        .event(
                            "composer.degraded_fallback",
                            AuditCategory::Integration,
                            AuditOutcome::Degraded,
                        )
                        .with_metadata("reply_kind", request.reply.kind())
                        .with_metadata("error", error.to_string()),
                );
                fallback
            }
        }
    }

    /// The deterministic template rendering of `request.reply`.
    pub fn fallback(&self, request: &ComposeRequest<'_>) -> String {
        if let Reply::Prefaced { courtesy, reply } = request.reply {
            let opener = self.render("courtesy", &courtesy_context(courtesy));
            let rest = self.fallback(&ComposeRequest { reply: reply.as_ref(), ..*request });
            return format!("{opener} {rest}");
        }
        let (template, context) = self.reply_context(request);
        self.render(template, &context)
    }

    async fn ask_llm(
        &self,
        llm: &dyn LlmClient,
        request: &ComposeRequest<'_>,
        fallback: &str,
    ) -> Result<String, CompletionError> {
        let completion = CompletionRequest {
            system_prompt: self.system_prompt(request, fallback),
            history: request.history.to_vec(),
            user_utterance: request.utterance.to_string(),
            timeout: self.timeout,
        };

        match tokio::time::timeout(self.timeout, llm.complete(&completion)).await {
            Ok(result) => result,
            Err(_) => Err(CompletionError::Timeout(self.timeout)),
        }
    }

    fn system_prompt(&self, request: &ComposeRequest<'_>, fallback: &str) -> String {
        let mut context = Context::new();
        context.insert("restaurant", &self.knowledge.profile.name);
        context.insert("facts", &self.knowledge.fact_sheet());
        context.insert("customer", &request.customer_name);
        context.insert("returning", &request.returning);
        context.insert("content", fallback);
        self.render("system_prompt", &context)
    }

    fn render(&self, template: &str, context: &Context) -> String {
        match self.templates.render(template, context) {
            Ok(text) => text.trim().to_string(),
            Err(error) => {
                warn!(event_name = "composer.template_failed", template, error = %error);
                SAFE_FALLBACK.to_string()
            }
        }
    }

    fn reply_context(&self, request: &ComposeRequest<'_>) -> (&'static str, Context) {
        let mut context = Context::new();
        context.insert("restaurant", &self.knowledge.profile.name);

        let pending = |context: &mut Context, pending: &Option<PendingQuestion>| {
            context.insert("pending", &pending.map(pending_prompt));
        };

        match request.reply {
            Reply::Greet { name, returning, part_of_day, pending: question } => {
                context.insert("greeting", &format!("Good {}", part_of_day.as_str()));
                context.insert("name", name);
                context.insert("returning", returning);
                pending(&mut context, question);
            }
            Reply::AcknowledgeName { name, returning, pending: question } => {
                context.insert("name", name);
                context.insert("returning", returning);
                pending(&mut context, question);
            }
            Reply::AnswerFaq { answer, pending: question, .. } => {
                context.insert("answer", answer);
                pending(&mut context, question);
            }
            Reply::AskForField { field, draft } => {
                context.insert("summary", &draft_summary(draft));
                context.insert("question", field_question(*field));
            }
            Reply::RejectField { failure, .. } => {
                context.insert("reason", &failure.message());
                context.insert("question", field_question(failure.field()));
            }
            Reply::ConfirmDraft { draft, name } => {
                insert_draft(&mut context, draft);
                context.insert("name", name.as_deref().unwrap_or(DEFAULT_GUEST_NAME));
            }
            Reply::BookingConfirmed { reservation } => {
                context.insert("name", &reservation.name);
                context.insert("returning", &request.returning);
                context.insert("date", &format_date(reservation.date));
                context.insert("time", &format_time(reservation.time));
                context.insert("party_size", &reservation.party_size);
                context.insert("id", &reservation.id.0);
            }
            Reply::SlotUnavailable { date, time } => {
                context.insert("date", &format_date(*date));
                context.insert("time", &format_time(*time));
            }
            Reply::SaveFailed { draft, .. } => insert_draft(&mut context, draft),
            Reply::RestartCollection => {}
            Reply::Thanks { pending: question } => pending(&mut context, question),
            Reply::Farewell { name } => context.insert("name", name),
            Reply::Clarify { pending: question } => {
                context.insert("name", &request.customer_name);
                pending(&mut context, question);
            }
            Reply::Prefaced { reply, .. } => {
                return self.reply_context(&ComposeRequest { reply: reply.as_ref(), ..*request });
            }
        }

        (request.reply.kind(), context)
    }
}

fn courtesy_context(courtesy: &Courtesy) -> Context {
    let mut context = Context::new();
    match courtesy {
        Courtesy::Greeting { part_of_day } => {
            context.insert("kind", "greeting");
            context.insert("greeting", &format!("Good {}", part_of_day.as_str()));
        }
        Courtesy::Thanks => context.insert("kind", "thanks"),
        Courtesy::Name { name, returning } => {
            context.insert("kind", "name");
            context.insert("name", name);
            context.insert("returning", returning);
        }
    }
    context
}

fn insert_draft(context: &mut Context, draft: &ReservationDraft) {
    context.insert("date", &draft.date.map(format_date).unwrap_or_default());
    context.insert("time", &draft.time.map(format_time).unwrap_or_default());
    context.insert("party_size", &draft.party_size.unwrap_or_default());
}

fn format_date(date: NaiveDate) -> String {
    date.format("%A, %d %B %Y").to_string()
}

fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

fn field_question(field: DraftField) -> &'static str {
    match field {
        DraftField::Date => "What date would you like to reserve?",
        DraftField::Time => "What time would you like to reserve?",
        DraftField::PartySize => "How many people will be in your party?",
    }
}

fn pending_prompt(question: PendingQuestion) -> &'static str {
    match question {
        PendingQuestion::Field(field) => field_question(field),
        PendingQuestion::Confirmation => "Shall I confirm your reservation? (yes/no)",
    }
}

/// The fields collected so far, e.g. "Saturday, 10 May 2025 at 20:00".
fn draft_summary(draft: &ReservationDraft) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(date) = draft.date {
        parts.push(format_date(date));
    }
    if let Some(time) = draft.time {
        parts.push(format!("at {}", format_time(time)));
    }
    if let Some(party_size) = draft.party_size {
        let people = if party_size == 1 { "person" } else { "people" };
        parts.push(format!("for {party_size} {people}"));
    }
    (!parts.is_empty()).then(|| parts.join(" "))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveTime, Utc};

    use goodtable_core::audit::{AuditContext, InMemoryAuditSink};
    use goodtable_core::dialogue::{Courtesy, PartOfDay, PendingQuestion, Reply, TurnAudit};
    use goodtable_core::domain::reservation::{
        DraftField, Reservation, ReservationDraft, ReservationId,
    };
    use goodtable_core::knowledge::RestaurantKnowledge;
    use goodtable_core::validation::ValidationFailure;

    use super::{ComposeRequest, ResponseComposer};
    use crate::llm::{CompletionError, CompletionRequest, LlmClient};

    struct FailingLlm;

    #[async_trait]
    impl LlmClient for FailingLlm {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String, CompletionError> {
            Err(CompletionError::Status { status: 503, body: "overloaded".to_string() })
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    struct SlowLlm;

    #[async_trait]
    impl LlmClient for SlowLlm {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String, CompletionError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("too late".to_string())
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    struct EchoPromptLlm;

    #[async_trait]
    impl LlmClient for EchoPromptLlm {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
            Ok(format!("[{}] {}", request.user_utterance, request.system_prompt))
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    fn composer(llm: Option<Arc<dyn LlmClient>>) -> ResponseComposer {
        ResponseComposer::new(
            Arc::new(RestaurantKnowledge::default()),
            llm,
            Duration::from_millis(50),
        )
        .expect("templates compile")
    }

    fn request(reply: &Reply) -> ComposeRequest<'_> {
        ComposeRequest {
            reply,
            utterance: "hello",
            history: &[],
            customer_name: Some("Maria"),
            returning: false,
        }
    }

    fn saturday_draft() -> ReservationDraft {
        ReservationDraft {
            date: NaiveDate::from_ymd_opt(2025, 5, 10),
            time: NaiveTime::from_hms_opt(20, 0, 0),
            party_size: Some(4),
            name: Some("Maria".to_string()),
        }
    }

    #[test]
    fn greeting_uses_part_of_day_and_pending_question() {
        let reply = Reply::Greet {
            name: Some("Maria".to_string()),
            returning: true,
            part_of_day: PartOfDay::Evening,
            pending: Some(PendingQuestion::Field(DraftField::Time)),
        };
        let text = composer(None).fallback(&request(&reply));
        assert_eq!(
            text,
            "Good evening, Maria! Welcome back to The Good Table. What time would you like to reserve?"
        );
    }

    #[test]
    fn confirmation_lists_every_field() {
        let reply = Reply::ConfirmDraft { draft: saturday_draft(), name: Some("Maria".to_string()) };
        let text = composer(None).fallback(&request(&reply));
        assert!(text.contains("Saturday, 10 May 2025"));
        assert!(text.contains("20:00"));
        assert!(text.contains("People: 4"));
        assert!(text.contains("Name: Maria"));
        assert!(text.ends_with("(yes/no)"));
    }

    #[test]
    fn booking_confirmation_mentions_the_reservation_number() {
        let reply = Reply::BookingConfirmed {
            reservation: Reservation {
                id: ReservationId("RES-42".to_string()),
                date: NaiveDate::from_ymd_opt(2025, 5, 10).expect("valid date"),
                time: NaiveTime::from_hms_opt(20, 0, 0).expect("valid time"),
                party_size: 4,
                name: "Maria".to_string(),
                created_at: Utc::now(),
            },
        };
        let text = composer(None).fallback(&request(&reply));
        assert!(text.starts_with("Reservation confirmed, Maria!"));
        assert!(text.contains("Saturday, 10 May 2025"));
        assert!(text.contains("20:00"));
        assert!(text.contains("table for 4"));
        assert!(text.contains("RES-42"));
        assert!(!text.contains("trusting us again"));
    }

    #[test]
    fn prefaced_reply_opens_with_the_courtesy() {
        let composer = composer(None);
        let ask = Reply::AskForField {
            field: DraftField::PartySize,
            draft: ReservationDraft { party_size: None, ..saturday_draft() },
        };
        let inner = composer.fallback(&request(&ask));

        let thanks = Reply::Prefaced { courtesy: Courtesy::Thanks, reply: Box::new(ask.clone()) };
        assert_eq!(composer.fallback(&request(&thanks)), format!("You're welcome! {inner}"));

        let greeting = Reply::Prefaced {
            courtesy: Courtesy::Greeting { part_of_day: PartOfDay::Evening },
            reply: Box::new(ask.clone()),
        };
        assert_eq!(composer.fallback(&request(&greeting)), format!("Good evening! {inner}"));

        let name = Reply::Prefaced {
            courtesy: Courtesy::Name { name: "Maria".to_string(), returning: true },
            reply: Box::new(ask),
        };
        assert_eq!(
            composer.fallback(&request(&name)),
            format!("Great to see you again, Maria! {inner}")
        );
    }

    #[test]
    fn field_rejection_names_the_rule_and_asks_again() {
        let reply = Reply::RejectField {
            failure: ValidationFailure::ClosedDay { weekday: chrono::Weekday::Tue },
            draft: ReservationDraft::default(),
        };
        let text = composer(None).fallback(&request(&reply));
        assert_eq!(text, "We're closed on Tuesdays. What date would you like to reserve?");
    }

    #[test]
    fn first_question_introduces_the_booking() {
        let reply =
            Reply::AskForField { field: DraftField::Date, draft: ReservationDraft::default() };
        let text = composer(None).fallback(&request(&reply));
        assert_eq!(
            text,
            "Perfect! Let's make your reservation. What date would you like to reserve?"
        );
    }

    #[test]
    fn every_reply_kind_renders() {
        let composer = composer(None);
        let replies = [
            Reply::AnswerFaq {
                topic: goodtable_core::knowledge::FaqTopic::Menu,
                answer: "We serve paella.".to_string(),
                pending: None,
            },
            Reply::SlotUnavailable {
                date: NaiveDate::from_ymd_opt(2025, 5, 10).expect("valid date"),
                time: NaiveTime::from_hms_opt(20, 0, 0).expect("valid time"),
            },
            Reply::SaveFailed { draft: saturday_draft(), name: None },
            Reply::RestartCollection,
            Reply::Thanks { pending: Some(PendingQuestion::Confirmation) },
            Reply::Farewell { name: None },
            Reply::Clarify { pending: None },
            Reply::AcknowledgeName { name: "Maria".to_string(), returning: false, pending: None },
            Reply::Prefaced {
                courtesy: Courtesy::Name { name: "Maria".to_string(), returning: false },
                reply: Box::new(Reply::ConfirmDraft { draft: saturday_draft(), name: None }),
            },
        ];

        for reply in &replies {
            let text = composer.fallback(&request(reply));
            assert!(!text.is_empty(), "{} rendered empty", reply.kind());
            assert_ne!(text, super::SAFE_FALLBACK, "{} failed to render", reply.kind());
        }
    }

    #[tokio::test]
    async fn failing_llm_falls_back_and_records_degradation() {
        let sink = InMemoryAuditSink::default();
        let context = AuditContext::new(Some("s-1".to_string()), "turn-1", "test");
        let audit = TurnAudit { sink: &sink, context: &context };
        let reply = Reply::RestartCollection;

        let composer = composer(Some(Arc::new(FailingLlm)));
        let text = composer.compose(request(&reply), &audit).await;

        assert_eq!(text, composer.fallback(&request(&reply)));
        assert_eq!(sink.event_types(), vec!["composer.degraded_fallback"]);
    }

    #[tokio::test]
    async fn slow_llm_is_cut_off_by_the_timeout() {
        let sink = InMemoryAuditSink::default();
        let context = AuditContext::new(None, "turn-1", "test");
        let audit = TurnAudit { sink: &sink, context: &context };
        let reply = Reply::Thanks { pending: None };

        let text = composer(Some(Arc::new(SlowLlm))).compose(request(&reply), &audit).await;

        assert!(text.starts_with("You're welcome!"));
        assert_eq!(sink.event_types(), vec!["composer.degraded_fallback"]);
    }

    #[tokio::test]
    async fn llm_prompt_carries_facts_customer_and_required_content() {
        let sink = InMemoryAuditSink::default();
        let context = AuditContext::new(None, "turn-1", "test");
        let audit = TurnAudit { sink: &sink, context: &context };
        let reply = Reply::RestartCollection;
        let mut compose_request = request(&reply);
        compose_request.returning = true;

        let text = composer(Some(Arc::new(EchoPromptLlm))).compose(compose_request, &audit).await;

        assert!(text.starts_with("[hello] You are the virtual assistant of The Good Table."));
        assert!(text.contains("You're speaking with Maria, a returning customer."));
        assert!(text.contains("Alright, let's start over."));
        assert!(sink.events().is_empty());
    }
}
