//! Deterministic intent classification over an ordered rule table.

use serde::{Deserialize, Serialize};

use crate::extraction::extract_name;
use crate::knowledge::FaqTopic;
use crate::text::Utterance;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "topic")]
pub enum Intent {
    Greeting,
    ReservationRequest,
    ReservationContinuation,
    Faq(FaqTopic),
    NameIntroduction,
    Thanks,
    Affirm,
    Decline,
    Farewell,
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::ReservationRequest => "reservation_request",
            Self::ReservationContinuation => "reservation_continuation",
            Self::Faq(FaqTopic::Menu) => "faq_menu",
            Self::Faq(FaqTopic::Hours) => "faq_hours",
            Self::Faq(FaqTopic::Location) => "faq_location",
            Self::Faq(FaqTopic::Contact) => "faq_contact",
            Self::Faq(FaqTopic::Events) => "faq_events",
            Self::Faq(FaqTopic::Payments) => "faq_payments",
            Self::NameIntroduction => "name_introduction",
            Self::Thanks => "thanks",
            Self::Affirm => "affirm",
            Self::Decline => "decline",
            Self::Farewell => "farewell",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntentResult {
    pub intent: Intent,
    /// Name matched from introduction phrasing, whatever the intent.
    pub name: Option<String>,
    /// Set when an otherwise unknown utterance was read as a reservation
    /// continuation because a draft is open.
    pub biased: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassificationContext {
    /// A reservation draft exists and is still being collected.
    pub collecting: bool,
    pub awaiting_confirmation: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Matcher {
    Keywords(&'static [&'static str]),
    NameIntroduction,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleScope {
    Always,
    AwaitingConfirmation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rule {
    pub intent: Intent,
    pub matcher: Matcher,
    pub scope: RuleScope,
}

const fn keywords(intent: Intent, phrases: &'static [&'static str]) -> Rule {
    Rule { intent, matcher: Matcher::Keywords(phrases), scope: RuleScope::Always }
}

const fn confirmation(intent: Intent, phrases: &'static [&'static str]) -> Rule {
    Rule { intent, matcher: Matcher::Keywords(phrases), scope: RuleScope::AwaitingConfirmation }
}

/// First matching rule wins. Farewell precedes everything so "bye" is never
/// read as anything else; affirm/decline only apply while a booking waits
/// for confirmation; name introduction precedes greeting so "Hi, I'm Ana"
/// records the name.
pub const INTENT_RULES: &[Rule] = &[
    keywords(
        Intent::Farewell,
        &["goodbye", "bye", "see you", "farewell", "good night", "exit", "quit", "im leaving"],
    ),
    confirmation(
        Intent::Affirm,
        &[
            "yes", "yeah", "yep", "yup", "correct", "confirm", "sure", "perfect", "ok", "okay",
            "sounds good", "thats right", "great",
        ],
    ),
    confirmation(Intent::Decline, &["no", "nope", "incorrect", "wrong", "not right"]),
    keywords(
        Intent::ReservationRequest,
        &["book", "booking", "reserve", "reservation", "reservations", "table"],
    ),
    keywords(
        Intent::Faq(FaqTopic::Menu),
        &[
            "menu", "food", "dish", "dishes", "eat", "cuisine", "vegetarian", "vegan", "dessert",
            "desserts", "drinks", "wine",
        ],
    ),
    keywords(
        Intent::Faq(FaqTopic::Hours),
        &["hours", "open", "opening", "close", "closed", "closing", "schedule"],
    ),
    keywords(
        Intent::Faq(FaqTopic::Location),
        &["where", "location", "address", "directions", "located", "parking"],
    ),
    keywords(
        Intent::Faq(FaqTopic::Contact),
        &["phone", "contact", "email", "telephone", "call you", "website"],
    ),
    keywords(
        Intent::Faq(FaqTopic::Events),
        &["event", "events", "celebration", "celebrations", "birthday", "private party"],
    ),
    keywords(Intent::Faq(FaqTopic::Payments), &["pay", "payment", "payments", "card", "cards", "cash", "credit"]),
    Rule {
        intent: Intent::NameIntroduction,
        matcher: Matcher::NameIntroduction,
        scope: RuleScope::Always,
    },
    keywords(
        Intent::Greeting,
        &["hi", "hello", "hey", "howdy", "greetings", "good morning", "good afternoon", "good evening"],
    ),
    keywords(Intent::Thanks, &["thanks", "thank you", "thank", "appreciate", "cheers"]),
];

#[derive(Clone, Copy, Debug, Default)]
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn classify(&self, utterance: &Utterance, context: &ClassificationContext) -> IntentResult {
        let name = extract_name(utterance);

        let matched = INTENT_RULES.iter().find(|rule| {
            if rule.scope == RuleScope::AwaitingConfirmation && !context.awaiting_confirmation {
                return false;
            }
            match rule.matcher {
                Matcher::Keywords(phrases) => {
                    phrases.iter().any(|phrase| utterance.contains_phrase(phrase))
                }
                Matcher::NameIntroduction => name.is_some(),
            }
        });

        match matched {
            Some(rule) => IntentResult { intent: rule.intent, name, biased: false },
            None if context.collecting || context.awaiting_confirmation => IntentResult {
                intent: Intent::ReservationContinuation,
                name,
                biased: true,
            },
            None => IntentResult { intent: Intent::Unknown, name, biased: false },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ClassificationContext, Intent, IntentClassifier, Matcher, RuleScope, INTENT_RULES,
    };
    use crate::knowledge::FaqTopic;
    use crate::text::Utterance;

    fn classify(text: &str, context: ClassificationContext) -> super::IntentResult {
        IntentClassifier.classify(&Utterance::new(text), &context)
    }

    fn idle() -> ClassificationContext {
        ClassificationContext::default()
    }

    #[test]
    fn farewell_is_checked_first() {
        assert_eq!(INTENT_RULES[0].intent, Intent::Farewell);
        assert_eq!(classify("ok bye, no booking for me", idle()).intent, Intent::Farewell);
    }

    #[test]
    fn reservation_keywords_beat_faq_keywords() {
        let result = classify("I'd like to book a table, are you open Saturday?", idle());
        assert_eq!(result.intent, Intent::ReservationRequest);
    }

    #[test]
    fn faq_topics_are_recognised() {
        let cases = [
            ("What's on the menu?", FaqTopic::Menu),
            ("What are your opening hours?", FaqTopic::Hours),
            ("Where are you located?", FaqTopic::Location),
            ("what is your phone number", FaqTopic::Contact),
            ("Do you host birthday celebrations?", FaqTopic::Events),
            ("can I pay by card", FaqTopic::Payments),
        ];
        for (text, topic) in cases {
            assert_eq!(classify(text, idle()).intent, Intent::Faq(topic), "{text}");
        }
    }

    #[test]
    fn name_introduction_outranks_greeting_and_keeps_the_span() {
        let result = classify("Hi, my name is Maria", idle());
        assert_eq!(result.intent, Intent::NameIntroduction);
        assert_eq!(result.name.as_deref(), Some("Maria"));

        assert_eq!(classify("Hello there", idle()).intent, Intent::Greeting);
    }

    #[test]
    fn name_span_is_carried_on_other_intents() {
        let result = classify("I'm Maria and I want to book a table", idle());
        assert_eq!(result.intent, Intent::ReservationRequest);
        assert_eq!(result.name.as_deref(), Some("Maria"));
    }

    #[test]
    fn affirm_and_decline_only_while_awaiting_confirmation() {
        let awaiting = ClassificationContext { collecting: false, awaiting_confirmation: true };
        assert_eq!(classify("yes please", awaiting).intent, Intent::Affirm);
        assert_eq!(classify("no, that's wrong", awaiting).intent, Intent::Decline);
        assert_eq!(classify("yes please", idle()).intent, Intent::Unknown);

        let scoped = INTENT_RULES
            .iter()
            .filter(|rule| rule.scope == RuleScope::AwaitingConfirmation)
            .map(|rule| rule.intent)
            .collect::<Vec<_>>();
        assert_eq!(scoped, vec![Intent::Affirm, Intent::Decline]);
    }

    #[test]
    fn open_draft_biases_unknown_utterances_to_continuation() {
        let collecting = ClassificationContext { collecting: true, awaiting_confirmation: false };
        let result = classify("Around 8pm for 4 people", collecting);
        assert_eq!(result.intent, Intent::ReservationContinuation);
        assert!(result.biased);

        let result = classify("Around 8pm for 4 people", idle());
        assert_eq!(result.intent, Intent::Unknown);
        assert!(!result.biased);
    }

    #[test]
    fn faq_during_collection_stays_faq() {
        let collecting = ClassificationContext { collecting: true, awaiting_confirmation: false };
        assert_eq!(classify("what's on the menu?", collecting).intent, Intent::Faq(FaqTopic::Menu));
    }

    #[test]
    fn name_rule_is_the_only_non_keyword_matcher() {
        let non_keyword = INTENT_RULES
            .iter()
            .filter(|rule| matches!(rule.matcher, Matcher::NameIntroduction))
            .count();
        assert_eq!(non_keyword, 1);
    }

    #[test]
    fn unmatched_input_is_unknown_not_an_error() {
        let result = classify("qwerty asdf", idle());
        assert_eq!(result.intent, Intent::Unknown);
        assert_eq!(result.name, None);
    }
}
