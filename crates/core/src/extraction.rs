//! Pattern-based extraction of reservation fields from a single utterance.

use chrono::{NaiveDate, NaiveTime};

use crate::domain::reservation::{DraftField, ReservationDraft};
use crate::temporal::{parse_month, parse_weekday, TemporalResolver};
use crate::text::{parse_count, Token, Utterance};

pub const PARTY_UNITS: &[&str] =
    &["people", "persons", "person", "guests", "guest", "adults", "diners", "pax"];

const PARTY_LEADS: &[&str] = &["party of", "group of", "table for", "for"];

const TIME_SUFFIXES: &[&str] = &["am", "pm", "oclock"];

const HOUR_LEADS: &[&str] = &["at", "around", "about", "by", "after", "before", "from"];

/// Introduction phrasings, most specific first. `true` marks phrasings that
/// are common outside introductions ("I'm looking...") and so only count
/// when the following word is capitalised.
const NAME_LEADS: &[(&str, bool)] = &[
    ("my name is", false),
    ("under the name of", false),
    ("under the name", false),
    ("name is", false),
    ("call me", false),
    ("this is", true),
    ("i am", true),
    ("im", true),
];

const NAME_STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "for", "to", "at", "on", "in", "of", "with", "from", "here",
    "looking", "interested", "going", "trying", "calling", "wondering", "planning", "hoping",
    "booking", "coming", "ready", "back", "just", "also", "so", "very", "not", "fine", "good",
    "ok", "okay", "sure", "hungry", "sorry", "glad", "happy", "please", "thanks",
];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub party_size: Option<u32>,
    pub name: Option<String>,
}

impl ExtractedFields {
    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.time.is_none() && self.party_size.is_none()
    }
}

/// Inputs that shape how an utterance is read.
#[derive(Clone, Debug)]
pub struct ScanContext {
    pub reference: NaiveDate,
    /// The field the dialogue is currently asking for. Bare numbers are read
    /// as an hour when this is `Time` and as a head count when `PartySize`.
    pub focus: Option<DraftField>,
    /// A name already matched by the intent classifier.
    pub name_span: Option<String>,
}

impl ScanContext {
    pub fn new(reference: NaiveDate) -> Self {
        Self { reference, focus: None, name_span: None }
    }

    pub fn with_focus(mut self, focus: Option<DraftField>) -> Self {
        self.focus = focus;
        self
    }

    pub fn with_name_span(mut self, name_span: Option<String>) -> Self {
        self.name_span = name_span;
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct FieldExtractor {
    resolver: TemporalResolver,
}

impl FieldExtractor {
    pub fn new(resolver: TemporalResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &TemporalResolver {
        &self.resolver
    }

    /// Reads every field category independently: date, time, party size,
    /// then name. One utterance may fill several fields.
    pub fn scan(&self, utterance: &Utterance, context: &ScanContext) -> ExtractedFields {
        let date = self.resolver.match_date(utterance, context.reference).map(|(_, date)| date);
        let time = self.resolver.match_time(utterance).map(|(_, time)| time).or_else(|| {
            (context.focus == Some(DraftField::Time))
                .then(|| self.resolver.resolve_lone_hour(utterance))
                .flatten()
        });
        let party_size = party_size(utterance, context.focus == Some(DraftField::PartySize));
        let name = context.name_span.clone().or_else(|| extract_name(utterance));

        ExtractedFields { date, time, party_size, name }
    }

    /// Fills only the fields `draft` is missing.
    pub fn extract(
        &self,
        utterance: &Utterance,
        draft: &ReservationDraft,
        context: &ScanContext,
    ) -> ReservationDraft {
        let found = self.scan(utterance, context);
        ReservationDraft {
            date: draft.date.or(found.date),
            time: draft.time.or(found.time),
            party_size: draft.party_size.or(found.party_size),
            name: draft.name.clone().or(found.name),
        }
    }

    /// Overwrites any field the utterance mentions.
    pub fn correct(
        &self,
        utterance: &Utterance,
        draft: &ReservationDraft,
        context: &ScanContext,
    ) -> ReservationDraft {
        let found = self.scan(utterance, context);
        ReservationDraft {
            date: found.date.or(draft.date),
            time: found.time.or(draft.time),
            party_size: found.party_size.or(draft.party_size),
            name: found.name.or_else(|| draft.name.clone()),
        }
    }
}

fn party_size(utterance: &Utterance, bare_numbers_allowed: bool) -> Option<u32> {
    let tokens = utterance.tokens();

    // "4 people", "four of us"
    for (index, token) in tokens.iter().enumerate() {
        let Some(count) = parse_count(&token.text).filter(|count| *count > 0) else {
            continue;
        };
        let next = tokens.get(index + 1).map(|next| next.text.as_str());
        let of_us = next == Some("of") && tokens.get(index + 2).is_some_and(|t| t.text == "us");
        if next.is_some_and(|next| PARTY_UNITS.contains(&next)) || of_us {
            return Some(count);
        }
    }

    // "party of 6", "table for 2", "for 4"
    for lead in PARTY_LEADS {
        let Some(start) = utterance.find_phrase(lead) else {
            continue;
        };
        let index = start + lead.split_whitespace().count();
        if let Some(count) = standalone_count(tokens, index) {
            return Some(count);
        }
    }

    if utterance.contains_phrase("just me") || utterance.contains_phrase("only me") {
        return Some(1);
    }
    if utterance.contains_phrase("couple") {
        return Some(2);
    }

    if bare_numbers_allowed {
        return (0..tokens.len()).find_map(|index| {
            let after_hour_lead =
                index > 0 && HOUR_LEADS.contains(&tokens[index - 1].text.as_str());
            (!after_hour_lead).then(|| standalone_count(tokens, index)).flatten()
        });
    }

    None
}

/// A count at `index` that is not part of a time or a date ("for 8pm",
/// "for 8 o'clock", "for 10 may").
fn standalone_count(tokens: &[Token], index: usize) -> Option<u32> {
    let count = parse_count(&tokens.get(index)?.text).filter(|count| *count > 0)?;
    let next = tokens.get(index + 1).map(|next| next.text.as_str());
    let time_or_date = next.is_some_and(|next| {
        TIME_SUFFIXES.contains(&next) || parse_month(next).is_some() || next == "of"
    });
    (!time_or_date).then_some(count)
}

/// Name from introduction phrasing only; a lone capitalised word is never
/// taken as a name.
pub fn extract_name(utterance: &Utterance) -> Option<String> {
    let tokens = utterance.tokens();
    NAME_LEADS.iter().find_map(|(lead, needs_capital)| {
        let start = utterance.find_phrase(lead)?;
        let index = start + lead.split_whitespace().count();
        let first = tokens.get(index)?;
        if !is_name_word(first) || (*needs_capital && !first.is_capitalized()) {
            return None;
        }

        let mut parts = vec![title_case(&first.text)];
        if let Some(second) = tokens.get(index + 1) {
            if second.is_capitalized() && is_name_word(second) && !is_calendar_word(second) {
                parts.push(title_case(&second.text));
            }
        }
        Some(parts.join(" "))
    })
}

fn is_name_word(token: &Token) -> bool {
    token.is_alphabetic() && !NAME_STOP_WORDS.contains(&token.text.as_str())
}

/// "I'm Maria, Saturday at 8pm" loses its comma in tokenisation, so a
/// capitalised day or month never extends a name.
fn is_calendar_word(token: &Token) -> bool {
    parse_weekday(&token.text).is_some()
        || parse_month(&token.text).is_some()
        || matches!(token.text.as_str(), "today" | "tomorrow" | "tonight")
}

fn title_case(word: &str) -> String {
    let mut characters = word.chars();
    match characters.next() {
        Some(first) => first.to_uppercase().chain(characters).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::{extract_name, FieldExtractor, ScanContext};
    use crate::domain::reservation::{DraftField, ReservationDraft};
    use crate::text::Utterance;

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 5).expect("valid date")
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
    }

    fn scan(text: &str, focus: Option<DraftField>) -> super::ExtractedFields {
        FieldExtractor::default()
            .scan(&Utterance::new(text), &ScanContext::new(reference()).with_focus(focus))
    }

    #[test]
    fn one_utterance_fills_three_fields() {
        let found = scan("Saturday at 8pm for 4", None);
        assert_eq!(found.date, NaiveDate::from_ymd_opt(2025, 5, 10));
        assert_eq!(found.time, Some(time(20, 0)));
        assert_eq!(found.party_size, Some(4));
    }

    #[test]
    fn party_size_patterns() {
        assert_eq!(scan("Around 8pm for 4 people", None).party_size, Some(4));
        assert_eq!(scan("there will be six of us", None).party_size, Some(6));
        assert_eq!(scan("a party of 12", None).party_size, Some(12));
        assert_eq!(scan("table for two please", None).party_size, Some(2));
        assert_eq!(scan("just me", None).party_size, Some(1));
        assert_eq!(scan("for a couple", None).party_size, Some(2));
    }

    #[test]
    fn times_and_dates_are_not_mistaken_for_party_size() {
        assert_eq!(scan("book for 8pm", None).party_size, None);
        assert_eq!(scan("for 8 o'clock", None).party_size, None);
        assert_eq!(scan("for 10 May", None).party_size, None);
        assert_eq!(scan("for 8 o'clock", None).time, Some(time(20, 0)));
    }

    #[test]
    fn bare_numbers_follow_the_requested_field() {
        assert_eq!(scan("4", Some(DraftField::PartySize)).party_size, Some(4));
        assert_eq!(scan("4", Some(DraftField::PartySize)).time, None);
        assert_eq!(scan("8", Some(DraftField::Time)).time, Some(time(20, 0)));
        assert_eq!(scan("8", Some(DraftField::Time)).party_size, None);
        assert_eq!(scan("4", None).party_size, None);
        assert_eq!(scan("at 9", Some(DraftField::PartySize)).party_size, None);
    }

    #[test]
    fn names_come_from_introductions_only() {
        assert_eq!(extract_name(&Utterance::new("Hi, my name is Maria")), Some("Maria".into()));
        assert_eq!(extract_name(&Utterance::new("I'm Ana Lopez")), Some("Ana Lopez".into()));
        assert_eq!(extract_name(&Utterance::new("call me jo")), Some("Jo".into()));
        assert_eq!(extract_name(&Utterance::new("I'm looking for a table")), None);
        assert_eq!(extract_name(&Utterance::new("I am hungry")), None);
        assert_eq!(extract_name(&Utterance::new("Maria")), None);
        assert_eq!(extract_name(&Utterance::new("this is great")), None);
    }

    #[test]
    fn a_following_day_or_month_is_not_a_surname() {
        assert_eq!(
            extract_name(&Utterance::new("I'm Maria, Saturday at 8pm for 4 people")),
            Some("Maria".into())
        );
        assert_eq!(extract_name(&Utterance::new("I'm Maria, May 10th please")), Some("Maria".into()));
        assert_eq!(extract_name(&Utterance::new("This is Maria, Tomorrow at 8")), Some("Maria".into()));
    }

    #[test]
    fn extract_never_overwrites_set_fields() {
        let extractor = FieldExtractor::default();
        let complete = ReservationDraft {
            date: NaiveDate::from_ymd_opt(2025, 5, 10),
            time: Some(time(20, 0)),
            party_size: Some(4),
            name: Some("Maria".to_string()),
        };

        for text in ["Sunday at 9pm for 6 people", "my name is Lucia", "sounds lovely"] {
            let context = ScanContext::new(reference());
            let updated = extractor.extract(&Utterance::new(text), &complete, &context);
            assert_eq!(updated, complete, "{text} altered the draft");
        }
    }

    #[test]
    fn correct_overwrites_only_mentioned_fields() {
        let extractor = FieldExtractor::default();
        let draft = ReservationDraft {
            date: NaiveDate::from_ymd_opt(2025, 5, 10),
            time: Some(time(20, 0)),
            party_size: Some(4),
            name: None,
        };

        let corrected = extractor.correct(
            &Utterance::new("actually make it 6 people"),
            &draft,
            &ScanContext::new(reference()),
        );
        assert_eq!(corrected.party_size, Some(6));
        assert_eq!(corrected.date, draft.date);
        assert_eq!(corrected.time, draft.time);
    }

    #[test]
    fn name_span_from_classifier_is_reused() {
        let found = FieldExtractor::default().scan(
            &Utterance::new("book for Saturday"),
            &ScanContext::new(reference()).with_name_span(Some("Maria".to_string())),
        );
        assert_eq!(found.name.as_deref(), Some("Maria"));
    }
}
