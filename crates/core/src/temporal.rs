//! Resolution of natural-language dates and times against an explicit
//! reference date.
//!
//! Both resolvers walk an ordered rule table and stop at the first rule that
//! produces a value. `None` means "unresolved": the caller keeps the field
//! missing and asks again.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::knowledge::WEEK;
use crate::text::{Token, Utterance};

/// How a bare weekday name is resolved when it names the reference day.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SameWeekdayPolicy {
    #[default]
    Today,
    NextWeek,
}

impl std::str::FromStr for SameWeekdayPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(Self::Today),
            "next_week" | "next-week" => Ok(Self::NextWeek),
            other => Err(format!("unsupported same_weekday policy `{other}` (expected today|next_week)")),
        }
    }
}

/// Representative clock times for vague dayparts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaypartDefaults {
    pub morning: NaiveTime,
    pub noon: NaiveTime,
    pub lunch: NaiveTime,
    pub afternoon: NaiveTime,
    pub evening: NaiveTime,
    pub dinner: NaiveTime,
    pub night: NaiveTime,
}

impl Default for DaypartDefaults {
    fn default() -> Self {
        Self {
            morning: clock(10, 0),
            noon: clock(12, 0),
            lunch: clock(13, 0),
            afternoon: clock(16, 0),
            evening: clock(19, 0),
            dinner: clock(20, 0),
            night: clock(21, 0),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalSettings {
    pub same_weekday: SameWeekdayPolicy,
    pub dayparts: DaypartDefaults,
    /// Hours written without am/pm below this value are read as afternoon or
    /// evening ("at 8" is 20:00). Zero disables the adjustment.
    pub assume_pm_below_hour: u32,
}

impl Default for TemporalSettings {
    fn default() -> Self {
        Self {
            same_weekday: SameWeekdayPolicy::Today,
            dayparts: DaypartDefaults::default(),
            assume_pm_below_hour: 10,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateRule {
    IsoDate,
    NumericDate,
    MonthDay,
    DayAfterTomorrow,
    Today,
    Tomorrow,
    NextWeekday,
    Weekday,
}

/// Evaluation order for date expressions; the first match wins.
pub const DATE_RULES: [DateRule; 8] = [
    DateRule::IsoDate,
    DateRule::NumericDate,
    DateRule::MonthDay,
    DateRule::DayAfterTomorrow,
    DateRule::Today,
    DateRule::Tomorrow,
    DateRule::NextWeekday,
    DateRule::Weekday,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeRule {
    Meridiem,
    Clock,
    BareHour,
    Daypart,
}

/// Evaluation order for time expressions; the first match wins.
pub const TIME_RULES: [TimeRule; 4] =
    [TimeRule::Meridiem, TimeRule::Clock, TimeRule::BareHour, TimeRule::Daypart];

const HOUR_PREFIXES: &[&str] = &["at", "around", "about", "by", "after", "before", "from"];

#[derive(Clone, Debug, Default)]
pub struct TemporalResolver {
    settings: TemporalSettings,
}

impl TemporalResolver {
    pub fn new(settings: TemporalSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &TemporalSettings {
        &self.settings
    }

    pub fn resolve_date(&self, expression: &str, reference: NaiveDate) -> Option<NaiveDate> {
        self.match_date(&Utterance::new(expression), reference).map(|(_, date)| date)
    }

    pub fn resolve_time(&self, expression: &str) -> Option<NaiveTime> {
        self.match_time(&Utterance::new(expression)).map(|(_, time)| time)
    }

    pub fn match_date(
        &self,
        utterance: &Utterance,
        reference: NaiveDate,
    ) -> Option<(DateRule, NaiveDate)> {
        DATE_RULES
            .iter()
            .find_map(|rule| self.apply_date_rule(*rule, utterance, reference).map(|d| (*rule, d)))
    }

    pub fn match_time(&self, utterance: &Utterance) -> Option<(TimeRule, NaiveTime)> {
        TIME_RULES
            .iter()
            .find_map(|rule| self.apply_time_rule(*rule, utterance).map(|time| (*rule, time)))
    }

    /// Reads an utterance consisting of a single hour ("8", "eight") as a
    /// time. Only used when the dialogue is explicitly waiting for a time.
    pub fn resolve_lone_hour(&self, utterance: &Utterance) -> Option<NaiveTime> {
        let [token] = utterance.tokens() else {
            return None;
        };
        let hour = crate::text::parse_count(&token.text)?;
        if !(1..=23).contains(&hour) {
            return None;
        }
        self.adjust_bare_hour(hour, 0, false)
    }

    fn apply_date_rule(
        &self,
        rule: DateRule,
        utterance: &Utterance,
        reference: NaiveDate,
    ) -> Option<NaiveDate> {
        let tokens = utterance.tokens();
        match rule {
            DateRule::IsoDate => tokens.iter().find_map(|token| parse_iso_date(&token.text)),
            DateRule::NumericDate => {
                tokens.iter().find_map(|token| parse_numeric_date(&token.text, reference))
            }
            DateRule::MonthDay => parse_month_day(tokens, reference),
            DateRule::DayAfterTomorrow => utterance
                .contains_phrase("day after tomorrow")
                .then(|| reference + Duration::days(2)),
            DateRule::Today => ["today", "tonight", "this evening"]
                .iter()
                .any(|phrase| utterance.contains_phrase(phrase))
                .then_some(reference),
            DateRule::Tomorrow => ["tomorrow", "tmrw", "tomorrow night"]
                .iter()
                .any(|phrase| utterance.contains_phrase(phrase))
                .then(|| reference + Duration::days(1)),
            DateRule::NextWeekday => tokens.windows(2).find_map(|pair| {
                if pair[0].text != "next" {
                    return None;
                }
                let target = parse_weekday(&pair[1].text)?;
                let ahead = days_until(reference.weekday(), target);
                Some(reference + Duration::days(if ahead == 0 { 7 } else { ahead }))
            }),
            DateRule::Weekday => tokens.iter().find_map(|token| {
                let target = parse_weekday(&token.text)?;
                let ahead = days_until(reference.weekday(), target);
                let ahead = match (ahead, self.settings.same_weekday) {
                    (0, SameWeekdayPolicy::NextWeek) => 7,
                    (ahead, _) => ahead,
                };
                Some(reference + Duration::days(ahead))
            }),
        }
    }

    fn apply_time_rule(&self, rule: TimeRule, utterance: &Utterance) -> Option<NaiveTime> {
        let tokens = utterance.tokens();
        match rule {
            TimeRule::Meridiem => tokens.iter().enumerate().find_map(|(index, token)| {
                if let Some(time) = parse_meridiem_token(&token.text) {
                    return Some(time);
                }
                let suffix = tokens.get(index + 1)?;
                let is_pm = match suffix.text.as_str() {
                    "pm" => true,
                    "am" => false,
                    _ => return None,
                };
                let (hour, minute) = split_clock(&token.text)?;
                twelve_hour(hour, minute, is_pm)
            }),
            TimeRule::Clock => tokens.iter().find_map(|token| {
                if !token.text.contains(':') {
                    return None;
                }
                let (hour, minute) = split_clock(&token.text)?;
                if hour > 23 {
                    return None;
                }
                self.adjust_bare_hour(hour, minute, token.text.starts_with('0'))
            }),
            TimeRule::BareHour => tokens.iter().enumerate().find_map(|(index, token)| {
                let hour = crate::text::parse_count(&token.text)?;
                if !(1..=23).contains(&hour) {
                    return None;
                }
                let prefixed = index > 0 && HOUR_PREFIXES.contains(&tokens[index - 1].text.as_str());
                let suffixed = tokens.get(index + 1).is_some_and(|next| next.text == "oclock");
                if !(prefixed || suffixed) || followed_by_party_unit(tokens, index) {
                    return None;
                }
                self.adjust_bare_hour(hour, 0, false)
            }),
            TimeRule::Daypart => tokens.iter().enumerate().find_map(|(index, token)| {
                if index > 0 && tokens[index - 1].text == "good" {
                    return None;
                }
                self.daypart(&token.text)
            }),
        }
    }

    fn daypart(&self, word: &str) -> Option<NaiveTime> {
        let dayparts = &self.settings.dayparts;
        let time = match word {
            "morning" => dayparts.morning,
            "noon" | "midday" => dayparts.noon,
            "lunch" | "lunchtime" => dayparts.lunch,
            "afternoon" => dayparts.afternoon,
            "evening" | "tonight" => dayparts.evening,
            "dinner" | "dinnertime" => dayparts.dinner,
            "night" => dayparts.night,
            _ => return None,
        };
        Some(time)
    }

    fn adjust_bare_hour(&self, hour: u32, minute: u32, zero_padded: bool) -> Option<NaiveTime> {
        let hour = if !zero_padded && hour > 0 && hour < self.settings.assume_pm_below_hour.min(12)
        {
            hour + 12
        } else {
            hour
        };
        NaiveTime::from_hms_opt(hour, minute, 0)
    }
}

fn clock(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

fn days_until(from: Weekday, to: Weekday) -> i64 {
    let from = i64::from(from.num_days_from_monday());
    let to = i64::from(to.num_days_from_monday());
    (to - from).rem_euclid(7)
}

pub(crate) fn parse_weekday(word: &str) -> Option<Weekday> {
    let singular = word.strip_suffix('s').unwrap_or(word);
    WEEK.into_iter().find(|weekday| {
        crate::knowledge::weekday_name(*weekday).eq_ignore_ascii_case(singular)
            || crate::knowledge::weekday_name(*weekday).eq_ignore_ascii_case(word)
    })
}

fn parse_iso_date(word: &str) -> Option<NaiveDate> {
    let (year, _) = word.split_once('-')?;
    if year.len() != 4 {
        return None;
    }
    NaiveDate::parse_from_str(word, "%Y-%m-%d").ok()
}

/// Day-first numeric dates: `dd/mm/yyyy`, `dd-mm-yyyy`, or `dd/mm`.
fn parse_numeric_date(word: &str, reference: NaiveDate) -> Option<NaiveDate> {
    let separator = if word.contains('/') {
        '/'
    } else if word.contains('-') {
        '-'
    } else {
        return None;
    };

    let parts = word.split(separator).collect::<Vec<_>>();
    match parts.as_slice() {
        [day, month, year] if day.len() <= 2 => {
            let year = match year.parse::<i32>().ok()? {
                short @ 0..=99 => 2000 + short,
                full => full,
            };
            NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
        }
        [day, month] if separator == '/' => {
            upcoming_day_month(day.parse().ok()?, month.parse().ok()?, reference)
        }
        _ => None,
    }
}

fn parse_month_day(tokens: &[Token], reference: NaiveDate) -> Option<NaiveDate> {
    for (index, token) in tokens.iter().enumerate() {
        let Some(month) = parse_month(&token.text) else {
            continue;
        };

        let after = tokens.get(index + 1).and_then(|next| parse_day_of_month(&next.text));
        let before = index
            .checked_sub(1)
            .and_then(|previous| parse_day_of_month(&tokens[previous].text))
            .or_else(|| {
                let of_index = index.checked_sub(1)?;
                if tokens[of_index].text != "of" {
                    return None;
                }
                parse_day_of_month(&tokens[of_index.checked_sub(1)?].text)
            });

        let Some(day) = after.or(before) else {
            continue;
        };

        let year_index = if after.is_some() { index + 2 } else { index + 1 };
        let explicit_year = tokens
            .get(year_index)
            .and_then(|candidate| candidate.text.parse::<i32>().ok())
            .filter(|year| (2000..=2100).contains(year));

        return match explicit_year {
            Some(year) => NaiveDate::from_ymd_opt(year, month, day),
            None => upcoming_day_month(day, month, reference),
        };
    }
    None
}

fn upcoming_day_month(day: u32, month: u32, reference: NaiveDate) -> Option<NaiveDate> {
    let this_year = NaiveDate::from_ymd_opt(reference.year(), month, day)?;
    if this_year >= reference {
        return Some(this_year);
    }
    NaiveDate::from_ymd_opt(reference.year() + 1, month, day)
}

pub(crate) fn parse_month(word: &str) -> Option<u32> {
    let month = match word {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sep" | "sept" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn parse_day_of_month(word: &str) -> Option<u32> {
    let digits = ["st", "nd", "rd", "th"]
        .iter()
        .find_map(|suffix| word.strip_suffix(suffix))
        .unwrap_or(word);
    let day = digits.parse::<u32>().ok()?;
    (1..=31).contains(&day).then_some(day)
}

fn parse_meridiem_token(word: &str) -> Option<NaiveTime> {
    let (clock_part, is_pm) = if let Some(prefix) = word.strip_suffix("pm") {
        (prefix, true)
    } else if let Some(prefix) = word.strip_suffix("am") {
        (prefix, false)
    } else {
        return None;
    };
    let (hour, minute) = split_clock(clock_part)?;
    twelve_hour(hour, minute, is_pm)
}

fn split_clock(word: &str) -> Option<(u32, u32)> {
    if word.is_empty() {
        return None;
    }
    match word.split_once(|character| character == ':' || character == '.') {
        Some((hour, minute)) if minute.len() == 2 => {
            Some((hour.parse().ok()?, minute.parse::<u32>().ok().filter(|m| *m < 60)?))
        }
        Some(_) => None,
        None => Some((word.parse().ok()?, 0)),
    }
}

fn twelve_hour(hour: u32, minute: u32, is_pm: bool) -> Option<NaiveTime> {
    if !(1..=12).contains(&hour) {
        return None;
    }
    let hour = match (hour, is_pm) {
        (12, false) => 0,
        (12, true) => 12,
        (hour, true) => hour + 12,
        (hour, false) => hour,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn followed_by_party_unit(tokens: &[Token], index: usize) -> bool {
    tokens
        .get(index + 1)
        .is_some_and(|next| crate::extraction::PARTY_UNITS.contains(&next.text.as_str()))
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};

    use super::{
        DateRule, SameWeekdayPolicy, TemporalResolver, TemporalSettings, TimeRule, DATE_RULES,
    };
    use crate::text::Utterance;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
    }

    // Monday
    fn reference() -> NaiveDate {
        date(2025, 5, 5)
    }

    #[test]
    fn weekday_resolves_to_next_occurrence() {
        let resolver = TemporalResolver::default();
        assert_eq!(resolver.resolve_date("Saturday", reference()), Some(date(2025, 5, 10)));
        assert_eq!(
            resolver.resolve_date("I'd like to book a table for Saturday", reference()),
            Some(date(2025, 5, 10))
        );
        assert_eq!(resolver.resolve_date("sunday", reference()), Some(date(2025, 5, 11)));
    }

    #[test]
    fn every_weekday_lands_on_that_weekday_on_or_after_reference() {
        let resolver = TemporalResolver::default();
        let names =
            ["monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday"];

        for offset in 0..14 {
            let reference = reference() + chrono::Duration::days(offset);
            for (index, name) in names.iter().enumerate() {
                let resolved = resolver.resolve_date(name, reference).expect("weekday resolves");
                assert_eq!(resolved.weekday().num_days_from_monday() as usize, index);
                assert!(resolved >= reference, "{name} from {reference} gave {resolved}");
                assert!(resolved < reference + chrono::Duration::days(7));
            }
        }
    }

    #[test]
    fn same_weekday_policy_is_configurable() {
        let today_policy = TemporalResolver::default();
        assert_eq!(today_policy.resolve_date("Monday", reference()), Some(reference()));

        let next_week = TemporalResolver::new(TemporalSettings {
            same_weekday: SameWeekdayPolicy::NextWeek,
            ..TemporalSettings::default()
        });
        assert_eq!(next_week.resolve_date("Monday", reference()), Some(date(2025, 5, 12)));
        assert_eq!(next_week.resolve_date("Saturday", reference()), Some(date(2025, 5, 10)));
    }

    #[test]
    fn next_weekday_skips_today() {
        let resolver = TemporalResolver::default();
        assert_eq!(resolver.resolve_date("next monday", reference()), Some(date(2025, 5, 12)));
        assert_eq!(resolver.resolve_date("next friday", reference()), Some(date(2025, 5, 9)));
    }

    #[test]
    fn relative_terms_resolve_from_reference() {
        let resolver = TemporalResolver::default();
        assert_eq!(resolver.resolve_date("today please", reference()), Some(reference()));
        assert_eq!(resolver.resolve_date("tonight", reference()), Some(reference()));
        assert_eq!(resolver.resolve_date("tomorrow", reference()), Some(date(2025, 5, 6)));
        assert_eq!(
            resolver.resolve_date("the day after tomorrow", reference()),
            Some(date(2025, 5, 7))
        );
    }

    #[test]
    fn explicit_dates_in_common_formats() {
        let resolver = TemporalResolver::default();
        assert_eq!(resolver.resolve_date("2025-05-17", reference()), Some(date(2025, 5, 17)));
        assert_eq!(resolver.resolve_date("17/05/2025", reference()), Some(date(2025, 5, 17)));
        assert_eq!(resolver.resolve_date("17/05", reference()), Some(date(2025, 5, 17)));
        assert_eq!(resolver.resolve_date("May 17th", reference()), Some(date(2025, 5, 17)));
        assert_eq!(resolver.resolve_date("the 17th of May", reference()), Some(date(2025, 5, 17)));
        assert_eq!(resolver.resolve_date("3 jan", reference()), Some(date(2026, 1, 3)));
        assert_eq!(resolver.resolve_date("31/02/2025", reference()), None);
    }

    #[test]
    fn explicit_date_outranks_relative_words() {
        let resolver = TemporalResolver::default();
        let matched = resolver
            .match_date(&Utterance::new("not tomorrow, 2025-05-17 instead"), reference())
            .expect("date matched");
        assert_eq!(matched, (DateRule::IsoDate, date(2025, 5, 17)));
        assert_eq!(DATE_RULES[0], DateRule::IsoDate);
    }

    #[test]
    fn may_as_a_verb_is_not_a_date() {
        let resolver = TemporalResolver::default();
        assert_eq!(resolver.resolve_date("may I book a table", reference()), None);
    }

    #[test]
    fn unresolved_expressions_return_none() {
        let resolver = TemporalResolver::default();
        assert_eq!(resolver.resolve_date("whenever works", reference()), None);
        assert_eq!(resolver.resolve_time("whenever works"), None);
    }

    #[test]
    fn twelve_hour_times_ignore_filler_words() {
        let resolver = TemporalResolver::default();
        assert_eq!(resolver.resolve_time("around 8pm"), Some(time(20, 0)));
        assert_eq!(resolver.resolve_time("8:30 pm"), Some(time(20, 30)));
        assert_eq!(resolver.resolve_time("at 11 a.m."), Some(time(11, 0)));
        assert_eq!(resolver.resolve_time("12pm"), Some(time(12, 0)));
        assert_eq!(resolver.resolve_time("13pm"), None);
    }

    #[test]
    fn twenty_four_hour_times() {
        let resolver = TemporalResolver::default();
        assert_eq!(resolver.resolve_time("20:00"), Some(time(20, 0)));
        assert_eq!(resolver.resolve_time("at 8:30"), Some(time(20, 30)));
        assert_eq!(resolver.resolve_time("09:30"), Some(time(9, 30)));
        assert_eq!(resolver.resolve_time("25:00"), None);
    }

    #[test]
    fn bare_hours_need_a_prefix_or_oclock() {
        let resolver = TemporalResolver::default();
        assert_eq!(resolver.resolve_time("at 8"), Some(time(20, 0)));
        assert_eq!(resolver.resolve_time("8 o'clock"), Some(time(20, 0)));
        assert_eq!(resolver.resolve_time("around 11"), Some(time(11, 0)));
        assert_eq!(resolver.resolve_time("for 4"), None);
        assert_eq!(resolver.resolve_time("about 6 people"), None);
    }

    #[test]
    fn dayparts_use_configured_defaults() {
        let resolver = TemporalResolver::default();
        assert_eq!(resolver.resolve_time("in the evening"), Some(time(19, 0)));
        assert_eq!(resolver.resolve_time("for lunch"), Some(time(13, 0)));
        assert_eq!(resolver.resolve_time("good evening"), None);

        let mut settings = TemporalSettings::default();
        settings.dayparts.evening = time(18, 30);
        let custom = TemporalResolver::new(settings);
        assert_eq!(custom.resolve_time("evening"), Some(time(18, 30)));
    }

    #[test]
    fn meridiem_outranks_dayparts() {
        let resolver = TemporalResolver::default();
        let matched = resolver.match_time(&Utterance::new("Saturday evening at 9pm"));
        assert_eq!(matched, Some((TimeRule::Meridiem, time(21, 0))));
    }

    #[test]
    fn lone_hours_resolve_only_on_request() {
        let resolver = TemporalResolver::default();
        assert_eq!(resolver.resolve_lone_hour(&Utterance::new("8")), Some(time(20, 0)));
        assert_eq!(resolver.resolve_lone_hour(&Utterance::new("eight")), Some(time(20, 0)));
        assert_eq!(resolver.resolve_lone_hour(&Utterance::new("8 people")), None);
        assert_eq!(resolver.resolve_time("8"), None);
    }

    #[test]
    fn weekday_helper_covers_plurals() {
        assert_eq!(super::parse_weekday("saturdays"), Some(Weekday::Sat));
        assert_eq!(super::parse_weekday("sun"), None);
    }
}
