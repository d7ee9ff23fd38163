//! Static restaurant facts: profile, weekly opening hours, menu, FAQ answers.
//!
//! Built once from configuration and shared read-only across sessions.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

pub const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayHours {
    Closed,
    Open { open: NaiveTime, close: NaiveTime },
}

impl DayHours {
    /// Parses `"closed"` or `"HH:MM-HH:MM"`.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("closed") {
            return Ok(Self::Closed);
        }

        let (open_raw, close_raw) = trimmed
            .split_once('-')
            .ok_or_else(|| format!("expected `HH:MM-HH:MM` or `closed`, got `{trimmed}`"))?;
        let open = parse_clock(open_raw)?;
        let close = parse_clock(close_raw)?;
        if close <= open {
            return Err(format!("closing time must be after opening time in `{trimmed}`"));
        }

        Ok(Self::Open { open, close })
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        match self {
            Self::Closed => false,
            Self::Open { open, close } => *open <= time && time <= *close,
        }
    }
}

impl std::fmt::Display for DayHours {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => f.write_str("Closed"),
            Self::Open { open, close } => {
                write!(f, "{} - {}", open.format("%H:%M"), close.format("%H:%M"))
            }
        }
    }
}

fn parse_clock(raw: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| format!("`{}` is not a valid HH:MM time", raw.trim()))
}

/// Weekly schedule indexed Monday-first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningHours {
    days: [DayHours; 7],
}

impl OpeningHours {
    pub fn new(days: [DayHours; 7]) -> Self {
        Self { days }
    }

    pub fn hours_for(&self, weekday: Weekday) -> DayHours {
        self.days[weekday.num_days_from_monday() as usize]
    }

    pub fn set(&mut self, weekday: Weekday, hours: DayHours) {
        self.days[weekday.num_days_from_monday() as usize] = hours;
    }

    pub fn is_open_on(&self, weekday: Weekday) -> bool {
        self.hours_for(weekday).is_open()
    }

    pub fn describe_week(&self) -> Vec<(Weekday, DayHours)> {
        WEEK.iter().map(|weekday| (*weekday, self.hours_for(*weekday))).collect()
    }

    pub fn closed_days(&self) -> Vec<Weekday> {
        WEEK.into_iter().filter(|weekday| !self.is_open_on(*weekday)).collect()
    }
}

impl Default for OpeningHours {
    fn default() -> Self {
        let service = DayHours::Open {
            open: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or(NaiveTime::MIN),
            close: NaiveTime::from_hms_opt(23, 30, 0).unwrap_or(NaiveTime::MIN),
        };
        Self {
            days: [DayHours::Closed, DayHours::Closed, service, service, service, service, service],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuCategory {
    pub category: String,
    pub items: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantProfile {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub website: String,
    pub location_note: String,
    pub cuisine: String,
    pub events: String,
    pub payments: String,
}

impl Default for RestaurantProfile {
    fn default() -> Self {
        Self {
            name: "The Good Table".to_string(),
            address: "123 Flavors Street, Gastronomic City".to_string(),
            phone: "+1 123 456 7890".to_string(),
            email: "info@thegoodtable.com".to_string(),
            website: "www.thegoodtable.com".to_string(),
            location_note: "We're a 5-minute walk from the Main Square and we have parking for customers.".to_string(),
            cuisine: "We offer Mediterranean cuisine with fusion touches, with options for vegetarians and vegans. Our most popular dishes are the Valencian paella and the whiskey sirloin steak.".to_string(),
            events: "We organize private events and celebrations. For more information, write to events@thegoodtable.com.".to_string(),
            payments: "We accept cash and all major credit cards. We also work with mobile payments.".to_string(),
        }
    }
}

pub fn default_menu() -> Vec<MenuCategory> {
    let category = |name: &str, items: &[&str]| MenuCategory {
        category: name.to_string(),
        items: items.iter().map(|item| (*item).to_string()).collect(),
    };

    vec![
        category(
            "Starters",
            &["Mediterranean salad", "Homemade croquettes", "Andalusian gazpacho", "Cheese board"],
        ),
        category(
            "Main Courses",
            &["Valencian paella", "Whiskey sirloin steak", "Cod confit", "Mushroom risotto"],
        ),
        category(
            "Desserts",
            &["Cheesecake", "Chocolate coulant", "Homemade tiramisu", "Lemon sorbet"],
        ),
        category("Drinks", &["House wines", "Craft beers", "Soft drinks", "Special cocktails"]),
    ]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaqTopic {
    Menu,
    Hours,
    Location,
    Contact,
    Events,
    Payments,
}

impl FaqTopic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Menu => "menu",
            Self::Hours => "hours",
            Self::Location => "location",
            Self::Contact => "contact",
            Self::Events => "events",
            Self::Payments => "payments",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestaurantKnowledge {
    pub profile: RestaurantProfile,
    pub opening_hours: OpeningHours,
    pub menu: Vec<MenuCategory>,
}

impl Default for RestaurantKnowledge {
    fn default() -> Self {
        Self::new(RestaurantProfile::default(), OpeningHours::default(), default_menu())
    }
}

impl RestaurantKnowledge {
    pub fn new(
        profile: RestaurantProfile,
        opening_hours: OpeningHours,
        menu: Vec<MenuCategory>,
    ) -> Self {
        Self { profile, opening_hours, menu }
    }

    pub fn hours_for(&self, weekday: Weekday) -> DayHours {
        self.opening_hours.hours_for(weekday)
    }

    /// Plain-text answer for an FAQ topic; `today` selects the weekday quoted
    /// in the hours answer.
    pub fn faq_answer(&self, topic: FaqTopic, today: Weekday) -> String {
        let profile = &self.profile;
        match topic {
            FaqTopic::Menu => {
                let mut lines = vec![profile.cuisine.clone(), String::new()];
                for category in &self.menu {
                    lines.push(format!("{}: {}", category.category, category.items.join(", ")));
                }
                lines.join("\n")
            }
            FaqTopic::Hours => {
                let mut lines = vec!["Our opening hours are:".to_string()];
                for (weekday, hours) in self.opening_hours.describe_week() {
                    lines.push(format!("- {}: {hours}", weekday_name(weekday)));
                }
                let today_hours = self.hours_for(today);
                let today_line = match today_hours {
                    DayHours::Closed => format!("Today ({}) we're closed.", weekday_name(today)),
                    DayHours::Open { .. } => {
                        format!("Today ({}) we're open {today_hours}.", weekday_name(today))
                    }
                };
                lines.push(today_line);
                lines.join("\n")
            }
            FaqTopic::Location => {
                format!("We are located at {}. {}", profile.address, profile.location_note)
            }
            FaqTopic::Contact => format!(
                "You can contact us by phone ({}) or email ({}). Our website is {}.",
                profile.phone, profile.email, profile.website
            ),
            FaqTopic::Events => profile.events.clone(),
            FaqTopic::Payments => profile.payments.clone(),
        }
    }

    /// Compact fact sheet used to ground AI prompts.
    pub fn fact_sheet(&self) -> String {
        let profile = &self.profile;
        let mut lines = vec![
            format!("Restaurant: {}", profile.name),
            format!("Address: {}", profile.address),
            format!("Phone: {}", profile.phone),
            format!("Email: {}", profile.email),
            "Opening hours:".to_string(),
        ];
        for (weekday, hours) in self.opening_hours.describe_week() {
            lines.push(format!("- {}: {hours}", weekday_name(weekday)));
        }
        lines.push("Menu:".to_string());
        for category in &self.menu {
            lines.push(format!("- {}: {}", category.category, category.items.join(", ")));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveTime, Weekday};

    use super::{DayHours, FaqTopic, OpeningHours, RestaurantKnowledge};

    #[test]
    fn parses_day_hours() {
        assert_eq!(DayHours::parse("Closed"), Ok(DayHours::Closed));
        let hours = DayHours::parse("10:00-23:30").expect("valid hours");
        assert!(hours.contains(NaiveTime::from_hms_opt(23, 30, 0).expect("time")));
        assert!(!hours.contains(NaiveTime::from_hms_opt(9, 59, 0).expect("time")));
        assert!(DayHours::parse("23:00-10:00").is_err());
        assert!(DayHours::parse("noon till late").is_err());
    }

    #[test]
    fn default_schedule_closes_monday_and_tuesday() {
        let hours = OpeningHours::default();
        assert_eq!(hours.closed_days(), vec![Weekday::Mon, Weekday::Tue]);
        assert!(hours.is_open_on(Weekday::Sat));
    }

    #[test]
    fn hours_answer_mentions_today() {
        let knowledge = RestaurantKnowledge::default();
        let answer = knowledge.faq_answer(FaqTopic::Hours, Weekday::Mon);
        assert!(answer.contains("Today (Monday) we're closed."));
        assert!(answer.contains("- Saturday: 10:00 - 23:30"));
    }

    #[test]
    fn menu_answer_lists_every_category() {
        let knowledge = RestaurantKnowledge::default();
        let answer = knowledge.faq_answer(FaqTopic::Menu, Weekday::Sat);
        for category in ["Starters", "Main Courses", "Desserts", "Drinks"] {
            assert!(answer.contains(category), "missing {category}");
        }
    }
}
