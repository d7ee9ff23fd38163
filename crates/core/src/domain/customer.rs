use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Visit history for a named customer, keyed case-insensitively.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerHistory {
    pub name: String,
    pub visits: u32,
    pub last_visit: Option<NaiveDate>,
}

impl CustomerHistory {
    pub fn is_returning(&self) -> bool {
        self.visits > 0
    }
}

pub fn customer_key(name: &str) -> String {
    name.trim().to_lowercase()
}
