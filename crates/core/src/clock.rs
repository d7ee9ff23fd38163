use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

/// Source of the reference "now" for date resolution and validation.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Converts a local wall-clock reading to UTC. Ambiguous or skipped local
/// times (DST transitions) are read as UTC.
pub fn local_to_utc(local: NaiveDateTime) -> DateTime<Utc> {
    local
        .and_local_timezone(Local)
        .earliest()
        .map(|at| at.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&local))
}
