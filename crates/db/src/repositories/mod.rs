use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

use goodtable_core::domain::customer::CustomerHistory;
use goodtable_core::domain::reservation::{Reservation, ReservationId};

pub mod memory;
pub mod reservation;

pub use memory::InMemoryReservationRepository;
pub use reservation::SqlReservationRepository;

/// Reservations a single date/time slot accepts unless configured otherwise.
pub const DEFAULT_TABLES_PER_SLOT: u32 = 5;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("slot {date} {time} is fully booked")]
    SlotFull { date: NaiveDate, time: NaiveTime },
}

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Stores a confirmed reservation and bumps the customer's visit record.
    /// Fails with [`RepositoryError::SlotFull`] once the slot is at capacity.
    async fn save(&self, reservation: Reservation) -> Result<ReservationId, RepositoryError>;

    /// Case-insensitive lookup of a customer's visit history.
    async fn find_by_name(&self, name: &str) -> Result<Option<CustomerHistory>, RepositoryError>;

    /// Reservations for one date, ordered by time.
    async fn list_for_date(&self, date: NaiveDate) -> Result<Vec<Reservation>, RepositoryError>;
}
