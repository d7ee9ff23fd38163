pub mod connection;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_from_config, connect_with_settings, DbPool};
pub use repositories::{
    InMemoryReservationRepository, RepositoryError, ReservationRepository,
    SqlReservationRepository, DEFAULT_TABLES_PER_SLOT,
};
