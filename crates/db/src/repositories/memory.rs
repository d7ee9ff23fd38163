use std::collections::HashMap;

use chrono::NaiveDate;
use tokio::sync::RwLock;

use goodtable_core::domain::customer::{customer_key, CustomerHistory};
use goodtable_core::domain::reservation::{Reservation, ReservationId};

use super::{RepositoryError, ReservationRepository, DEFAULT_TABLES_PER_SLOT};

#[derive(Default)]
struct Ledger {
    reservations: Vec<Reservation>,
    customers: HashMap<String, CustomerHistory>,
}

pub struct InMemoryReservationRepository {
    tables_per_slot: u32,
    ledger: RwLock<Ledger>,
}

impl InMemoryReservationRepository {
    pub fn new(tables_per_slot: u32) -> Self {
        Self { tables_per_slot, ledger: RwLock::new(Ledger::default()) }
    }

    pub async fn len(&self) -> usize {
        self.ledger.read().await.reservations.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryReservationRepository {
    fn default() -> Self {
        Self::new(DEFAULT_TABLES_PER_SLOT)
    }
}

#[async_trait::async_trait]
impl ReservationRepository for InMemoryReservationRepository {
    async fn save(&self, reservation: Reservation) -> Result<ReservationId, RepositoryError> {
        let mut ledger = self.ledger.write().await;

        let booked = ledger
            .reservations
            .iter()
            .filter(|existing| existing.date == reservation.date && existing.time == reservation.time)
            .count();
        if booked >= self.tables_per_slot as usize {
            return Err(RepositoryError::SlotFull { date: reservation.date, time: reservation.time });
        }

        let customer = ledger
            .customers
            .entry(customer_key(&reservation.name))
            .or_insert_with(|| CustomerHistory {
                name: reservation.name.clone(),
                visits: 0,
                last_visit: None,
            });
        customer.name = reservation.name.clone();
        customer.visits += 1;
        customer.last_visit = customer.last_visit.max(Some(reservation.date));

        let id = reservation.id.clone();
        ledger.reservations.push(reservation);
        Ok(id)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<CustomerHistory>, RepositoryError> {
        let key = customer_key(name);
        if key.is_empty() {
            return Ok(None);
        }
        let ledger = self.ledger.read().await;
        Ok(ledger.customers.get(&key).cloned())
    }

    async fn list_for_date(&self, date: NaiveDate) -> Result<Vec<Reservation>, RepositoryError> {
        let ledger = self.ledger.read().await;
        let mut found: Vec<Reservation> =
            ledger.reservations.iter().filter(|existing| existing.date == date).cloned().collect();
        found.sort_by(|left, right| {
            left.time.cmp(&right.time).then(left.created_at.cmp(&right.created_at))
        });
        Ok(found)
    }
}
