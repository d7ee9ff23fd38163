use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use goodtable_core::domain::customer::{customer_key, CustomerHistory};
use goodtable_core::domain::reservation::{Reservation, ReservationId};

use super::{RepositoryError, ReservationRepository, DEFAULT_TABLES_PER_SLOT};
use crate::DbPool;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

pub struct SqlReservationRepository {
    pool: DbPool,
    tables_per_slot: u32,
}

impl SqlReservationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self::with_capacity(pool, DEFAULT_TABLES_PER_SLOT)
    }

    pub fn with_capacity(pool: DbPool, tables_per_slot: u32) -> Self {
        Self { pool, tables_per_slot }
    }
}

#[async_trait::async_trait]
impl ReservationRepository for SqlReservationRepository {
    async fn save(&self, reservation: Reservation) -> Result<ReservationId, RepositoryError> {
        let date = reservation.date.format(DATE_FORMAT).to_string();
        let time = reservation.time.format(TIME_FORMAT).to_string();
        let name_key = customer_key(&reservation.name);

        let mut tx = self.pool.begin().await?;

        // Capacity check and insert in one statement so concurrent savers
        // cannot both take the last table.
        let inserted = sqlx::query(
            "INSERT INTO reservations (
                id,
                reservation_date,
                reservation_time,
                party_size,
                name,
                name_key,
                created_at
             )
             SELECT ?, ?, ?, ?, ?, ?, ?
             WHERE (
                SELECT COUNT(*) FROM reservations
                WHERE reservation_date = ? AND reservation_time = ?
             ) < ?",
        )
        .bind(&reservation.id.0)
        .bind(&date)
        .bind(&time)
        .bind(i64::from(reservation.party_size))
        .bind(&reservation.name)
        .bind(&name_key)
        .bind(reservation.created_at.to_rfc3339())
        .bind(&date)
        .bind(&time)
        .bind(i64::from(self.tables_per_slot))
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(RepositoryError::SlotFull { date: reservation.date, time: reservation.time });
        }

        sqlx::query(
            "INSERT INTO customers (name_key, name, visits, last_visit)
             VALUES (?, ?, 1, ?)
             ON CONFLICT(name_key) DO UPDATE SET
                name = excluded.name,
                visits = customers.visits + 1,
                last_visit = MAX(IFNULL(customers.last_visit, ''), excluded.last_visit)",
        )
        .bind(&name_key)
        .bind(&reservation.name)
        .bind(&date)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(reservation.id)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<CustomerHistory>, RepositoryError> {
        let key = customer_key(name);
        if key.is_empty() {
            return Ok(None);
        }

        let row = sqlx::query(
            "SELECT name, visits, last_visit
             FROM customers
             WHERE name_key = ?",
        )
        .bind(&key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(customer_from_row).transpose()
    }

    async fn list_for_date(&self, date: NaiveDate) -> Result<Vec<Reservation>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                id,
                reservation_date,
                reservation_time,
                party_size,
                name,
                created_at
             FROM reservations
             WHERE reservation_date = ?
             ORDER BY reservation_time ASC, created_at ASC",
        )
        .bind(date.format(DATE_FORMAT).to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(reservation_from_row).collect()
    }
}

fn reservation_from_row(row: SqliteRow) -> Result<Reservation, RepositoryError> {
    Ok(Reservation {
        id: ReservationId(row.try_get("id")?),
        date: parse_date("reservation_date", row.try_get("reservation_date")?)?,
        time: parse_time("reservation_time", row.try_get("reservation_time")?)?,
        party_size: parse_u32("party_size", row.try_get("party_size")?)?,
        name: row.try_get("name")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}

fn customer_from_row(row: SqliteRow) -> Result<CustomerHistory, RepositoryError> {
    Ok(CustomerHistory {
        name: row.try_get("name")?,
        visits: parse_u32("visits", row.try_get("visits")?)?,
        last_visit: row
            .try_get::<Option<String>, _>("last_visit")?
            .map(|value| parse_date("last_visit", value))
            .transpose()?,
    })
}

fn parse_u32(column: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| {
        RepositoryError::Decode(format!(
            "invalid value for `{column}` (expected non-negative u32): {value}"
        ))
    })
}

fn parse_date(column: &str, value: String) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(&value, DATE_FORMAT).map_err(|error| {
        RepositoryError::Decode(format!("invalid date in `{column}`: `{value}` ({error})"))
    })
}

fn parse_time(column: &str, value: String) -> Result<NaiveTime, RepositoryError> {
    NaiveTime::parse_from_str(&value, TIME_FORMAT).map_err(|error| {
        RepositoryError::Decode(format!("invalid time in `{column}`: `{value}` ({error})"))
    })
}

fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

    use goodtable_core::domain::reservation::{Reservation, ReservationId};

    use super::SqlReservationRepository;
    use crate::migrations;
    use crate::repositories::{RepositoryError, ReservationRepository};
    use crate::{connect_with_settings, DbPool};

    #[tokio::test]
    async fn sql_reservation_repo_round_trip_for_date_listing() {
        let pool = setup_pool().await;
        let repo = SqlReservationRepository::new(pool.clone());

        let dinner = sample_reservation("RES-001", "Maria", (2025, 5, 10), (20, 0));
        let lunch = sample_reservation("RES-002", "John", (2025, 5, 10), (13, 30));
        let other_day = sample_reservation("RES-003", "Ana", (2025, 5, 11), (20, 0));

        let id = repo.save(dinner.clone()).await.expect("save dinner");
        repo.save(lunch.clone()).await.expect("save lunch");
        repo.save(other_day).await.expect("save other day");

        assert_eq!(id, dinner.id);
        let listed = repo
            .list_for_date(NaiveDate::from_ymd_opt(2025, 5, 10).expect("valid date"))
            .await
            .expect("list reservations");
        assert_eq!(listed, vec![lunch, dinner]);

        pool.close().await;
    }

    #[tokio::test]
    async fn sql_reservation_repo_tracks_customer_visits() {
        let pool = setup_pool().await;
        let repo = SqlReservationRepository::new(pool.clone());

        assert_eq!(repo.find_by_name("Maria").await.expect("lookup"), None);

        repo.save(sample_reservation("RES-010", "Maria", (2025, 5, 12), (20, 0)))
            .await
            .expect("first visit");
        repo.save(sample_reservation("RES-011", "maria", (2025, 5, 10), (20, 0)))
            .await
            .expect("second visit");

        let history = repo.find_by_name("MARIA").await.expect("lookup").expect("known customer");
        assert_eq!(history.visits, 2);
        assert_eq!(history.name, "maria");
        assert_eq!(history.last_visit, NaiveDate::from_ymd_opt(2025, 5, 12));

        pool.close().await;
    }

    #[tokio::test]
    async fn sql_reservation_repo_enforces_slot_capacity() {
        let pool = setup_pool().await;
        let repo = SqlReservationRepository::with_capacity(pool.clone(), 2);

        repo.save(sample_reservation("RES-020", "Maria", (2025, 5, 10), (20, 0)))
            .await
            .expect("first table");
        repo.save(sample_reservation("RES-021", "John", (2025, 5, 10), (20, 0)))
            .await
            .expect("second table");

        let error = repo
            .save(sample_reservation("RES-022", "Ana", (2025, 5, 10), (20, 0)))
            .await
            .expect_err("slot is full");
        assert!(matches!(error, RepositoryError::SlotFull { .. }));
        assert_eq!(repo.find_by_name("Ana").await.expect("lookup"), None);

        repo.save(sample_reservation("RES-023", "Ana", (2025, 5, 10), (20, 30)))
            .await
            .expect("next slot is free");

        pool.close().await;
    }

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    fn sample_reservation(
        id: &str,
        name: &str,
        (year, month, day): (i32, u32, u32),
        (hour, minute): (u32, u32),
    ) -> Reservation {
        Reservation {
            id: ReservationId(id.to_string()),
            date: NaiveDate::from_ymd_opt(year, month, day).expect("valid date"),
            time: NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time"),
            party_size: 4,
            name: name.to_string(),
            created_at: parse_ts("2025-05-05T12:00:00Z"),
        }
    }

    fn parse_ts(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value).expect("valid rfc3339").with_timezone(&Utc)
    }
}
