use chrono::NaiveDate;
use serde::Serialize;

use crate::commands::{current_thread_runtime, exit, CommandResult};
use goodtable_core::config::{AppConfig, LoadOptions};
use goodtable_db::{connect_from_config, migrations, ReservationRepository, SqlReservationRepository};

#[derive(Debug, Serialize)]
struct ReservationRow {
    id: String,
    time: String,
    party_size: u32,
    name: String,
}

/// Lists the bookings stored for `date`, earliest first.
pub fn run(options: LoadOptions, date: NaiveDate) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "reservations",
                "config_validation",
                format!("configuration issue: {error}"),
                exit::CONFIG,
            );
        }
    };

    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "reservations",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                exit::RUNTIME,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_from_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), exit::DATABASE))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), exit::MIGRATION))?;

        let repository = SqlReservationRepository::new(pool.clone());
        let reservations = repository
            .list_for_date(date)
            .await
            .map_err(|error| ("query", error.to_string(), exit::DATABASE))?;
        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(reservations)
    });

    match result {
        Ok(reservations) => {
            let rows: Vec<ReservationRow> = reservations
                .into_iter()
                .map(|reservation| ReservationRow {
                    id: reservation.id.0,
                    time: reservation.time.format("%H:%M").to_string(),
                    party_size: reservation.party_size,
                    name: reservation.name,
                })
                .collect();
            let covers: u32 = rows.iter().map(|row| row.party_size).sum();
            let message =
                format!("{} reservation(s), {covers} guest(s) on {}", rows.len(), date.format("%Y-%m-%d"));
            CommandResult::success_with_data("reservations", message, serde_json::to_value(rows).ok())
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("reservations", error_class, message, exit_code)
        }
    }
}
