pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use goodtable_core::config::{ConfigOverrides, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "goodtable",
    about = "Restaurant reservation assistant",
    long_about = "Chat with the reservation assistant, inspect configuration, check readiness, and manage the reservation store.",
    after_help = "Examples:\n  goodtable chat\n  goodtable chat --no-ai --session table-7\n  goodtable reservations --date 2025-05-10\n  goodtable doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Config file (defaults to ./goodtable.toml or ./config/goodtable.toml)")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override database.url")]
    database_url: Option<String>,
    #[arg(long, global = true, help = "Override logging.level")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive conversation on the terminal")]
    Chat {
        #[arg(long, default_value = "terminal", help = "Session identifier")]
        session: String,
        #[arg(long, help = "Reply with templates only, even if an AI backend is configured")]
        no_ai: bool,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "List stored reservations for one date")]
    Reservations {
        #[arg(long, help = "Date as YYYY-MM-DD")]
        date: NaiveDate,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, AI backend readiness, and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                database_url: self.database_url.clone(),
                log_level: self.log_level.clone(),
                ..ConfigOverrides::default()
            },
        }
    }
}

pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let options = cli.load_options();

    let result = match cli.command {
        Command::Chat { session, no_ai } => {
            commands::chat::run(options, &session, no_ai)?;
            return Ok(ExitCode::SUCCESS);
        }
        Command::Migrate => commands::migrate::run(options),
        Command::Reservations { date } => commands::reservations::run(options, date),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(options) }
        }
        Command::Doctor { json } => {
            let (output, passed) = commands::doctor::run(options, json);
            commands::CommandResult { exit_code: if passed { 0 } else { 1 }, output }
        }
    };

    println!("{}", result.output);
    Ok(ExitCode::from(result.exit_code))
}
