//! Interactive conversation on stdin/stdout.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use goodtable_agent::{build_llm_client, ConversationEngine, TracingAuditSink};
use goodtable_core::clock::SystemClock;
use goodtable_core::config::{AppConfig, LlmProvider, LoadOptions};
use goodtable_db::{connect_from_config, migrations, SqlReservationRepository};

use crate::commands::current_thread_runtime;
use crate::logging::init_logging;

const PROMPT: &str = "you> ";
const ASSISTANT: &str = "assistant> ";

pub fn run(mut options: LoadOptions, session_id: &str, no_ai: bool) -> Result<()> {
    if no_ai {
        options.overrides.llm_provider = Some(LlmProvider::Disabled);
    }
    let config = AppConfig::load(options).context("configuration issue")?;
    init_logging(&config.logging);

    let runtime = current_thread_runtime().context("failed to initialize async runtime")?;
    runtime.block_on(async {
        let engine = bootstrap(&config).await?;
        println!(
            "Welcome to {}! Ask about our menu, hours, or book a table. Type 'exit' to leave.",
            config.restaurant.name
        );

        let stdin = io::stdin();
        let stdout = io::stdout();
        let turns = converse(&engine, session_id, stdin.lock(), stdout.lock()).await?;
        info!(event_name = "cli.chat.finished", session_id, turns, "chat finished");
        Ok::<(), anyhow::Error>(())
    })
}

async fn bootstrap(config: &AppConfig) -> Result<ConversationEngine> {
    let pool = connect_from_config(&config.database)
        .await
        .with_context(|| format!("failed to connect to `{}`", config.database.url))?;
    migrations::run_pending(&pool).await.context("failed to apply migrations")?;
    info!(
        event_name = "cli.chat.database_ready",
        correlation_id = "bootstrap",
        "database connection established"
    );

    let repository =
        Arc::new(SqlReservationRepository::with_capacity(pool, config.reservations.tables_per_slot));
    let llm = build_llm_client(&config.llm).context("failed to configure the AI backend")?;
    info!(
        event_name = "cli.chat.llm_ready",
        correlation_id = "bootstrap",
        provider = config.llm.provider.as_str(),
        model = llm.as_ref().map(|client| client.model_name()).unwrap_or("templates"),
        "response phrasing ready"
    );

    ConversationEngine::from_config(
        config,
        repository,
        llm,
        Arc::new(SystemClock),
        Arc::new(TracingAuditSink),
    )
    .context("failed to build the conversation engine")
}

/// Feeds lines from `input` to the engine until the customer says goodbye or
/// the input ends. Returns the number of turns handled.
pub async fn converse<R: BufRead, W: Write>(
    engine: &ConversationEngine,
    session_id: &str,
    input: R,
    mut output: W,
) -> io::Result<usize> {
    let mut turns = 0;
    write!(output, "{PROMPT}")?;
    output.flush()?;

    for line in input.lines() {
        let line = line?;
        let utterance = line.trim();
        if utterance.is_empty() {
            write!(output, "{PROMPT}")?;
            output.flush()?;
            continue;
        }

        let reply = engine.handle_turn(session_id, utterance).await;
        turns += 1;
        writeln!(output, "{ASSISTANT}{reply}")?;

        if engine.session_state(session_id).await.is_none() {
            return Ok(turns);
        }
        write!(output, "{PROMPT}")?;
        output.flush()?;
    }

    engine.end_session(session_id).await;
    writeln!(output)?;
    Ok(turns)
}
