//! Mr. French application binary - composition root.
//!
//! Ties together the workspace crates into a single executable:
//! 1. Load configuration from TOML
//! 2. Open the SQLite database and build the three stores
//! 3. Pick the LLM client (real endpoint, or scripted when keyless)
//! 4. Build the intent extractor and conversation orchestrator
//! 5. Start the reminder scheduler and the axum REST API server

use std::sync::Arc;

use clap::Parser;

use french_agent::{
    LlmClient, LlmIntentExtractor, OpenAiClient, ReminderScheduler, ScriptedLlm,
};
use french_api::{routes, AppState};
use french_chat::ConversationOrchestrator;
use french_core::config::FrenchConfig;
use french_store::{Database, HistoryStore, TaskRepository, ZoneStore};

mod cli;

use cli::{CliArgs, Command};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config first: the log level may come from it.
    let config_file = args.resolve_config_path();
    let config = FrenchConfig::load_or_default(&config_file);

    // Tracing.
    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    tracing::info!("Starting Mr. French v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Storage.
    let data_dir = args.resolve_data_dir(&config.general.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let db_path = data_dir.join("mrfrench.db");
    let db = Arc::new(Database::open(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    let tasks = Arc::new(TaskRepository::new(Arc::clone(&db)));
    let history = Arc::new(HistoryStore::new(Arc::clone(&db)));
    let zone = Arc::new(ZoneStore::new(Arc::clone(&db)));

    if let Some(Command::Reset) = args.command {
        tasks.delete_all()?;
        history.clear_all()?;
        zone.reset()?;
        tracing::info!("All stores reset");
        return Ok(());
    }

    // LLM client: real endpoint when the configured key is present,
    // otherwise a deterministic scripted client so the pipeline still
    // runs end-to-end in dev.
    let llm: Arc<dyn LlmClient> = if std::env::var(&config.llm.api_key_env).is_ok() {
        tracing::info!(model = %config.llm.model, "Using OpenAI-compatible LLM endpoint");
        Arc::new(OpenAiClient::from_config(&config.llm))
    } else {
        tracing::warn!(
            env_var = %config.llm.api_key_env,
            "API key not set; falling back to the scripted LLM (canned replies)"
        );
        Arc::new(ScriptedLlm::empty())
    };

    let extractor = Arc::new(LlmIntentExtractor::new(Arc::clone(&llm)));

    let orchestrator = ConversationOrchestrator::new(
        Arc::clone(&llm),
        extractor,
        Arc::clone(&tasks),
        Arc::clone(&history),
        Arc::clone(&zone),
        &config,
    );

    // Reminder scheduler, independent of request handling.
    let scheduler = Arc::new(ReminderScheduler::new(
        Arc::clone(&tasks),
        Arc::clone(&history),
        config.reminder.clone(),
    ));
    let scheduler_task = Arc::clone(&scheduler);
    tokio::spawn(async move {
        scheduler_task.run().await;
    });

    // API server.
    let port = args.resolve_port(config.general.port);
    let state = AppState::new(config, orchestrator, tasks, history, zone);

    routes::start_server(port, state).await?;

    scheduler.shutdown();
    Ok(())
}
